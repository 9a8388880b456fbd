// handlers/elevated/mod.rs - Admin-only handlers
//
// Mounted behind both `jwt_auth_middleware` and `require_admin`.
pub mod app_version;
