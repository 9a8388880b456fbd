// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, password recovery, the client version check and the
// health probe. The auth routes sit behind the stricter auth rate limit.
pub mod app_version;
pub mod auth;
pub mod health;
