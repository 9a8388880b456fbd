pub mod auth;
pub mod rate_limit;
pub mod response;
pub mod validated;

pub use auth::{jwt_auth_middleware, require_admin, AuthTeacher};
pub use rate_limit::{api_rate_limit, auth_rate_limit, RateLimiter, RateLimiters};
pub use response::{ApiResponse, ApiResult};
pub use validated::{ApiQuery, ValidatedJson};
