use axum::extract::State;
use axum::Extension;

use crate::app::AppState;
use crate::database::models::Teacher;
use crate::middleware::{ApiResponse, ApiResult, AuthTeacher, ValidatedJson};
use crate::services::auth::{AuthService, ChangePasswordRequest};

/// GET /api/auth/me - The signed-in teacher
pub async fn me(Extension(AuthTeacher(teacher)): Extension<AuthTeacher>) -> ApiResult<Teacher> {
    Ok(ApiResponse::success(teacher))
}

/// PUT /api/auth/change-password (also mounted at /api/profile/change-password)
pub async fn change_password(
    State(state): State<AppState>,
    Extension(teacher): Extension<AuthTeacher>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).change_password(&teacher, request).await?;
    Ok(ApiResponse::success(()).message("Password changed successfully"))
}
