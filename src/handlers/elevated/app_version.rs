use axum::extract::State;

use crate::app::AppState;
use crate::database::models::AppVersionConfig;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::app_version::{AppVersionService, UpdateAppVersionRequest};

/// GET /api/app/version/config - The stored record, or the configured defaults
pub async fn config_get(State(state): State<AppState>) -> ApiResult<AppVersionConfig> {
    let config = AppVersionService::new(&state).config().await?;
    Ok(ApiResponse::success(config))
}

/// PUT /api/app/version - Publish a new release or change the update policy
pub async fn put(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateAppVersionRequest>,
) -> ApiResult<AppVersionConfig> {
    let config = AppVersionService::new(&state).update(request).await?;
    Ok(ApiResponse::success(config).message("App version updated successfully"))
}
