use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult};
use crate::services::app_version::{AppVersionService, VersionCheck};

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: Option<String>,
}

/// GET /api/app/version - Update check; client version from `?version=` or the `app-version` header
pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> ApiResult<VersionCheck> {
    let client_version = query.version.or_else(|| {
        headers
            .get("app-version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });
    let check = AppVersionService::new(&state).check(client_version).await?;
    Ok(ApiResponse::success(check))
}
