use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub storage: &'static str,
}

/// GET /health - Liveness probe, also pinged by the keep-alive task
pub async fn get(State(state): State<AppState>) -> ApiResult<HealthReport> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!("Health check failed on {} store: {}", state.store.backend_name(), e);
        return Err(ApiError::service_unavailable("Database is unavailable"));
    }

    Ok(ApiResponse::success(HealthReport {
        status: "ok",
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339(),
        database: "ok",
        storage: state.objects.provider_name(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
}

/// GET / - Service name and build version
pub async fn root(State(state): State<AppState>) -> ApiResult<ServiceInfo> {
    Ok(ApiResponse::success(ServiceInfo {
        name: "EduLearn API",
        version: env!("CARGO_PKG_VERSION"),
        environment: format!("{:?}", state.config.environment).to_lowercase(),
    }))
}

/// Anything no route matched
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
