use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::app_version::{compare_versions, is_valid_version};
use crate::database::models::AppVersionConfig;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppVersionRequest {
    pub latest_version: Option<String>,
    #[validate(url(message = "Download URL must be a valid URL"))]
    pub download_url: Option<String>,
    pub force_update: Option<bool>,
    #[validate(length(max = 500, message = "Message cannot exceed 500 characters"))]
    pub message: Option<String>,
    pub minimum_supported_version: Option<String>,
}

/// Stored config plus what it means for the calling client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheck {
    #[serde(flatten)]
    pub config: AppVersionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_available: Option<bool>,
}

fn checked_version(field: &str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if !is_valid_version(&value) {
        return Err(ApiError::invalid_field(
            field,
            "Version must be in the format X.Y.Z (e.g. 2.1.0)",
        ));
    }
    Ok(value)
}

pub struct AppVersionService<'a> {
    state: &'a AppState,
}

impl<'a> AppVersionService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// The persisted record, or the configured defaults
    pub async fn config(&self) -> Result<AppVersionConfig, ApiError> {
        match self.state.store.load_app_version().await? {
            Some(config) => Ok(config),
            None => Ok(AppVersionConfig::from(&self.state.config.app_version)),
        }
    }

    pub async fn check(&self, client_version: Option<String>) -> Result<VersionCheck, ApiError> {
        let mut config = self.config().await?;
        let client_version = client_version.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(client) = client_version else {
            return Ok(VersionCheck {
                config,
                client_version: None,
                update_available: None,
            });
        };

        let update_available = compare_versions(&config.latest_version, &client) == Ordering::Greater;
        let below_minimum = compare_versions(&client, &config.minimum_supported_version) == Ordering::Less;
        config.force_update = config.force_update || below_minimum;

        Ok(VersionCheck {
            config,
            client_version: Some(client),
            update_available: Some(update_available),
        })
    }

    pub async fn update(&self, request: UpdateAppVersionRequest) -> Result<AppVersionConfig, ApiError> {
        let mut config = self.config().await?;

        if let Some(latest) = request.latest_version {
            config.latest_version = checked_version("latestVersion", latest)?;
        }
        if let Some(minimum) = request.minimum_supported_version {
            config.minimum_supported_version = checked_version("minimumSupportedVersion", minimum)?;
        }
        if let Some(url) = request.download_url {
            config.download_url = url.trim().to_string();
        }
        if let Some(force) = request.force_update {
            config.force_update = force;
        }
        if let Some(message) = request.message {
            config.message = message.trim().to_string();
        }
        if compare_versions(&config.minimum_supported_version, &config.latest_version) == Ordering::Greater {
            return Err(ApiError::invalid_field(
                "minimumSupportedVersion",
                "Minimum supported version cannot be newer than the latest version",
            ));
        }

        config.updated_at = Some(Utc::now());
        self.state.store.save_app_version(&config).await?;
        info!(
            "App version set to {} (minimum {}, force {})",
            config.latest_version, config.minimum_supported_version, config.force_update
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn request() -> UpdateAppVersionRequest {
        UpdateAppVersionRequest {
            latest_version: None,
            download_url: None,
            force_update: None,
            message: None,
            minimum_supported_version: None,
        }
    }

    #[tokio::test]
    async fn old_clients_are_forced_to_update() {
        let ctx = TestContext::new();
        let service = AppVersionService::new(&ctx.state);
        service
            .update(UpdateAppVersionRequest {
                latest_version: Some("2.2.0".into()),
                minimum_supported_version: Some("2.1.0".into()),
                ..request()
            })
            .await
            .unwrap();

        let old = service.check(Some("2.0.0".into())).await.unwrap();
        assert!(old.config.force_update);
        assert_eq!(old.update_available, Some(true));

        let current = service.check(Some("2.1.0".into())).await.unwrap();
        assert!(!current.config.force_update);
        assert_eq!(current.update_available, Some(true));

        let latest = service.check(Some("2.2.0".into())).await.unwrap();
        assert_eq!(latest.update_available, Some(false));
    }

    #[tokio::test]
    async fn defaults_without_client_version() {
        let ctx = TestContext::new();
        let check = AppVersionService::new(&ctx.state).check(None).await.unwrap();
        assert_eq!(check.config.latest_version, ctx.state.config.app_version.latest_version);
        assert!(check.update_available.is_none());

        let json = serde_json::to_value(&check).unwrap();
        assert!(json.get("latestVersion").is_some());
        assert!(json.get("clientVersion").is_none());
    }

    #[tokio::test]
    async fn update_rejects_malformed_versions() {
        let ctx = TestContext::new();
        let service = AppVersionService::new(&ctx.state);

        let err = service
            .update(UpdateAppVersionRequest {
                latest_version: Some("2.1".into()),
                ..request()
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = service
            .update(UpdateAppVersionRequest {
                latest_version: Some("2.1.0".into()),
                minimum_supported_version: Some("3.0.0".into()),
                ..request()
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        assert!(ctx.state.store.load_app_version().await.unwrap().is_none());
    }
}
