use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{ObjectStore, StorageError, StoredObject};
use crate::config::StorageConfig;

/// Supabase Storage over its REST API
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        match (&config.supabase_url, &config.supabase_key) {
            (Some(url), Some(key)) => Self::new(url, key, &config.bucket),
            _ => Err(StorageError::NotConfigured),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn public_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_prefix(), path)
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    fn provider_name(&self) -> &'static str {
        "supabase"
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject, StorageError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                operation: "upload",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Stored {} ({} bytes) in bucket {}", path, size, self.bucket);
        Ok(StoredObject {
            url: self.public_url(path),
            path: path.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                operation: "delete",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_prefix())
            .map(|p| p.split('?').next().unwrap_or(p).to_string())
            .filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_urls_round_trip_to_paths() {
        let store = SupabaseStore::new("https://abc.supabase.co/", "key", "edulearn-uploads").unwrap();
        let url = store.public_url("profiles/teachers/1/a.png");
        assert_eq!(url, "https://abc.supabase.co/storage/v1/object/public/edulearn-uploads/profiles/teachers/1/a.png");
        assert_eq!(store.path_from_url(&url).as_deref(), Some("profiles/teachers/1/a.png"));
        assert_eq!(store.path_from_url("https://elsewhere.example/a.png"), None);
    }

    #[test]
    fn missing_credentials_are_not_configured() {
        let config = StorageConfig {
            provider: crate::config::StorageProvider::Supabase,
            supabase_url: Some("https://abc.supabase.co".into()),
            supabase_key: None,
            bucket: "b".into(),
        };
        assert!(matches!(SupabaseStore::from_config(&config), Err(StorageError::NotConfigured)));
    }
}
