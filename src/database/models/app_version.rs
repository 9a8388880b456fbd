use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::AppVersionDefaults;

/// Client update-gating record, persisted as a single settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppVersionConfig {
    pub latest_version: String,
    pub download_url: String,
    pub force_update: bool,
    pub message: String,
    pub minimum_supported_version: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&AppVersionDefaults> for AppVersionConfig {
    fn from(defaults: &AppVersionDefaults) -> Self {
        Self {
            latest_version: defaults.latest_version.clone(),
            download_url: defaults.download_url.clone(),
            force_update: defaults.force_update,
            message: defaults.message.clone(),
            minimum_supported_version: defaults.minimum_supported_version.clone(),
            updated_at: None,
        }
    }
}

/// Compare dotted version strings component by component.
/// Missing or non-numeric components count as 0, so "2.1" == "2.1.0".
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.trim().split('.').map(|p| p.trim().parse().unwrap_or(0)).collect() };
    let (left, right) = (parse(a), parse(b));
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Accepts exactly three dot-separated integers, e.g. "2.10.0".
pub fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_numerically() {
        assert_eq!(compare_versions("2.0.0", "2.1.0"), Ordering::Less);
        assert_eq!(compare_versions("2.10.0", "2.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.1", "2.1.0"), Ordering::Equal);
        assert_eq!(compare_versions("3", "2.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.x.1", "2.0.1"), Ordering::Equal);
    }

    #[test]
    fn version_format() {
        assert!(is_valid_version("2.1.0"));
        assert!(!is_valid_version("2.1"));
        assert!(!is_valid_version("2.1.0-beta"));
        assert!(!is_valid_version("v2.1.0"));
    }
}
