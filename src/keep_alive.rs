//! Self-ping so free-tier hosts don't idle the service out.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ServerConfig;

pub fn health_url(app_url: &str) -> String {
    format!("{}/health", app_url.trim_end_matches('/'))
}

/// Start pinging `{app_url}/health`; `None` when keep-alive is switched off.
pub fn spawn(config: &ServerConfig) -> Option<JoinHandle<()>> {
    if !config.keep_alive {
        return None;
    }

    let url = health_url(&config.app_url);
    let interval = Duration::from_secs(config.keep_alive_interval_secs.max(1));
    let initial_delay = Duration::from_secs(config.keep_alive_initial_delay_secs);

    Some(tokio::spawn(async move {
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Keep-alive disabled, HTTP client failed to build: {}", e);
                return;
            }
        };

        tokio::time::sleep(initial_delay).await;
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => debug!("Keep-alive ping ok"),
                Ok(response) => warn!("Keep-alive ping returned {}", response.status()),
                Err(e) => warn!("Keep-alive ping failed: {}", e),
            }
        }
    }))
}
