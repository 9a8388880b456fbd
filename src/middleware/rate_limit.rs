//! Fixed-window request limiting keyed by client IP. Forwarded headers are
//! only honored when the server is configured to sit behind a proxy.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::app::AppState;
use crate::config::ApiConfig;
use crate::error::ApiError;

const PRUNE_THRESHOLD: usize = 10_000;

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a hit for `key`; false once the key is over its limit for the current window
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, (start, _)| now.duration_since(*start) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.limit
    }
}

/// Global `/api` limiter plus the stricter one for `/api/auth`
pub struct RateLimiters {
    pub enabled: bool,
    pub trust_proxy: bool,
    pub api: RateLimiter,
    pub auth: RateLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &ApiConfig) -> Self {
        let window = Duration::from_secs(config.rate_limit_window_secs);
        Self {
            enabled: config.enable_rate_limiting,
            trust_proxy: config.trust_proxy,
            api: RateLimiter::new(config.rate_limit_requests, window),
            auth: RateLimiter::new(config.auth_rate_limit_requests, window),
        }
    }
}

fn client_key(request: &Request, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| request.headers().get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn api_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    if state.limiters.enabled && !state.limiters.api.check(&client_key(&request, state.limiters.trust_proxy), Instant::now()) {
        return Err(ApiError::too_many_requests(
            "Too many requests from this IP, please try again later.",
        ));
    }
    Ok(next.run(request).await)
}

pub async fn auth_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    if state.limiters.enabled && !state.limiters.auth.check(&client_key(&request, state.limiters.trust_proxy), Instant::now()) {
        return Err(ApiError::too_many_requests(
            "Too many authentication attempts, please try again later.",
        ));
    }
    Ok(next.run(request).await)
}
