use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_JWT_SECRET: &str = "edulearn-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub email: EmailConfig,
    pub app_version: AppVersionDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub app_url: String,
    pub keep_alive: bool,
    pub keep_alive_interval_secs: u64,
    pub keep_alive_initial_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `None` selects the in-memory store (refused in production).
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub auth_rate_limit_requests: u32,
    /// Key rate limits on the first `X-Forwarded-For` entry instead of the socket address
    pub trust_proxy: bool,
    pub max_request_size_bytes: usize,
    pub max_upload_size_bytes: usize,
    pub max_files_per_request: usize,
    pub max_mcq_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub otp_ttl_minutes: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageProvider {
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_jitter_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersionDefaults {
    pub latest_version: String,
    pub download_url: String,
    pub force_update: bool,
    pub message: String,
    pub minimum_supported_version: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Refuse configurations that would be unsafe to serve traffic with.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production() {
            if self.security.jwt_secret == DEFAULT_JWT_SECRET {
                return Err("JWT_SECRET must be set in production".to_string());
            }
            if self.database.url.is_none() {
                return Err("DATABASE_URL must be set in production".to_string());
            }
        }
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.storage.provider == StorageProvider::Supabase
            && (self.storage.supabase_url.is_none() || self.storage.supabase_key.is_none())
        {
            return Err("SUPABASE_URL and SUPABASE_SERVICE_KEY are required for supabase storage".to_string());
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("APP_URL") {
            self.server.app_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("ENABLE_KEEP_ALIVE") {
            self.server.keep_alive = v.parse().unwrap_or(self.server.keep_alive);
        }
        if let Ok(v) = env::var("KEEP_ALIVE_INTERVAL_SECS") {
            self.server.keep_alive_interval_secs = v.parse().unwrap_or(self.server.keep_alive_interval_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_AUTH_RATE_LIMIT_REQUESTS") {
            self.api.auth_rate_limit_requests = v.parse().unwrap_or(self.api.auth_rate_limit_requests);
        }
        if let Ok(v) = env::var("API_TRUST_PROXY") {
            self.api.trust_proxy = v.parse().unwrap_or(self.api.trust_proxy);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_SIZE_BYTES") {
            self.api.max_upload_size_bytes = v.parse().unwrap_or(self.api.max_upload_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("OTP_TTL_MINUTES") {
            self.security.otp_ttl_minutes = v.parse().unwrap_or(self.security.otp_ttl_minutes);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_PROVIDER") {
            match v.to_ascii_lowercase().as_str() {
                "supabase" => self.storage.provider = StorageProvider::Supabase,
                "memory" => self.storage.provider = StorageProvider::Memory,
                _ => {}
            }
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.storage.supabase_url = Some(v.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_KEY") {
            self.storage.supabase_key = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_BUCKET") {
            self.storage.bucket = v;
        }

        // AI overrides
        if let Ok(v) = env::var("GEMINI_API_KEY") {
            if !v.trim().is_empty() {
                self.ai.gemini_api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("GEMINI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = env::var("GEMINI_BASE_URL") {
            self.ai.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("AI_RETRY_MAX_ATTEMPTS") {
            self.ai.retry_max_attempts = v.parse().unwrap_or(self.ai.retry_max_attempts);
        }
        if let Ok(v) = env::var("AI_RETRY_BASE_DELAY_MS") {
            self.ai.retry_base_delay_ms = v.parse().unwrap_or(self.ai.retry_base_delay_ms);
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_API_URL") {
            self.email.endpoint = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Ok(v) = env::var("EMAIL_API_KEY") {
            self.email.api_key = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.email.from = v;
        }

        // App version defaults
        if let Ok(v) = env::var("APP_LATEST_VERSION") {
            self.app_version.latest_version = v;
        }
        if let Ok(v) = env::var("APP_DOWNLOAD_URL") {
            self.app_version.download_url = v;
        }
        if let Ok(v) = env::var("APP_MINIMUM_VERSION") {
            self.app_version.minimum_supported_version = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                app_url: "http://localhost:5000".to_string(),
                keep_alive: false,
                keep_alive_interval_secs: 10 * 60,
                keep_alive_initial_delay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 15 * 60,
                auth_rate_limit_requests: 200,
                trust_proxy: false,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                max_upload_size_bytes: 50 * 1024 * 1024,  // 50MB
                max_files_per_request: 10,
                max_mcq_image_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: 12,
                otp_ttl_minutes: 10,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:8081".to_string()],
            },
            storage: StorageConfig {
                provider: StorageProvider::Memory,
                supabase_url: None,
                supabase_key: None,
                bucket: "edulearn-uploads".to_string(),
            },
            ai: AiConfig::default(),
            email: EmailConfig::default(),
            app_version: AppVersionDefaults::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                app_url: "http://localhost:5000".to_string(),
                keep_alive: false,
                keep_alive_interval_secs: 10 * 60,
                keep_alive_initial_delay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 300,
                rate_limit_window_secs: 15 * 60,
                auth_rate_limit_requests: 50,
                trust_proxy: false,
                max_request_size_bytes: 10 * 1024 * 1024,
                max_upload_size_bytes: 50 * 1024 * 1024,
                max_files_per_request: 10,
                max_mcq_image_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7,
                bcrypt_cost: 12,
                otp_ttl_minutes: 10,
                cors_origins: vec![],
            },
            storage: StorageConfig {
                provider: StorageProvider::Supabase,
                supabase_url: None,
                supabase_key: None,
                bucket: "edulearn-uploads".to_string(),
            },
            ai: AiConfig::default(),
            email: EmailConfig::default(),
            app_version: AppVersionDefaults::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                app_url: "http://localhost:5000".to_string(),
                keep_alive: true,
                keep_alive_interval_secs: 10 * 60,
                keep_alive_initial_delay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 15 * 60,
                auth_rate_limit_requests: 20,
                trust_proxy: false,
                max_request_size_bytes: 10 * 1024 * 1024,
                max_upload_size_bytes: 50 * 1024 * 1024,
                max_files_per_request: 10,
                max_mcq_image_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7,
                bcrypt_cost: 12,
                otp_ttl_minutes: 10,
                cors_origins: vec![],
            },
            storage: StorageConfig {
                provider: StorageProvider::Supabase,
                supabase_url: None,
                supabase_key: None,
                bucket: "edulearn-uploads".to_string(),
            },
            ai: AiConfig::default(),
            email: EmailConfig::default(),
            app_version: AppVersionDefaults::default(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 60,
            retry_max_attempts: 3,
            retry_base_delay_ms: 2000,
            retry_max_jitter_ms: 1000,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            from: "EduLearn <no-reply@edulearn.app>".to_string(),
        }
    }
}

impl Default for AppVersionDefaults {
    fn default() -> Self {
        Self {
            latest_version: "2.1.0".to_string(),
            download_url: "https://edulearn.app/download/edulearn-latest.apk".to_string(),
            force_update: false,
            message: "A new version of EduLearn is available with improvements and bug fixes.".to_string(),
            minimum_supported_version: "2.1.0".to_string(),
        }
    }
}

#[cfg(test)]
impl AppConfig {
    /// Development defaults with cheap password hashing, used by unit tests.
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.security.bcrypt_cost = 4;
        config
    }
}
