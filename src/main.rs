use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edulearn_api::ai::{GeminiGenerator, QuestionGenerator, UnconfiguredGenerator};
use edulearn_api::app::{app, AppState};
use edulearn_api::config::{AppConfig, StorageProvider};
use edulearn_api::database::DatabaseManager;
use edulearn_api::email::{mailer_from_config, Mailer};
use edulearn_api::error::expose_internal_details;
use edulearn_api::keep_alive;
use edulearn_api::storage::{MemoryObjectStore, ObjectStore, SupabaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edulearn_api=info,tower_http=info")))
        .init();

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    expose_internal_details(config.is_development());
    info!("Starting EduLearn API in {:?} mode", config.environment);

    let store = DatabaseManager::open(&config.database)
        .await
        .context("failed to open database")?;

    let objects: Arc<dyn ObjectStore> = match config.storage.provider {
        StorageProvider::Supabase => Arc::new(SupabaseStore::from_config(&config.storage).context("object storage")?),
        StorageProvider::Memory => {
            warn!("Using in-memory object storage (files are lost on restart)");
            Arc::new(MemoryObjectStore::new())
        }
    };

    let generator: Arc<dyn QuestionGenerator> = match &config.ai.gemini_api_key {
        Some(key) => Arc::new(GeminiGenerator::new(&config.ai, key.clone()).context("Gemini client")?),
        None => {
            warn!("GEMINI_API_KEY not set, MCQ generation is disabled");
            Arc::new(UnconfiguredGenerator)
        }
    };

    let mailer: Arc<dyn Mailer> = Arc::from(mailer_from_config(&config.email).context("mailer")?);

    let port = config.server.port;
    let _keep_alive = keep_alive::spawn(&config.server);

    let state = AppState::new(config, store, objects, generator, mailer);
    let router = app(state);

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("EduLearn API listening on http://{}", bind_addr);

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}
