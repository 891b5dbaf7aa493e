use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod store;

use auth::rate_limit::RateLimitState;
use config::{Config, StorageBackend};
use services::assistant::AssistantClient;
use store::{memory::MemoryStore, postgres::PgStore, GardenStore};

const RATE_LIMIT_CLEANUP_EVERY: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GardenStore>,
    pub config: Arc<Config>,
    pub ws_tx: broadcast::Sender<String>,
    pub rate_limiter: RateLimitState,
    pub assistant: Arc<AssistantClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emogarden_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let store: Arc<dyn GardenStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres"))?;
            let pool = db::pool::create_pool(url).await?;
            db::pool::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            if let Some(path) = &config.memory_seed_file {
                store.load_seed(path).await?;
            }
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(store)
        }
    };

    if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY not set; assistant requests will fail with configuration_error");
    }
    let assistant = Arc::new(AssistantClient::from_config(&config)?);

    let (ws_tx, _) = broadcast::channel::<String>(256);
    let rate_limiter = RateLimitState::new();
    spawn_rate_limit_cleanup(rate_limiter.clone());

    let state = AppState {
        store,
        config: config.clone(),
        ws_tx,
        rate_limiter,
        assistant,
    };

    let app = routes::build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_rate_limit_cleanup(limiter: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_EVERY);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });
}
