//! Server entry point.
//!
//! # Startup Flow
//!
//! 1. Initialize logging from `RUST_LOG` (defaults to "info")
//! 2. Load configuration from environment variables
//! 3. Pick the store: PostgreSQL when `DATABASE_URL` is set (pool +
//!    migrations), otherwise the volatile in-memory store
//! 4. Bind the TCP listener and serve connections forever

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use linebank::store::{BankStore, MemoryStore, PgStore};
use linebank::{AppState, config, db, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let store: Arc<dyn BankStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            tracing::info!("Database pool created");
            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    server::run(listener, state).await
}
