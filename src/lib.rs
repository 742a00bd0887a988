pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod http;
pub mod metrics;
pub mod models;
pub mod pool;
pub mod recorder;
pub mod selection;
pub mod session;
mod utils;
pub mod wheel;

use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use client::WheelClient;
pub use config::{ClientConfig, ServerConfig};
pub use db::Database;
pub use error::WheelError;
pub use http::AppState;
pub use models::{Entry, SpinRecord};
pub use wheel::{SpinOutcome, WheelRuntime, WheelSession};

use history::HistoryStore;
use pool::{EntryPool, RemoteEntryPool};

/// Server entry point: loads config, opens the database and serves the
/// HTTP API until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // RUST_LOG wins over the info default
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Decision wheel service starting up...");

    let config = ServerConfig::from_env();
    let database = Database::new(config.db_path.clone())?;
    info!("Using database at {}", database.path().display());

    let pool: Arc<dyn EntryPool> = match config.entry_pool_url.as_deref() {
        Some(url) => {
            info!("Reading entry pool from {url}");
            Arc::new(RemoteEntryPool::new(url, config.http_timeout)?)
        }
        None => {
            info!("Reading entry pool from the local entries table");
            Arc::new(database.clone())
        }
    };
    let history: Arc<dyn HistoryStore> = Arc::new(database);

    let state = AppState::new(history, pool, config.history_limits);
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
                Err(err) => warn!("Failed to listen for Ctrl-C: {err}"),
            }
        });
    }

    http::serve(listener, state, shutdown).await
}
