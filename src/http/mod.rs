//! HTTP/JSON surface: record, list and clear spins, and global metrics.

mod handlers;
mod middleware;
mod response;

pub use handlers::ClearSummary;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{middleware::from_fn, routing::get, Router};
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    history::{HistoryLimits, HistoryStore},
    metrics::MetricsAggregator,
    pool::EntryPool,
};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) metrics: MetricsAggregator,
    pub(crate) limits: HistoryLimits,
}

impl AppState {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        pool: Arc<dyn EntryPool>,
        limits: HistoryLimits,
    ) -> Self {
        Self {
            metrics: MetricsAggregator::new(Arc::clone(&history), pool),
            history,
            limits,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/spins",
            get(handlers::list_spins)
                .post(handlers::record_spin)
                .delete(handlers::clear_spins),
        )
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(from_fn(middleware::cors))
        .layer(from_fn(middleware::access_log))
        .with_state(state)
}

/// Serves until `shutdown` is cancelled, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("Listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
