use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{EntryPool, PoolFeed};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const REFRESH_TIMEOUT_SECS: u64 = 10;

/// Fetches the pool once and publishes it. Returns the number of entries.
pub async fn refresh_once(pool: &dyn EntryPool, feed: &PoolFeed) -> Result<usize> {
    let entries = pool
        .list_entries()
        .await
        .context("failed to refresh entry pool")?;
    let count = entries.len();
    feed.publish(entries);
    Ok(count)
}

/// Background task that keeps a [`PoolFeed`] in sync with an [`EntryPool`].
#[derive(Default)]
pub struct PoolRefresher {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PoolRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        pool: Arc<dyn EntryPool>,
        feed: Arc<PoolFeed>,
        interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("pool refresher already active");
        }
        if interval.is_zero() {
            bail!("pool refresh interval must be greater than zero");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(pool, feed, interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("pool refresh task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for PoolRefresher {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn refresh_loop(
    pool: Arc<dyn EntryPool>,
    feed: Arc<PoolFeed>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = refresh_once(pool.as_ref(), &feed);
                match tokio::time::timeout(Duration::from_secs(REFRESH_TIMEOUT_SECS), fut).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => log_error!("pool refresh failed: {err:#}"),
                    Err(_) => log_warn!("pool refresh timeout (> {}s)", REFRESH_TIMEOUT_SECS),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("pool refresh loop shutting down");
                break;
            }
        }
    }
}
