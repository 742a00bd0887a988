//! Client-side composition: pool subscription, selection engine, recorder
//! and session identity, wired together with an explicit start/shutdown.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{info, warn};
use tokio::task::JoinHandle;

use crate::{
    client::WheelClient,
    config::ClientConfig,
    error::WheelError,
    models::{Entry, SpinRecord, DEFAULT_FILTER},
    pool::{
        refresh_once, EntryPool, PoolFeed, PoolRefresher, PoolSnapshot, PoolSubscription,
        RemoteEntryPool,
    },
    recorder::{RecordSpinRequest, SpinRecorder},
    selection::{SelectionEngine, SpinResult},
    session::SessionIdentity,
};

pub struct SpinOutcome {
    pub result: SpinResult,
    /// Background write of the spin record; resolves to `None` on failure.
    pub recording: JoinHandle<Option<SpinRecord>>,
}

pub struct WheelSession {
    engine: SelectionEngine,
    pool: Mutex<PoolSubscription>,
    recorder: SpinRecorder,
    session_id: String,
}

impl WheelSession {
    pub fn new(
        engine: SelectionEngine,
        feed: &PoolFeed,
        recorder: SpinRecorder,
        session_id: String,
    ) -> Self {
        Self {
            engine,
            pool: Mutex::new(feed.subscribe()),
            recorder,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn engine(&self) -> &SelectionEngine {
        &self.engine
    }

    pub fn current_pool(&self) -> PoolSnapshot {
        let mut subscription = match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscription.current()
    }

    /// Entries on the wheel for `filter`: everything for `"all"`, otherwise
    /// only entries of that type.
    pub fn selectable(&self, filter: &str) -> Vec<Entry> {
        let pool = self.current_pool();
        let filter = filter.trim();
        if filter.is_empty() || filter.eq_ignore_ascii_case(DEFAULT_FILTER) {
            return pool.to_vec();
        }
        pool.iter()
            .filter(|entry| entry.entry_type.as_deref() == Some(filter))
            .cloned()
            .collect()
    }

    /// Spins over the current pool and hands the result to the recorder
    /// without waiting for it. An empty pool is rejected before anything
    /// is sent anywhere.
    pub async fn spin(
        &self,
        filter: &str,
        weighted_mode: bool,
    ) -> Result<SpinOutcome, WheelError> {
        let candidates = self.selectable(filter);
        let result = self.engine.spin(&candidates).await?;

        let filter = if filter.trim().is_empty() {
            DEFAULT_FILTER
        } else {
            filter.trim()
        };
        let request =
            RecordSpinRequest::from_spin(&result, filter, weighted_mode, &self.session_id);
        let recording = self.recorder.record(request);

        Ok(SpinOutcome { result, recording })
    }
}

/// Running client: keeps the pool fresh in the background until shut down.
pub struct WheelRuntime {
    session: WheelSession,
    client: WheelClient,
    feed: Arc<PoolFeed>,
    refresher: PoolRefresher,
}

impl WheelRuntime {
    pub async fn start(config: &ClientConfig) -> Result<Self> {
        let client = WheelClient::new(&config.service_url, config.http_timeout)?;
        let pool: Arc<dyn EntryPool> = Arc::new(RemoteEntryPool::new(
            &config.entry_pool_url,
            config.http_timeout,
        )?);
        let feed = Arc::new(PoolFeed::new());

        match refresh_once(pool.as_ref(), &feed).await {
            Ok(count) => info!("Loaded {count} entries from {}", config.entry_pool_url),
            Err(err) => warn!("Initial pool load failed, wheel starts empty: {err:#}"),
        }

        let session_id = SessionIdentity::new(config.session_file.clone()).get_or_create()?;
        let session = WheelSession::new(
            SelectionEngine::new(config.animation),
            &feed,
            SpinRecorder::new(Arc::new(client.clone())),
            session_id,
        );

        let mut refresher = PoolRefresher::new();
        refresher.start(pool, Arc::clone(&feed), config.pool_refresh_interval)?;

        Ok(Self {
            session,
            client,
            feed,
            refresher,
        })
    }

    pub fn session(&self) -> &WheelSession {
        &self.session
    }

    pub fn client(&self) -> &WheelClient {
        &self.client
    }

    pub fn feed(&self) -> &Arc<PoolFeed> {
        &self.feed
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.refresher.stop().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        history::{HistoryStore, MemoryHistoryStore},
        recorder::StoreSink,
    };

    fn session_with(store: Arc<MemoryHistoryStore>, feed: &PoolFeed) -> WheelSession {
        WheelSession::new(
            SelectionEngine::with_seed(11, Duration::ZERO),
            feed,
            SpinRecorder::new(Arc::new(StoreSink::new(store))),
            "session_1_abc".into(),
        )
    }

    #[tokio::test]
    async fn empty_pool_never_records() {
        let store = Arc::new(MemoryHistoryStore::new());
        let feed = PoolFeed::new();
        let session = session_with(store.clone(), &feed);

        let err = session.spin("all", false).await.err().unwrap();

        assert!(matches!(err, WheelError::NoSelectableEntries));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn spin_records_winner_in_background() {
        let store = Arc::new(MemoryHistoryStore::new());
        let feed = PoolFeed::new();
        let session = session_with(store.clone(), &feed);
        feed.publish(vec![
            Entry::new("e1", "Pizza").with_type("Food"),
            Entry::new("e2", "Dune").with_type("Movie"),
        ]);

        let outcome = session.spin("", true).await.unwrap();
        let record = outcome.recording.await.unwrap().unwrap();

        assert_eq!(record.entry_id, outcome.result.winner.id);
        assert_eq!(record.filter, "all");
        assert!(record.weighted_mode);
        assert_eq!(record.session_id, "session_1_abc");
        assert_eq!(store.scan(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn type_filter_narrows_the_wheel() {
        let store = Arc::new(MemoryHistoryStore::new());
        let feed = PoolFeed::new();
        let session = session_with(store.clone(), &feed);
        feed.publish(vec![
            Entry::new("e1", "Pizza").with_type("Food"),
            Entry::new("e2", "Dune").with_type("Movie"),
            Entry::new("e3", "Tacos").with_type("Food"),
        ]);

        for _ in 0..10 {
            let outcome = session.spin("Food", false).await.unwrap();
            assert_eq!(outcome.result.winner.entry_type.as_deref(), Some("Food"));
            let record = outcome.recording.await.unwrap().unwrap();
            assert_eq!(record.filter, "Food");
        }

        assert!(matches!(
            session.spin("Book", false).await.err(),
            Some(WheelError::NoSelectableEntries)
        ));
    }

    #[tokio::test]
    async fn pool_updates_reach_the_session() {
        let store = Arc::new(MemoryHistoryStore::new());
        let feed = PoolFeed::new();
        let session = session_with(store, &feed);
        assert!(session.current_pool().is_empty());

        feed.publish(vec![Entry::new("e1", "Pizza")]);
        assert_eq!(session.current_pool().len(), 1);

        feed.publish(Vec::new());
        assert!(session.selectable("all").is_empty());
    }
}
