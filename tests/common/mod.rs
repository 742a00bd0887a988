#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use decision_wheel::{
    history::{HistoryLimits, MemoryHistoryStore},
    http::{self, AppState},
    models::{Entry, SpinRecord},
    pool::StaticEntryPool,
    WheelClient,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

pub struct TestServer {
    pub base_url: String,
    pub history: Arc<MemoryHistoryStore>,
    pub pool: Arc<StaticEntryPool>,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(entries: Vec<Entry>) -> Self {
        let history = Arc::new(MemoryHistoryStore::new());
        let pool = Arc::new(StaticEntryPool::new(entries));
        let state = AppState::new(history.clone(), pool.clone(), HistoryLimits::default());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(http::serve(listener, state, shutdown.clone()));

        Self {
            base_url: format!("http://{addr}"),
            history,
            pool,
            shutdown,
            handle,
        }
    }

    pub fn client(&self) -> WheelClient {
        WheelClient::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

pub fn record(
    id: &str,
    name: &str,
    entry_type: Option<&str>,
    session: &str,
    at: DateTime<Utc>,
) -> SpinRecord {
    SpinRecord {
        id: id.to_string(),
        entry_id: format!("entry-{name}"),
        entry_name: name.to_string(),
        entry_type: entry_type.map(str::to_string),
        entry_who: None,
        filter: "all".to_string(),
        weighted_mode: false,
        timestamp: at,
        session_id: session.to_string(),
        created_at: at,
    }
}
