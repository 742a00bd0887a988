//! Read-only access to the external entry pool and fan-out of pool
//! snapshots to interested components.

mod feed;
mod refresher;
mod remote;

pub use feed::{PoolFeed, PoolSnapshot, PoolSubscription};
pub use refresher::{refresh_once, PoolRefresher};
pub use remote::RemoteEntryPool;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Entry;

#[async_trait]
pub trait EntryPool: Send + Sync {
    async fn list_entries(&self) -> anyhow::Result<Vec<Entry>>;
}

/// Fixed pool held in memory; the contents can be swapped wholesale.
#[derive(Default)]
pub struct StaticEntryPool {
    entries: RwLock<Vec<Entry>>,
}

impl StaticEntryPool {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn replace(&self, entries: Vec<Entry>) {
        *self.entries.write().await = entries;
    }
}

#[async_trait]
impl EntryPool for StaticEntryPool {
    async fn list_entries(&self) -> anyhow::Result<Vec<Entry>> {
        Ok(self.entries.read().await.clone())
    }
}
