use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::models::Entry;

/// Full pool contents as of one publish.
pub type PoolSnapshot = Arc<Vec<Entry>>;

const FEED_CAPACITY: usize = 16;

/// Publish/subscribe channel for pool snapshots.
///
/// Every publish reaches each subscriber that exists at that moment.
/// Nothing is retained for subscribers that join later beyond the latest
/// snapshot, and a subscriber that falls behind skips straight to the
/// newest snapshot it can still see.
pub struct PoolFeed {
    sender: broadcast::Sender<PoolSnapshot>,
    latest: Mutex<PoolSnapshot>,
}

impl Default for PoolFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            sender,
            latest: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Returns how many subscribers received the snapshot.
    pub fn publish(&self, entries: Vec<Entry>) -> usize {
        let snapshot: PoolSnapshot = Arc::new(entries);
        {
            let mut latest = match self.latest.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *latest = Arc::clone(&snapshot);
        }
        self.sender.send(snapshot).unwrap_or(0)
    }

    pub fn latest(&self) -> PoolSnapshot {
        let latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&latest)
    }

    pub fn subscribe(&self) -> PoolSubscription {
        // Subscribe before reading `latest` so a concurrent publish is
        // seen either here or through the receiver.
        let receiver = self.sender.subscribe();
        PoolSubscription {
            receiver,
            current: self.latest(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct PoolSubscription {
    receiver: broadcast::Receiver<PoolSnapshot>,
    current: PoolSnapshot,
}

impl PoolSubscription {
    /// Applies any pending updates without waiting and returns the newest
    /// snapshot this subscriber has seen.
    pub fn current(&mut self) -> PoolSnapshot {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => self.current = snapshot,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        Arc::clone(&self.current)
    }

    /// Waits for the next published snapshot. `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<PoolSnapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => {
                    self.current = Arc::clone(&snapshot);
                    return Some(snapshot);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
