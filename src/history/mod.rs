//! Append-only spin history.
//!
//! A [`HistoryStore`] only promises unordered scans and bounded batch
//! deletes; ordering, limits and bulk clearing are layered on top here so
//! every backend behaves the same way.

mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::{error, info};

use crate::{
    error::WheelError,
    models::{SpinKey, SpinRecord},
};

/// Largest number of keys a store accepts in one delete call.
pub const MAX_BATCH_DELETE: usize = 25;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &SpinRecord) -> anyhow::Result<()>;

    /// Full scan, optionally restricted to one entry type. No ordering guarantee.
    async fn scan(&self, entry_type: Option<&str>) -> anyhow::Result<Vec<SpinRecord>>;

    /// Deletes at most [`MAX_BATCH_DELETE`] keys and returns how many rows
    /// were actually removed. Keys that no longer exist are skipped.
    async fn delete_batch(&self, keys: &[SpinKey]) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_HISTORY_LIMIT,
            max_limit: MAX_HISTORY_LIMIT,
        }
    }
}

impl HistoryLimits {
    /// Resolves a raw `limit` query value. Missing, unparsable and
    /// non-positive values fall back to the default; everything is capped.
    pub fn resolve(&self, requested: Option<&str>) -> usize {
        let max_limit = self.max_limit.clamp(1, MAX_HISTORY_LIMIT);
        requested
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|value| *value > 0)
            .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
            .unwrap_or(self.default_limit)
            .clamp(1, max_limit)
    }
}

/// Most recent records first, at most `limit` of them.
pub async fn query_recent(
    store: &dyn HistoryStore,
    limit: usize,
    entry_type: Option<&str>,
) -> Result<Vec<SpinRecord>, WheelError> {
    let mut records = store.scan(entry_type).await.map_err(WheelError::Store)?;
    sort_newest_first(&mut records);
    records.truncate(limit);
    Ok(records)
}

pub fn sort_newest_first(records: &mut [SpinRecord]) {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Deletes every record in chunks of [`MAX_BATCH_DELETE`], one call at a
/// time. A failed chunk stops the clear; chunks already deleted stay
/// deleted and calling again removes whatever is left.
pub async fn clear_all(store: &dyn HistoryStore) -> Result<usize, WheelError> {
    let records = store.scan(None).await.map_err(WheelError::Store)?;
    if records.is_empty() {
        return Ok(0);
    }

    let keys: Vec<SpinKey> = records.iter().map(SpinRecord::key).collect();
    let mut deleted = 0;

    for (index, chunk) in keys.chunks(MAX_BATCH_DELETE).enumerate() {
        match store.delete_batch(chunk).await {
            Ok(removed) => deleted += removed,
            Err(err) => {
                error!(
                    "Clearing spin history failed on batch {} after {deleted} deletions: {err:#}",
                    index + 1
                );
                return Err(WheelError::PartialBatchFailure {
                    deleted,
                    chunks_completed: index,
                    cause: err,
                });
            }
        }
    }

    info!(
        "Cleared {deleted} spin records in {} batch(es)",
        keys.len().div_ceil(MAX_BATCH_DELETE)
    );
    Ok(deleted)
}
