use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HistoryStore, MAX_BATCH_DELETE};
use crate::models::{SpinKey, SpinRecord};

/// In-process history store. Counts delete calls and can be told to fail a
/// specific one, which makes it handy for exercising clear semantics.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<SpinRecord>>,
    delete_calls: AtomicUsize,
    /// 1-based delete call number that should fail; 0 disables.
    fail_on_delete_call: AtomicUsize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn fail_delete_call(&self, call: usize) {
        self.fail_on_delete_call.store(call, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &SpinRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn scan(&self, entry_type: Option<&str>) -> Result<Vec<SpinRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| match entry_type {
                Some(wanted) => record.entry_type.as_deref() == Some(wanted),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, keys: &[SpinKey]) -> Result<usize> {
        if keys.len() > MAX_BATCH_DELETE {
            bail!(
                "batch of {} keys exceeds the limit of {MAX_BATCH_DELETE}",
                keys.len()
            );
        }

        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_delete_call.load(Ordering::SeqCst) == call {
            self.fail_on_delete_call.store(0, Ordering::SeqCst);
            bail!("injected failure on delete call {call}");
        }

        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| !keys.contains(&record.key()));
        Ok(before - records.len())
    }
}
