//! Turning a finished spin into a persisted [`SpinRecord`].
//!
//! Recording is best effort. The winner is already on screen by the time a
//! record is submitted, so a failed write is logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::WheelError,
    history::HistoryStore,
    models::{SpinRecord, DEFAULT_FILTER},
    selection::SpinResult,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Wire body for recording a spin. Every field is optional at the parsing
/// stage so that missing required fields surface as a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpinRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_who: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RecordSpinRequest {
    pub fn from_spin(
        result: &SpinResult,
        filter: &str,
        weighted_mode: bool,
        session_id: &str,
    ) -> Self {
        Self {
            entry_id: Some(result.winner.id.clone()),
            entry_name: Some(result.winner.name.clone()),
            entry_type: result.winner.entry_type.clone(),
            entry_who: result.winner.who.clone(),
            filter: Some(filter.to_string()),
            weighted_mode: Some(weighted_mode),
            timestamp: None,
            session_id: Some(session_id.to_string()),
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.entry_id) {
            missing.push("entryId");
        }
        if !present(&self.entry_name) {
            missing.push("entryName");
        }
        if !present(&self.session_id) {
            missing.push("sessionId");
        }
        missing
    }

    /// Validates and fills server-side defaults.
    pub fn into_record(self, now: DateTime<Utc>) -> Result<SpinRecord, WheelError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(WheelError::Validation { missing });
        }

        let now = now.trunc_subsecs(3);
        Ok(SpinRecord {
            id: Uuid::new_v4().to_string(),
            entry_id: self.entry_id.unwrap_or_default(),
            entry_name: self.entry_name.unwrap_or_default(),
            entry_type: non_empty(self.entry_type),
            entry_who: non_empty(self.entry_who),
            filter: non_empty(self.filter).unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            weighted_mode: self.weighted_mode.unwrap_or(false),
            timestamp: self.timestamp.map_or(now, |ts| ts.trunc_subsecs(3)),
            session_id: self.session_id.unwrap_or_default(),
            created_at: now,
        })
    }
}

/// Where recorded spins go.
#[async_trait]
pub trait SpinSink: Send + Sync {
    async fn submit(&self, request: RecordSpinRequest) -> anyhow::Result<SpinRecord>;
}

/// Validates and appends straight into a history store.
pub struct StoreSink {
    store: Arc<dyn HistoryStore>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SpinSink for StoreSink {
    async fn submit(&self, request: RecordSpinRequest) -> anyhow::Result<SpinRecord> {
        let record = request.into_record(Utc::now())?;
        self.store.append(&record).await?;
        Ok(record)
    }
}

/// Fire-and-forget front for a [`SpinSink`].
#[derive(Clone)]
pub struct SpinRecorder {
    sink: Arc<dyn SpinSink>,
}

impl SpinRecorder {
    pub fn new(sink: Arc<dyn SpinSink>) -> Self {
        Self { sink }
    }

    /// Submits in the background. The handle resolves to the stored record,
    /// or `None` when the write failed; callers are free to ignore it.
    pub fn record(&self, request: RecordSpinRequest) -> JoinHandle<Option<SpinRecord>> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let entry_name = request.entry_name.clone().unwrap_or_default();
            match sink.submit(request).await {
                Ok(record) => {
                    log_info!("recorded spin {} for {}", record.id, record.entry_name);
                    Some(record)
                }
                Err(err) => {
                    log_error!("failed to record spin for {entry_name}: {err:#}");
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{history::MemoryHistoryStore, models::Entry};
    use chrono::TimeZone;

    fn pizza_request() -> RecordSpinRequest {
        RecordSpinRequest {
            entry_id: Some("e1".into()),
            entry_name: Some("Pizza".into()),
            session_id: Some("s1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_filled_in() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();

        let record = pizza_request().into_record(now).unwrap();

        assert_eq!(record.filter, "all");
        assert!(!record.weighted_mode);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.created_at, now);
        assert_eq!(record.entry_type, None);
        assert!(!record.id.is_empty());
    }

    #[test]
    fn client_timestamp_is_kept() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 6, 1, 8, 29, 0).unwrap();
        let request = RecordSpinRequest {
            timestamp: Some(earlier),
            filter: Some("Food".into()),
            weighted_mode: Some(true),
            ..pizza_request()
        };

        let record = request.into_record(now).unwrap();

        assert_eq!(record.timestamp, earlier);
        assert_eq!(record.created_at, now);
        assert_eq!(record.filter, "Food");
        assert!(record.weighted_mode);
    }

    #[test]
    fn missing_and_blank_required_fields_are_reported() {
        let request = RecordSpinRequest {
            entry_name: Some("   ".into()),
            session_id: Some("s1".into()),
            ..Default::default()
        };

        match request.into_record(Utc::now()) {
            Err(WheelError::Validation { missing }) => {
                assert_eq!(missing, vec!["entryId", "entryName"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn request_from_spin_carries_winner_details() {
        let result = SpinResult {
            rotation: 750.0,
            winner: Entry::new("e2", "Tacos").with_type("Food").with_who("Sam"),
            winner_index: 1,
        };

        let request = RecordSpinRequest::from_spin(&result, "Food", true, "s9");

        assert_eq!(request.entry_id.as_deref(), Some("e2"));
        assert_eq!(request.entry_type.as_deref(), Some("Food"));
        assert_eq!(request.entry_who.as_deref(), Some("Sam"));
        assert_eq!(request.weighted_mode, Some(true));
        assert!(request.missing_fields().is_empty());
    }

    struct FailingSink;

    #[async_trait]
    impl SpinSink for FailingSink {
        async fn submit(&self, _request: RecordSpinRequest) -> anyhow::Result<SpinRecord> {
            anyhow::bail!("service unavailable")
        }
    }

    #[tokio::test]
    async fn recorder_swallows_failures() {
        let recorder = SpinRecorder::new(Arc::new(FailingSink));
        assert!(recorder.record(pizza_request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recorder_appends_through_store_sink() {
        let store = Arc::new(MemoryHistoryStore::new());
        let recorder = SpinRecorder::new(Arc::new(StoreSink::new(store.clone())));

        let record = recorder.record(pizza_request()).await.unwrap().unwrap();

        assert_eq!(record.entry_name, "Pizza");
        assert_eq!(store.len().await, 1);
    }
}
