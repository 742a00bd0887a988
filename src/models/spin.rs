//! Spin history data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter value stored when the client did not narrow the wheel.
pub const DEFAULT_FILTER: &str = "all";

/// One persisted selection. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinRecord {
    pub id: String,
    pub entry_id: String,
    pub entry_name: String,
    pub entry_type: Option<String>,
    pub entry_who: Option<String>,
    pub filter: String,
    pub weighted_mode: bool,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl SpinRecord {
    pub fn key(&self) -> SpinKey {
        SpinKey {
            id: self.id.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Natural key of a spin record, used for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpinKey {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}
