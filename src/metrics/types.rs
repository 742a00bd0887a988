use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub count: usize,
}

/// Aggregate view over the full history. Computed per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_spins: usize,
    pub unique_users: usize,
    pub today_spins: usize,
    pub week_spins: usize,
    pub top_entries: Vec<EntryCount>,
    pub type_distribution: Vec<TypeCount>,
    pub average_spins_per_user: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            total_spins: 0,
            unique_users: 0,
            today_spins: 0,
            week_spins: 0,
            top_entries: Vec::new(),
            type_distribution: Vec::new(),
            average_spins_per_user: 0.0,
            last_updated: DateTime::<Utc>::default(),
        }
    }
}
