use anyhow::{bail, Result};
use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_datetime, parse_datetime, to_usize},
    },
    history::{HistoryStore, MAX_BATCH_DELETE},
    models::{SpinKey, SpinRecord},
};

const SPIN_COLUMNS: &str = "id, timestamp, entry_id, entry_name, entry_type, entry_who, \
                            filter, weighted_mode, session_id, created_at";

fn row_to_spin(row: &Row) -> Result<SpinRecord> {
    let timestamp: String = row.get("timestamp")?;
    let created_at: String = row.get("created_at")?;

    Ok(SpinRecord {
        id: row.get("id")?,
        entry_id: row.get("entry_id")?,
        entry_name: row.get("entry_name")?,
        entry_type: row.get("entry_type")?,
        entry_who: row.get("entry_who")?,
        filter: row.get("filter")?,
        weighted_mode: row.get("weighted_mode")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        session_id: row.get("session_id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_spin(&self, spin: &SpinRecord) -> Result<()> {
        let record = spin.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO spins (id, timestamp, entry_id, entry_name, entry_type, entry_who,
                                    filter, weighted_mode, session_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    format_datetime(&record.timestamp),
                    record.entry_id,
                    record.entry_name,
                    record.entry_type,
                    record.entry_who,
                    record.filter,
                    record.weighted_mode,
                    record.session_id,
                    format_datetime(&record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Unordered full scan; callers sort as needed.
    pub async fn scan_spins(&self, entry_type: Option<String>) -> Result<Vec<SpinRecord>> {
        self.execute(move |conn| {
            let mut spins = Vec::new();
            match entry_type {
                Some(entry_type) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SPIN_COLUMNS} FROM spins WHERE entry_type = ?1"
                    ))?;
                    let mut rows = stmt.query(params![entry_type])?;
                    while let Some(row) = rows.next()? {
                        spins.push(row_to_spin(row)?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!("SELECT {SPIN_COLUMNS} FROM spins"))?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        spins.push(row_to_spin(row)?);
                    }
                }
            }
            Ok(spins)
        })
        .await
    }

    pub async fn count_spins(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM spins", [], |row| row.get(0))?;
            to_usize(count, "spin count")
        })
        .await
    }

    /// Deletes up to [`MAX_BATCH_DELETE`] spins in one transaction. Keys that
    /// are already gone count as zero, not as an error.
    pub async fn delete_spin_batch(&self, keys: &[SpinKey]) -> Result<usize> {
        if keys.len() > MAX_BATCH_DELETE {
            bail!(
                "batch of {} keys exceeds the limit of {MAX_BATCH_DELETE}",
                keys.len()
            );
        }

        let keys: Vec<(String, String)> = keys
            .iter()
            .map(|key| (key.id.clone(), format_datetime(&key.timestamp)))
            .collect();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM spins WHERE id = ?1 AND timestamp = ?2")?;
                for (id, timestamp) in &keys {
                    deleted += stmt.execute(params![id, timestamp])?;
                }
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for Database {
    async fn append(&self, record: &SpinRecord) -> Result<()> {
        self.insert_spin(record).await
    }

    async fn scan(&self, entry_type: Option<&str>) -> Result<Vec<SpinRecord>> {
        self.scan_spins(entry_type.map(str::to_string)).await
    }

    async fn delete_batch(&self, keys: &[SpinKey]) -> Result<usize> {
        self.delete_spin_batch(keys).await
    }
}
