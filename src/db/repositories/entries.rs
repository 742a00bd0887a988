use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Row;

use crate::{db::connection::Database, models::Entry, pool::EntryPool};

fn row_to_entry(row: &Row) -> Result<Entry> {
    Ok(Entry {
        id: row.get("id")?,
        name: row.get("name")?,
        entry_type: row.get("type")?,
        who: row.get("who")?,
        why: row.get("why")?,
    })
}

impl Database {
    /// Entries in insertion order. The table is owned by the pool service.
    pub async fn list_entries(&self) -> Result<Vec<Entry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, type, who, why
                 FROM entries
                 ORDER BY rowid",
            )?;

            let mut rows = stmt.query([])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }
}

#[async_trait]
impl EntryPool for Database {
    async fn list_entries(&self) -> Result<Vec<Entry>> {
        Database::list_entries(self).await
    }
}
