// Append-only status history

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    /// Entry identifier
    pub id: String,
    /// Owning request
    pub request_id: String,
    /// Status before the transition
    pub old_status: String,
    /// Status after the transition
    pub new_status: String,
    /// Acting user as supplied by the caller (may be empty)
    pub changed_by: String,
    /// When the transition was applied
    pub changed_at: DateTime<Utc>,
    /// Optional operator notes
    pub notes: Option<String>,
}

impl StatusHistoryEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            request_id: row.get("request_id")?,
            old_status: row.get("old_status")?,
            new_status: row.get("new_status")?,
            changed_by: row.get("changed_by")?,
            changed_at: row.get("changed_at")?,
            notes: row.get("notes")?,
        })
    }
}

/// History store
///
/// Only appends and reads; entries are never updated or removed except by
/// the cascade when their request is deleted.
pub struct HistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> HistoryStore<'a> {
    /// Create a new history store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a transition record
    pub fn append(
        &self,
        request_id: &str,
        old_status: &str,
        new_status: &str,
        changed_by: &str,
        changed_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<StatusHistoryEntry> {
        let entry = StatusHistoryEntry {
            id: Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
            changed_by: changed_by.to_string(),
            changed_at,
            notes: notes.map(str::to_string),
        };

        self.conn.execute(
            "INSERT INTO status_history (id, request_id, old_status, new_status, changed_by, changed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.request_id,
                entry.old_status,
                entry.new_status,
                entry.changed_by,
                entry.changed_at,
                entry.notes,
            ],
        )?;

        Ok(entry)
    }

    /// All entries for a request, newest first
    pub fn list_for_request(&self, request_id: &str) -> Result<Vec<StatusHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, request_id, old_status, new_status, changed_by, changed_at, notes
             FROM status_history WHERE request_id = ?1
             ORDER BY changed_at DESC, rowid DESC",
        )?;

        let entries = stmt
            .query_map(params![request_id], StatusHistoryEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Number of entries recorded for a request
    pub fn count_for_request(&self, request_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM status_history WHERE request_id = ?1",
            params![request_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
