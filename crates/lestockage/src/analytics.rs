// Aggregate statistics over onboarding requests

use crate::error::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dashboard statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    /// Total number of requests
    pub total: i64,
    /// Request count per status label
    pub by_status: BTreeMap<String, i64>,
    /// Request count per assigned team (unrouted requests excluded)
    pub by_team: BTreeMap<String, i64>,
}

/// Analytics over the request table
pub struct Analytics<'a> {
    conn: &'a Connection,
}

impl<'a> Analytics<'a> {
    /// Create a new analytics instance
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Total, per-status and per-team counts
    pub fn request_stats(&self) -> Result<RequestStats> {
        let total = self
            .conn
            .query_row("SELECT COUNT(*) FROM onboarding_requests", [], |row| row.get(0))?;

        Ok(RequestStats {
            total,
            by_status: self.grouped(
                "SELECT status, COUNT(*) FROM onboarding_requests GROUP BY status",
            )?,
            by_team: self.grouped(
                "SELECT assigned_team, COUNT(*) FROM onboarding_requests
                 WHERE assigned_team IS NOT NULL GROUP BY assigned_team",
            )?,
        })
    }

    fn grouped(&self, sql: &str) -> Result<BTreeMap<String, i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(counts)
    }
}
