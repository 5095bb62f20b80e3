// Team assignment records

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status given to every new assignment
pub const ASSIGNMENT_PENDING: &str = "Pending";

/// Record of a routing decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    /// Assignment identifier
    pub id: String,
    /// Owning request
    pub request_id: String,
    /// Team the request was routed to
    pub team_name: String,
    /// Individual assignee, if any
    pub assigned_user_id: Option<String>,
    /// When the decision was recorded
    pub assigned_at: DateTime<Utc>,
    /// Assignment status
    pub status: String,
}

impl TeamAssignment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            request_id: row.get("request_id")?,
            team_name: row.get("team_name")?,
            assigned_user_id: row.get("assigned_user_id")?,
            assigned_at: row.get("assigned_at")?,
            status: row.get("status")?,
        })
    }
}

/// Assignment store
pub struct AssignmentStore<'a> {
    conn: &'a Connection,
}

impl<'a> AssignmentStore<'a> {
    /// Create a new assignment store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record a new pending assignment
    pub fn create(
        &self,
        request_id: &str,
        team_name: &str,
        assigned_user_id: Option<&str>,
        assigned_at: DateTime<Utc>,
    ) -> Result<TeamAssignment> {
        let assignment = TeamAssignment {
            id: Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            team_name: team_name.to_string(),
            assigned_user_id: assigned_user_id.map(str::to_string),
            assigned_at,
            status: ASSIGNMENT_PENDING.to_string(),
        };

        self.conn.execute(
            "INSERT INTO team_assignments (id, request_id, team_name, assigned_user_id, assigned_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                assignment.id,
                assignment.request_id,
                assignment.team_name,
                assignment.assigned_user_id,
                assignment.assigned_at,
                assignment.status,
            ],
        )?;

        Ok(assignment)
    }

    /// All assignments for a request, newest first
    pub fn list_for_request(&self, request_id: &str) -> Result<Vec<TeamAssignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, request_id, team_name, assigned_user_id, assigned_at, status
             FROM team_assignments WHERE request_id = ?1
             ORDER BY assigned_at DESC, rowid DESC",
        )?;

        let assignments = stmt
            .query_map(params![request_id], TeamAssignment::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(assignments)
    }
}
