//! Lifecycle engine
//!
//! Applies a status transition to a request and appends the matching
//! history entry. The request save and the history append share one SQLite
//! transaction: either both are stored or neither is, and an entry is never
//! written unless the request save succeeded.

use crate::error::{EngineError, Result};
use crate::status::completion_percentage;
use chrono::{DateTime, Utc};
use lestockage::{HistoryStore, OnboardingRequest, RequestStore, StatusHistoryEntry, Storage};
use rusqlite::Connection;
use tracing::info;

/// A requested status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<'a> {
    /// Target status label (any non-empty string)
    pub new_status: &'a str,
    /// Acting user as supplied by the caller; unverified, may be empty
    pub acting_user: &'a str,
    /// Optional notes recorded with the history entry
    pub notes: Option<&'a str>,
}

impl<'a> StatusChange<'a> {
    /// Build a change without notes
    #[must_use]
    pub fn new(new_status: &'a str, acting_user: &'a str) -> Self {
        Self {
            new_status,
            acting_user,
            notes: None,
        }
    }

    /// Attach notes
    #[must_use]
    pub fn with_notes(mut self, notes: Option<&'a str>) -> Self {
        self.notes = notes;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.new_status.is_empty() {
            return Err(EngineError::Validation("status must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Result of a successful transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Request as persisted after the change
    pub request: OnboardingRequest,
    /// History entry recorded for the change
    pub entry: StatusHistoryEntry,
}

/// Lifecycle engine over a storage handle
pub struct LifecycleEngine<'a> {
    storage: &'a mut Storage,
}

impl<'a> LifecycleEngine<'a> {
    /// Create a new engine
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    /// Move a request to a new status
    ///
    /// Fails with `NotFound` if the request is absent (no history is
    /// written) and with `Persistence` if either write fails (nothing is
    /// written).
    pub fn transition_status(&mut self, request_id: &str, change: StatusChange<'_>) -> Result<Transition> {
        change.validate()?;

        let tx = self.storage.conn_mut().transaction()?;
        let mut request = RequestStore::new(&tx).get(request_id)?;
        let entry = apply_transition(&tx, &mut request, change, Utc::now())?;
        tx.commit()?;

        info!(
            request_id = %request.id,
            old_status = %entry.old_status,
            new_status = %entry.new_status,
            changed_by = %entry.changed_by,
            "status transitioned"
        );

        Ok(Transition { request, entry })
    }
}

/// Apply a status change to an already loaded request inside an open
/// transaction: set status and completion, save, then append history.
pub(crate) fn apply_transition(
    conn: &Connection,
    request: &mut OnboardingRequest,
    change: StatusChange<'_>,
    now: DateTime<Utc>,
) -> Result<StatusHistoryEntry> {
    let old_status = std::mem::replace(&mut request.status, change.new_status.to_string());
    request.completion_percentage = completion_percentage(change.new_status);
    request.updated_at = now;
    if !change.acting_user.is_empty() {
        request.updated_by = Some(change.acting_user.to_string());
    }

    RequestStore::new(conn).save(request)?;

    let entry = HistoryStore::new(conn).append(
        &request.id,
        &old_status,
        change.new_status,
        change.acting_user,
        now,
        change.notes,
    )?;

    Ok(entry)
}
