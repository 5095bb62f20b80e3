// Onboarding request persistence operations

use crate::error::{Result, StorageError};
use crate::reference::ReferenceNumber;
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// How many fresh reference numbers to try before giving up on a create
pub const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// Default page size for listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound on page size for listings
pub const MAX_PAGE_LIMIT: u32 = 100;

const SELECT_COLUMNS: &str = "id, trading_name, contact_name, contact_email, contact_phone,
    company_address, industry, company_size, request_type, region, status, assigned_team,
    assigned_user_id, completion_percentage, reference_number, notes, created_at, updated_at,
    created_by, updated_by";

const FILTER_CLAUSE: &str = "(?1 IS NULL OR status = ?1)
    AND (?2 IS NULL OR assigned_team = ?2)
    AND (?3 IS NULL
         OR trading_name LIKE ?3 ESCAPE '\\'
         OR contact_name LIKE ?3 ESCAPE '\\'
         OR contact_email LIKE ?3 ESCAPE '\\'
         OR reference_number LIKE ?3 ESCAPE '\\')";

/// Descriptive attributes of a request, supplied by the submitter
///
/// Everything here is opaque to the lifecycle engine except `region`,
/// `request_type` and `company_size`, which routing inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    /// Customer trading name
    pub trading_name: String,
    /// Primary contact name
    pub contact_name: String,
    /// Primary contact email
    pub contact_email: String,
    /// Primary contact phone
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Registered company address
    #[serde(default)]
    pub company_address: Option<String>,
    /// Industry sector
    #[serde(default)]
    pub industry: Option<String>,
    /// Company size band (e.g. "Enterprise")
    #[serde(default)]
    pub company_size: Option<String>,
    /// Kind of request (e.g. "Upgrade")
    #[serde(default)]
    pub request_type: Option<String>,
    /// Sales region (e.g. "International")
    #[serde(default)]
    pub region: Option<String>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stored onboarding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    /// Globally unique identifier (UUID v4)
    pub id: String,
    /// Descriptive attributes
    #[serde(flatten)]
    pub details: RequestDetails,
    /// Current lifecycle status label
    pub status: String,
    /// Team chosen by routing, if routed
    pub assigned_team: Option<String>,
    /// Individual assignee (not used by routing)
    pub assigned_user_id: Option<String>,
    /// Progress value derived from `status`
    pub completion_percentage: u8,
    /// Human-readable reference number
    pub reference_number: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Caller that created the request
    pub created_by: Option<String>,
    /// Caller that last edited the request
    pub updated_by: Option<String>,
}

impl OnboardingRequest {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            details: RequestDetails {
                trading_name: row.get("trading_name")?,
                contact_name: row.get("contact_name")?,
                contact_email: row.get("contact_email")?,
                contact_phone: row.get("contact_phone")?,
                company_address: row.get("company_address")?,
                industry: row.get("industry")?,
                company_size: row.get("company_size")?,
                request_type: row.get("request_type")?,
                region: row.get("region")?,
                notes: row.get("notes")?,
            },
            status: row.get("status")?,
            assigned_team: row.get("assigned_team")?,
            assigned_user_id: row.get("assigned_user_id")?,
            completion_percentage: row.get("completion_percentage")?,
            reference_number: row.get("reference_number")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            created_by: row.get("created_by")?,
            updated_by: row.get("updated_by")?,
        })
    }
}

/// Input for creating a request
///
/// Lifecycle values are chosen by the caller so the store stays ignorant
/// of status semantics.
#[derive(Debug, Clone)]
pub struct NewRequest {
    /// Descriptive attributes
    pub details: RequestDetails,
    /// Initial status label
    pub status: String,
    /// Completion value matching `status`
    pub completion_percentage: u8,
    /// Caller identity, unverified
    pub created_by: Option<String>,
}

/// Filter for listing requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// Exact status match
    pub status: Option<String>,
    /// Exact assigned team match
    pub assigned_team: Option<String>,
    /// Case-insensitive substring over name, contact, email and reference
    pub search: Option<String>,
}

impl RequestFilter {
    fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }

    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Page selector (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a page selector, clamping out-of-range values
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPage {
    /// Requests on this page, newest first
    pub requests: Vec<OnboardingRequest>,
    /// Page number served
    pub page: u32,
    /// Page size used
    pub limit: u32,
    /// Matching requests across all pages
    pub total: i64,
}

impl RequestPage {
    /// Number of pages needed for `total` at `limit`
    #[must_use]
    pub fn total_pages(&self) -> i64 {
        let limit = i64::from(self.limit.max(1));
        (self.total + limit - 1) / limit
    }
}

/// Request store for CRUD operations
///
/// Works against a plain connection or an open transaction.
pub struct RequestStore<'a> {
    conn: &'a Connection,
}

impl<'a> RequestStore<'a> {
    /// Create a new request store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new request with a fresh id and reference number
    ///
    /// A reference number collision is retried with a new number up to
    /// [`MAX_REFERENCE_ATTEMPTS`] times.
    pub fn create(&self, new: NewRequest) -> Result<OnboardingRequest> {
        let now = Utc::now();
        let mut request = OnboardingRequest {
            id: Uuid::new_v4().to_string(),
            details: new.details,
            status: new.status,
            assigned_team: None,
            assigned_user_id: None,
            completion_percentage: new.completion_percentage,
            reference_number: String::new(),
            created_at: now,
            updated_at: now,
            created_by: new.created_by.clone(),
            updated_by: new.created_by,
        };

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            request.reference_number = ReferenceNumber::generate_at(now).into();
            match self.insert(&request) {
                Ok(()) => {
                    debug!(request_id = %request.id, reference = %request.reference_number, "request created");
                    return Ok(request);
                }
                Err(err) if is_unique_violation(&err) => {
                    warn!(
                        reference = %request.reference_number,
                        attempt,
                        "reference number collision, regenerating"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(StorageError::Conflict(format!(
            "no unique reference number after {} attempts",
            MAX_REFERENCE_ATTEMPTS
        )))
    }

    fn insert(&self, r: &OnboardingRequest) -> rusqlite::Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO onboarding_requests ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                SELECT_COLUMNS
            ),
            params![
                r.id,
                r.details.trading_name,
                r.details.contact_name,
                r.details.contact_email,
                r.details.contact_phone,
                r.details.company_address,
                r.details.industry,
                r.details.company_size,
                r.details.request_type,
                r.details.region,
                r.status,
                r.assigned_team,
                r.assigned_user_id,
                r.completion_percentage,
                r.reference_number,
                r.details.notes,
                r.created_at,
                r.updated_at,
                r.created_by,
                r.updated_by,
            ],
        )?;
        Ok(())
    }

    /// Look up a request by id
    pub fn find(&self, id: &str) -> Result<Option<OnboardingRequest>> {
        let request = self
            .conn
            .query_row(
                &format!("SELECT {} FROM onboarding_requests WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                OnboardingRequest::from_row,
            )
            .optional()?;
        Ok(request)
    }

    /// Look up a request by id, failing with `NotFound` if absent
    pub fn get(&self, id: &str) -> Result<OnboardingRequest> {
        self.find(id)?
            .ok_or_else(|| StorageError::NotFound(format!("onboarding request {}", id)))
    }

    /// Look up a request by its reference number
    pub fn find_by_reference(&self, reference: &str) -> Result<Option<OnboardingRequest>> {
        let request = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM onboarding_requests WHERE reference_number = ?1",
                    SELECT_COLUMNS
                ),
                params![reference],
                OnboardingRequest::from_row,
            )
            .optional()?;
        Ok(request)
    }

    /// Full-row save of every mutable column
    ///
    /// Identity, reference number and creation bookkeeping are never rewritten.
    pub fn save(&self, r: &OnboardingRequest) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE onboarding_requests SET
                trading_name = ?2, contact_name = ?3, contact_email = ?4, contact_phone = ?5,
                company_address = ?6, industry = ?7, company_size = ?8, request_type = ?9,
                region = ?10, status = ?11, assigned_team = ?12, assigned_user_id = ?13,
                completion_percentage = ?14, notes = ?15, updated_at = ?16, updated_by = ?17
             WHERE id = ?1",
            params![
                r.id,
                r.details.trading_name,
                r.details.contact_name,
                r.details.contact_email,
                r.details.contact_phone,
                r.details.company_address,
                r.details.industry,
                r.details.company_size,
                r.details.request_type,
                r.details.region,
                r.status,
                r.assigned_team,
                r.assigned_user_id,
                r.completion_percentage,
                r.details.notes,
                r.updated_at,
                r.updated_by,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("onboarding request {}", r.id)));
        }
        Ok(())
    }

    /// Replace the descriptive attributes of a request
    ///
    /// Lifecycle columns (status, completion, team) are left untouched.
    /// `updated_by` is only overwritten when an editor is supplied.
    pub fn update_details(
        &self,
        id: &str,
        details: RequestDetails,
        updated_by: Option<String>,
    ) -> Result<OnboardingRequest> {
        let mut request = self.get(id)?;
        request.details = details;
        request.updated_at = Utc::now();
        if updated_by.is_some() {
            request.updated_by = updated_by;
        }
        self.save(&request)?;
        Ok(request)
    }

    /// Delete a request; history and assignments cascade
    ///
    /// Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM onboarding_requests WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Count requests matching a filter
    pub fn count(&self, filter: &RequestFilter) -> Result<i64> {
        let total = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM onboarding_requests WHERE {}", FILTER_CLAUSE),
            params![
                RequestFilter::non_empty(&filter.status),
                RequestFilter::non_empty(&filter.assigned_team),
                filter.search_pattern(),
            ],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// List requests matching a filter, newest first
    pub fn list(&self, filter: &RequestFilter, page: PageRequest) -> Result<RequestPage> {
        let total = self.count(filter)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM onboarding_requests WHERE {}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?4 OFFSET ?5",
            SELECT_COLUMNS, FILTER_CLAUSE
        ))?;

        let requests = stmt
            .query_map(
                params![
                    RequestFilter::non_empty(&filter.status),
                    RequestFilter::non_empty(&filter.assigned_team),
                    filter.search_pattern(),
                    page.limit,
                    page.offset(),
                ],
                OnboardingRequest::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(RequestPage {
            requests,
            page: page.page,
            limit: page.limit,
            total,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
