//! lestockage - Persistent Storage Layer
//!
//! *Le Stockage* (The Storage) - SQLite records for onboarding requests and their audit trail

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Aggregate request statistics.
pub mod analytics;
/// Team assignment records.
pub mod assignments;
/// Storage error types.
pub mod error;
/// Append-only status history.
pub mod history;
/// Human-readable reference numbers.
pub mod reference;
/// Onboarding request records, listing and search.
pub mod requests;
/// Persisted routing rules.
pub mod routing_rules;
/// Database schema and connection management.
pub mod schema;

pub use analytics::{Analytics, RequestStats};
pub use assignments::{AssignmentStore, TeamAssignment, ASSIGNMENT_PENDING};
pub use error::{Result, StorageError};
pub use history::{HistoryStore, StatusHistoryEntry};
pub use reference::ReferenceNumber;
pub use requests::{
    NewRequest, OnboardingRequest, PageRequest, RequestDetails, RequestFilter, RequestPage,
    RequestStore,
};
pub use routing_rules::{RoutingRuleRecord, RoutingRuleStore};
pub use schema::{Storage, StorageConfig};
