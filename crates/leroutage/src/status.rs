//! Request status labels and the completion policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an onboarding request
///
/// Operators may set any label; labels outside the known set are kept
/// verbatim as [`RequestStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    /// Freshly created, not yet routed
    New,
    /// Routed to a team and awaiting pickup
    UnderReview,
    /// Being worked on
    InProgress,
    /// Paused
    OnHold,
    /// Done
    Completed,
    /// Any other operator-supplied label
    Other(String),
}

impl RequestStatus {
    /// Parse a status label; unknown labels are preserved
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "New" => RequestStatus::New,
            "Under Review" => RequestStatus::UnderReview,
            "In Progress" => RequestStatus::InProgress,
            "On Hold" => RequestStatus::OnHold,
            "Completed" => RequestStatus::Completed,
            other => RequestStatus::Other(other.to_string()),
        }
    }

    /// Return the stored label
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::UnderReview => "Under Review",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::OnHold => "On Hold",
            RequestStatus::Completed => "Completed",
            RequestStatus::Other(label) => label,
        }
    }

    /// Completion percentage for this status
    ///
    /// Unknown labels map to 0.
    #[must_use]
    pub fn completion_percentage(&self) -> u8 {
        match self {
            RequestStatus::New => 0,
            RequestStatus::UnderReview => 25,
            RequestStatus::InProgress => 50,
            RequestStatus::OnHold => 25,
            RequestStatus::Completed => 100,
            RequestStatus::Other(_) => 0,
        }
    }

    /// Whether the label is one of the recognised statuses
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, RequestStatus::Other(_))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RequestStatus {
    fn from(label: String) -> Self {
        RequestStatus::parse(&label)
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Completion policy: map a status label to its completion percentage
#[must_use]
pub fn completion_percentage(status: &str) -> u8 {
    RequestStatus::parse(status).completion_percentage()
}
