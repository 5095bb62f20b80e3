//! API response types matching the operations UI contract

use lestockage::{OnboardingRequest, RequestPage, StatusHistoryEntry, TeamAssignment};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Success flag
    pub success: bool,

    /// Response data
    pub data: T,

    /// Pagination block for list endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    /// Create a success response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
        }
    }
}

impl ApiResponse<Vec<OnboardingRequest>> {
    /// Create a paginated list response from a storage page
    pub fn from_page(page: RequestPage) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            success: true,
            data: page.requests,
            pagination: Some(pagination),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page served (1-based)
    pub page: u32,

    /// Page size
    pub limit: u32,

    /// Matching records across all pages
    pub total: i64,

    /// Number of pages
    pub total_pages: i64,
}

/// Single request with its audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetailResponse {
    /// Request record
    #[serde(flatten)]
    pub request: OnboardingRequest,

    /// Status transitions, newest first
    pub status_history: Vec<StatusHistoryEntry>,

    /// Routing decisions, newest first
    pub team_assignments: Vec<TeamAssignment>,
}

/// Health check body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the process answers
    pub status: String,

    /// Service name
    pub service: String,

    /// Crate version
    pub version: String,
}

impl HealthResponse {
    /// Health body for this build
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: "leserve".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_omits_pagination() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("pagination").is_none());
    }

    #[test]
    fn test_from_page_computes_total_pages() {
        let page = RequestPage {
            requests: Vec::new(),
            page: 2,
            limit: 20,
            total: 41,
        };
        let response = ApiResponse::from_page(page);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pagination"]["totalPages"], 3);
        assert_eq!(json["pagination"]["page"], 2);
    }
}
