//! HTTP handlers for REST API endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, patch},
    Json, Router,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use leroutage::{open_request, IntakeRouter, LifecycleEngine, SharedStorage, StatusChange};
use lestockage::{
    Analytics, AssignmentStore, HistoryStore, OnboardingRequest, PageRequest, RequestDetails,
    RequestFilter, RequestStats, RequestStore, Storage,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, WILDCARD_ORIGIN};
use crate::error::{ApiError, ApiResult};
use crate::responses::{ApiResponse, HealthResponse, RequestDetailResponse};

/// Header carrying the acting user; unauthenticated
pub const USER_ID_HEADER: &str = "x-user-id";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex for contact email"));

/// Query parameters for the list endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Exact status filter
    pub status: Option<String>,

    /// Exact team filter
    pub assigned_team: Option<String>,

    /// Case-insensitive substring over names, email and reference
    pub search: Option<String>,

    /// Page number, 1-based
    pub page: Option<u32>,

    /// Page size
    pub limit: Option<u32>,
}

impl ListQuery {
    fn filter(&self) -> RequestFilter {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        RequestFilter {
            status: non_empty(&self.status),
            assigned_team: non_empty(&self.assigned_team),
            search: non_empty(&self.search),
        }
    }
}

/// Body of the status endpoint
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// Target status label
    pub status: String,

    /// Optional notes for the history entry
    pub notes: Option<String>,
}

/// State shared across all handlers
///
/// Handlers lock the storage mutex for the whole of each operation and
/// never hold the guard across an await point.
#[derive(Clone)]
pub struct AppState {
    /// Shared storage handle
    pub storage: SharedStorage,

    /// Background router for new requests
    pub router: IntakeRouter,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new AppState instance with storage and configuration
    pub fn new(storage: Storage, config: ServerConfig) -> Self {
        Self::new_from_arc(Arc::new(Mutex::new(storage)), config)
    }

    /// Create AppState from an existing shared storage handle
    pub fn new_from_arc(storage: SharedStorage, config: ServerConfig) -> Self {
        Self {
            router: IntakeRouter::new(Arc::clone(&storage)),
            storage,
            config: Arc::new(config),
        }
    }

    fn lock_storage(&self) -> ApiResult<MutexGuard<'_, Storage>> {
        self.storage.lock().map_err(|e| {
            warn!("storage mutex poisoned: {}", e);
            ApiError::unavailable("Storage unavailable")
        })
    }
}

/// Acting user from `X-User-ID`, empty when absent
fn acting_user(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn non_empty(user: String) -> Option<String> {
    (!user.is_empty()).then_some(user)
}

/// Check the submitter-supplied fields; returns per-field failures
pub fn validate_details(details: &RequestDetails) -> ApiResult<()> {
    let mut failures = Vec::new();

    if details.trading_name.trim().is_empty() {
        failures.push(json!({ "field": "tradingName", "message": "Trading name is required" }));
    }
    if details.contact_name.trim().is_empty() {
        failures.push(json!({ "field": "contactName", "message": "Contact name is required" }));
    }
    if !EMAIL_RE.is_match(details.contact_email.trim()) {
        failures.push(json!({ "field": "contactEmail", "message": "Valid email is required" }));
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(Value::Array(failures)))
    }
}

fn body_rejected(rejection: JsonRejection) -> ApiError {
    debug!("rejected body: {}", rejection.body_text());
    ApiError::validation(json!([{ "message": rejection.body_text() }]))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// POST /api/onboarding - Create a request and schedule routing
pub async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RequestDetails>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<OnboardingRequest>>)> {
    let Json(details) = payload.map_err(body_rejected)?;
    validate_details(&details)?;

    let request = {
        let storage = state.lock_storage()?;
        open_request(&storage, details, non_empty(acting_user(&headers)))?
    };

    // Routing outcome is reported through logs only
    drop(state.router.schedule(request.id.clone()));

    Ok((StatusCode::CREATED, Json(ApiResponse::success(request))))
}

/// GET /api/onboarding - Filtered, paginated listing
pub async fn list_requests(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<OnboardingRequest>>>> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::validation(json!([{ "message": rejection.body_text() }]))
    })?;

    let page = PageRequest::new(query.page, query.limit);
    let storage = state.lock_storage()?;
    let result = RequestStore::new(storage.conn()).list(&query.filter(), page)?;

    debug!(total = result.total, page = result.page, "listed requests");
    Ok(Json(ApiResponse::from_page(result)))
}

/// GET /api/onboarding/stats - Counts by status and team
pub async fn request_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<RequestStats>>> {
    let storage = state.lock_storage()?;
    let stats = Analytics::new(storage.conn()).request_stats()?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/onboarding/:id - Request with history and assignments
pub async fn get_request(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<RequestDetailResponse>>> {
    let storage = state.lock_storage()?;
    let conn = storage.conn();

    let request = RequestStore::new(conn).get(&id)?;
    let status_history = HistoryStore::new(conn).list_for_request(&id)?;
    let team_assignments = AssignmentStore::new(conn).list_for_request(&id)?;

    Ok(Json(ApiResponse::success(RequestDetailResponse {
        request,
        status_history,
        team_assignments,
    })))
}

/// PUT /api/onboarding/:id - Replace descriptive fields
pub async fn update_request(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RequestDetails>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<OnboardingRequest>>> {
    let Json(details) = payload.map_err(body_rejected)?;
    validate_details(&details)?;

    let storage = state.lock_storage()?;
    let request = RequestStore::new(storage.conn()).update_details(
        &id,
        details,
        non_empty(acting_user(&headers)),
    )?;

    info!(request_id = %request.id, "request details updated");
    Ok(Json(ApiResponse::success(request)))
}

/// PATCH /api/onboarding/:id/status - Manual status transition
pub async fn update_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<OnboardingRequest>>> {
    let Json(update) = payload.map_err(body_rejected)?;
    let user = acting_user(&headers);
    let change = StatusChange::new(&update.status, &user).with_notes(update.notes.as_deref());

    let mut storage = state.lock_storage()?;
    let transition = LifecycleEngine::new(&mut storage).transition_status(&id, change)?;

    Ok(Json(ApiResponse::success(transition.request)))
}

/// CORS layer for the configured frontend origins
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            if origin.trim() == WILDCARD_ORIGIN {
                warn!("ignoring wildcard CORS origin");
                return None;
            }
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid CORS origin: {}", origin);
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
}

/// Create router with all API endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/onboarding", get(list_requests).post(create_request))
        .route("/api/onboarding/stats", get(request_stats))
        .route("/api/onboarding/:id", get(get_request).put(update_request))
        .route("/api/onboarding/:id/status", patch(update_status))
}

/// Router with state, CORS and request tracing applied
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let app = create_router().layer(cors);
    let app = if state.config.enable_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };
    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn details(trading: &str, contact: &str, email: &str) -> RequestDetails {
        RequestDetails {
            trading_name: trading.to_string(),
            contact_name: contact.to_string(),
            contact_email: email.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_details_accepts_complete_submission() {
        assert!(validate_details(&details("Acme", "Ada", "ada@acme.example")).is_ok());
    }

    #[rstest]
    #[case("", "Ada", "ada@acme.example", "tradingName")]
    #[case("Acme", "  ", "ada@acme.example", "contactName")]
    #[case("Acme", "Ada", "not-an-email", "contactEmail")]
    #[case("Acme", "Ada", "ada@acme", "contactEmail")]
    fn test_validate_details_reports_field(
        #[case] trading: &str,
        #[case] contact: &str,
        #[case] email: &str,
        #[case] field: &str,
    ) {
        let err = validate_details(&details(trading, contact, email)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details.as_array().unwrap().len(), 1);
        assert_eq!(details[0]["field"], field);
    }

    #[test]
    fn test_acting_user_defaults_to_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(acting_user(&headers), "");

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("ops-7"));
        assert_eq!(acting_user(&headers), "ops-7");
    }

    #[test]
    fn test_build_app_skips_wildcard_origin() {
        let config = ServerConfig {
            cors_origins: vec!["*".to_string(), "http://localhost:3000".to_string()],
            ..Default::default()
        };
        let storage = Storage::open_in_memory().unwrap();
        let _app = build_app(AppState::new(storage, config));
    }

    #[test]
    fn test_list_query_drops_blank_filters() {
        let query = ListQuery {
            status: Some(String::new()),
            assigned_team: Some("Sales".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        };
        let filter = query.filter();
        assert!(filter.status.is_none());
        assert_eq!(filter.assigned_team.as_deref(), Some("Sales"));
        assert!(filter.search.is_none());
    }
}
