// Integration tests for the onboarding REST API
//
// Drives the full router (CORS and tracing layers included) with oneshot
// requests against an in-memory database.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use leserve::{build_app, AppState, ServerConfig};
use lestockage::Storage;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let storage = Storage::open_in_memory().unwrap();
    build_app(AppState::new(storage, ServerConfig::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, method, uri, body, None).await
}

async fn send_as(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    user: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-ID", user);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn submission(trading_name: &str, region: &str) -> Value {
    json!({
        "tradingName": trading_name,
        "contactName": "Jane Doe",
        "contactEmail": "jane@example.com",
        "region": region,
        "requestType": "New Installation",
        "companySize": "Small",
    })
}

async fn create(app: &Router, trading_name: &str, region: &str) -> Value {
    let (status, body) = send(app, Method::POST, "/api/onboarding", Some(submission(trading_name, region))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

/// Poll the detail endpoint until background routing has assigned a team
async fn wait_until_routed(app: &Router, id: &str) -> Value {
    let uri = format!("/api/onboarding/{}", id);
    for _ in 0..100 {
        let (status, body) = send(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        if !body["data"]["assignedTeam"].is_null() {
            return body["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("request {} was never routed", id);
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_returns_new_request_then_routes() {
    let app = app();
    let (status, body) = send_as(
        &app,
        Method::POST,
        "/api/onboarding",
        Some(submission("Globex", "International")),
        Some("web-form"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let created = &body["data"];
    assert_eq!(created["status"], "New");
    assert_eq!(created["completionPercentage"], 0);
    assert_eq!(created["createdBy"], "web-form");
    assert!(created["referenceNumber"]
        .as_str()
        .unwrap()
        .starts_with("ONB-"));

    let id = created["id"].as_str().unwrap();
    let routed = wait_until_routed(&app, id).await;
    assert_eq!(routed["assignedTeam"], "Sales");
    assert_eq!(routed["status"], "Under Review");
    assert_eq!(routed["completionPercentage"], 25);

    let history = routed["statusHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["oldStatus"], "New");
    assert_eq!(history[0]["newStatus"], "Under Review");
    assert_eq!(history[0]["changedBy"], "system");

    let assignments = routed["teamAssignments"].as_array().unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0]["teamName"], "Sales");
    assert_eq!(assignments[0]["status"], "Pending");
}

#[tokio::test]
async fn test_create_rejects_invalid_submission() {
    let app = app();

    let mut bad_email = submission("Initech", "North");
    bad_email["contactEmail"] = json!("not-an-email");
    let (status, body) = send(&app, Method::POST, "/api/onboarding", Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation error");
    assert_eq!(body["details"][0]["field"], "contactEmail");

    let missing = json!({ "contactName": "Jane" });
    let (status, body) = send(&app, Method::POST, "/api/onboarding", Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");

    let (_, list) = send(&app, Method::GET, "/api/onboarding", None).await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_status_patch_records_history() {
    let app = app();
    let created = create(&app, "Umbrella", "North").await;
    let id = created["id"].as_str().unwrap().to_string();
    wait_until_routed(&app, &id).await;

    let uri = format!("/api/onboarding/{}/status", id);
    let (status, body) = send_as(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({ "status": "In Progress", "notes": "kick-off booked" })),
        Some("ops-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "In Progress");
    assert_eq!(body["data"]["completionPercentage"], 50);

    // Unknown labels are accepted and complete to zero
    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "Archived" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Archived");
    assert_eq!(body["data"]["completionPercentage"], 0);

    let (_, detail) = send(&app, Method::GET, &format!("/api/onboarding/{}", id), None).await;
    let history = detail["data"]["statusHistory"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["newStatus"], "Archived");
    assert_eq!(history[0]["changedBy"], "");
    assert_eq!(history[1]["newStatus"], "In Progress");
    assert_eq!(history[1]["changedBy"], "ops-1");
    assert_eq!(history[1]["notes"], "kick-off booked");
}

#[tokio::test]
async fn test_status_patch_rejects_empty_status() {
    let app = app();
    let created = create(&app, "Hooli", "North").await;
    let uri = format!("/api/onboarding/{}/status", created["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_request_is_404() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/onboarding/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/onboarding/does-not-exist/status",
        Some(json!({ "status": "Completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/onboarding/does-not-exist",
        Some(submission("Nobody", "North")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_replaces_details_only() {
    let app = app();
    let created = create(&app, "Stark Industries", "North").await;
    let id = created["id"].as_str().unwrap().to_string();
    let routed = wait_until_routed(&app, &id).await;

    let mut edited = submission("Stark Enterprises", "North");
    edited["notes"] = json!("renamed");
    let (status, body) = send_as(
        &app,
        Method::PUT,
        &format!("/api/onboarding/{}", id),
        Some(edited),
        Some("ops-9"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let updated = &body["data"];
    assert_eq!(updated["tradingName"], "Stark Enterprises");
    assert_eq!(updated["notes"], "renamed");
    assert_eq!(updated["updatedBy"], "ops-9");
    assert_eq!(updated["status"], routed["status"]);
    assert_eq!(updated["assignedTeam"], routed["assignedTeam"]);
    assert_eq!(updated["referenceNumber"], created["referenceNumber"]);
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let app = app();
    for i in 0..5 {
        create(&app, &format!("Vendor {}", i), "North").await;
    }
    let special = create(&app, "Wayne Enterprises", "North").await;

    let (status, body) = send(&app, Method::GET, "/api/onboarding?page=2&limit=4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 6);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["page"], 2);

    let (_, body) = send(&app, Method::GET, "/api/onboarding?search=wayne", None).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], special["id"]);

    let (_, body) = send(&app, Method::GET, "/api/onboarding?limit=1000", None).await;
    assert_eq!(body["pagination"]["limit"], 100);

    let (status, _) = send(&app, Method::GET, "/api/onboarding?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_count_by_status_and_team() {
    let app = app();
    let first = create(&app, "Acme", "International").await;
    let second = create(&app, "Contoso", "North").await;
    wait_until_routed(&app, first["id"].as_str().unwrap()).await;
    wait_until_routed(&app, second["id"].as_str().unwrap()).await;

    let (status, body) = send(&app, Method::GET, "/api/onboarding/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["byStatus"]["Under Review"], 2);
    assert_eq!(body["data"]["byTeam"]["Sales"], 2);
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/onboarding")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_poisoned_storage_is_503() {
    let state = AppState::new(Storage::open_in_memory().unwrap(), ServerConfig::default());
    let shared = Arc::clone(&state.storage);
    let poisoned = std::thread::spawn(move || {
        let _guard = shared.lock().unwrap();
        panic!("storage lock holder crashed");
    })
    .join();
    assert!(poisoned.is_err());
    let app = build_app(state);

    let (status, body) = send(&app, Method::GET, "/api/onboarding", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

    let (status, _) = send(&app, Method::POST, "/api/onboarding", Some(submission("Acme", "North"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_update_without_user_keeps_updated_by() {
    let app = app();
    let created = create(&app, "Cyberdyne", "North").await;
    let id = created["id"].as_str().unwrap().to_string();
    wait_until_routed(&app, &id).await;
    let uri = format!("/api/onboarding/{}", id);

    let (status, _) = send_as(&app, Method::PUT, &uri, Some(submission("Cyberdyne Systems", "North")), Some("ops-3")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PUT, &uri, Some(submission("Cyberdyne Labs", "North"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tradingName"], "Cyberdyne Labs");
    assert_eq!(body["data"]["updatedBy"], "ops-3");
}

#[tokio::test]
async fn test_status_patch_accepts_whitespace_label() {
    let app = app();
    let created = create(&app, "Tyrell", "North").await;
    let uri = format!("/api/onboarding/{}/status", created["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "  " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "  ");
    assert_eq!(body["data"]["completionPercentage"], 0);
}
