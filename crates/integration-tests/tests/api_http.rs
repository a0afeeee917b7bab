//! End-to-end checks through the axum router: real JWT verification,
//! in-memory storage and the manual clock from the harness.

use std::sync::Arc;

use api_adapters::{router, AppState, Metrics, RouterOptions};
use auth_adapters::{JwtConfig, JwtIdentityVerifier};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use domains::{DomainError, MockIdentityVerifier, SportType};
use integration_tests::{court_details, monday_morning, venue_details, Harness};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    harness: Harness,
    jwt: Arc<JwtIdentityVerifier>,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let harness = Harness::new(monday_morning());
        let jwt = Arc::new(JwtIdentityVerifier::new(JwtConfig {
            secret: "integration-secret".to_string().into(),
            issuer: None,
            audience: None,
            leeway_secs: 0,
        }));
        let state = AppState::new(harness.services.clone(), jwt.clone(), Arc::new(Metrics::new()));
        let app = router(state, RouterOptions::default());
        Self { harness, jwt, app }
    }

    fn token(&self, subject: &str) -> String {
        let email = format!("{subject}@courtside.test");
        self.jwt.sign(subject, &email, None, Utc::now() + Duration::hours(1)).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.app, method, uri, token, body).await
    }
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let t = TestApp::new();

    let (status, body) = t.call(Method::GET, "/bookings/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let (status, _) = t.call(Method::GET, "/bookings/my", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid token but never synced.
    let token = t.token("ghost");
    let (status, _) = t.call(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t.call(Method::GET, "/venues/approved", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn sync_creates_once_then_returns_the_existing_account() {
    let t = TestApp::new();
    let token = t.token("sam");

    let (status, body) = t.call(Method::POST, "/auth/users", Some(&token), Some(json!({ "role": "facility_owner" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    assert_eq!(body["user"]["role"], "facility_owner");
    assert_eq!(body["home_path"], "/owner/dashboard");

    let (status, body) = t.call(Method::POST, "/auth/users", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);

    let (status, body) = t.call(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "sam@courtside.test");

    let eve = t.token("eve");
    let (status, body) = t.call(Method::POST, "/auth/users", Some(&eve), Some(json!({ "role": "admin" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn venue_moderation_and_booking_flow() {
    let t = TestApp::new();
    let owner = t.token("owner");
    let player = t.token("player");
    let admin = t.token("root");
    t.harness.seed_admin("root").await;

    t.call(Method::POST, "/auth/users", Some(&owner), Some(json!({ "role": "facility_owner" }))).await;
    t.call(Method::POST, "/auth/users", Some(&player), Some(json!({}))).await;

    let details = serde_json::to_value(venue_details("Net Play", vec![SportType::Badminton])).unwrap();
    let (status, venue) = t.call(Method::POST, "/venues", Some(&owner), Some(details.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(venue["status"], "pending");
    let venue_id = venue["id"].as_str().unwrap().to_string();

    // Players cannot register venues.
    let (status, _) = t.call(Method::POST, "/venues", Some(&player), Some(details)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.call(Method::PUT, &format!("/admin/venues/{venue_id}/approve"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, approved) = t.call(Method::PUT, &format!("/admin/venues/{venue_id}/approve"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (_, listed) = t.call(Method::GET, "/venues/approved?sport=badminton", None, None).await;
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["name"], "Net Play");

    // Court set up through the service layer, booked over HTTP.
    let owner_actor = t.harness.services.users.resolve(&integration_tests::claims("owner")).await.unwrap().0;
    let court = t
        .harness
        .services
        .courts
        .add(&owner_actor, venue_id.parse().unwrap(), court_details("Court 1", SportType::Badminton, 800))
        .await
        .unwrap();

    let request = json!({
        "court_id": court.id,
        "date": "2024-01-02",
        "start_time": "18:00:00",
        "slot_count": 2,
    });
    let (status, booking) = t.call(Method::POST, "/bookings", Some(&player), Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["total_amount"], 1600);
    assert_eq!(booking["end_time"], "20:00:00");

    let (status, body) = t.call(Method::POST, "/bookings", Some(&player), Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert!(body["error"]["message"].as_str().is_some());

    let (status, mine) = t.call(Method::GET, "/bookings/my", Some(&player), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["total"], 1);

    let booking_id = booking["id"].as_str().unwrap();
    let uri = format!("/bookings/{booking_id}/cancel");
    let (status, _) = t.call(Method::POST, &uri, Some(&player), Some(json!({ "reason": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, cancelled) = t.call(Method::POST, &uri, Some(&player), Some(json!({ "reason": "rain" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, metrics) = {
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = t.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    };
    assert!(metrics.contains("courtside_bookings_total{outcome=\"Created\"} 1"));
    assert!(metrics.contains("courtside_bookings_total{outcome=\"Conflict\"} 1"));
    assert!(metrics.contains("courtside_http_requests_total"));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let t = TestApp::new();
    let (status, body) = t.call(Method::GET, &format!("/venues/{}", uuid::Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn health_reports_ok_with_a_request_id() {
    let t = TestApp::new();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn identity_provider_failures_surface_as_bad_gateway() {
    let harness = Harness::new(monday_morning());
    let mut identity = MockIdentityVerifier::new();
    identity
        .expect_verify()
        .returning(|_| Err(DomainError::Upstream("identity provider unreachable".into())));
    let state = AppState::new(harness.services.clone(), Arc::new(identity), Arc::new(Metrics::new()));
    let app = router(state, RouterOptions::default());

    let (status, body) = send(&app, Method::GET, "/auth/me", Some("anything"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    // Details stay in the logs.
    assert!(!body["error"]["message"].as_str().unwrap().contains("unreachable"));
}
