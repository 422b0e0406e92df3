//! Router-level tests driving the real application router over an
//! in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use api_rest::AppState;
use api_shared::auth::{AuthConfig, AuthMode};

async fn app(mode: AuthMode) -> Router {
    let pool = mcr_core::db::connect_in_memory()
        .await
        .expect("in-memory database");
    let state = AppState::new(pool, AuthConfig::new("test-secret", mode));
    api_rest::router(state, None)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_location(app: &Router, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/locations", json!({ "name": name })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let app = app(AuthMode::Permissive).await;
    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], json!(true));
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = app(AuthMode::Strict).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "username": "soklin" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["username"], json!("soklin"));

    // In strict mode the token is required...
    let response = app
        .clone()
        .oneshot(get_request("/locations"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // ...and sufficient.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/locations")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn permissive_mode_degrades_to_public_identity() {
    let app = app(AuthMode::Permissive).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/locations")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_normalises_and_mirrors_the_queue_token() {
    let app = app(AuthMode::Permissive).await;
    let location = create_location(&app, "Poipet").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/registration",
            json!({
                "patient": { "english_name": "Alice", "location_id": location },
                "visit": { "location_id": location, "visit_date": "2026-03-01", "queue_no": "2a" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["patient"]["queue_no"], json!("2A"));
    assert_eq!(body["visit"]["queue_no"], json!("2A"));

    // A second patient claiming the same token conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/registration",
            json!({
                "patient": { "english_name": "Bora", "location_id": location },
                "visit": { "location_id": location, "visit_date": "2026-03-01", "queue_no": "2A" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["kind"], json!("duplicate_queue_entry"));
}

#[tokio::test]
async fn validation_failures_carry_the_structured_body() {
    let app = app(AuthMode::Permissive).await;
    let location = create_location(&app, "Poipet").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/registration",
            json!({
                "patient": { "location_id": location }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["kind"], json!("validation"));
    assert!(body["message"].as_str().unwrap().contains("english_name"));
}

#[tokio::test]
async fn record_upsert_round_trips_through_the_api() {
    let app = app(AuthMode::Permissive).await;
    let location = create_location(&app, "Poipet").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/registration",
            json!({
                "patient": { "english_name": "Alice", "location_id": location },
                "visit": { "location_id": location, "visit_date": "2026-03-01", "queue_no": "1" }
            }),
        ))
        .await
        .unwrap();
    let visit_id = body_json(response).await["visit"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/consultation/{visit_id}"),
            json!({ "notes": "fit for work", "require_referral": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/visits/{visit_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["consultation"]["notes"], json!("fit for work"));
    assert_eq!(body["vitals"], Value::Null);
}

#[tokio::test]
async fn export_serves_csv() {
    let app = app(AuthMode::Permissive).await;
    let location = create_location(&app, "Poipet").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/registration",
            json!({
                "patient": { "english_name": "Alice", "location_id": location },
                "visit": { "location_id": location, "visit_date": "2026-03-01", "queue_no": "2A" }
            }),
        ))
        .await
        .unwrap();
    let visit_id = body_json(response).await["visit"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/referrals",
            json!({
                "visit_id": visit_id,
                "referral_date": "2026-03-01",
                "referral_type": "SEVA",
                "illness": "cataract"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get_request(
            "/export/referrals-by-date?date=2026-03-01&format=csv",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.contains("Alice,2A,2026-03-01,SEVA,cataract"));

    let response = app
        .clone()
        .oneshot(get_request(
            "/export/referrals-by-date?date=2026-03-01&format=excel",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
