//! # Integration Tests for parkway-api
//!
//! Drives the assembled router with `tower::ServiceExt::oneshot` over the
//! in-memory store and a manual clock: lot administration, booking and
//! release, capacity changes, user reports, error mapping, and the
//! OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use tower::ServiceExt;

use parkway_api::config::AppConfig;
use parkway_api::state::AppState;
use parkway_core::{ManualClock, Timestamp};
use parkway_engine::MemoryStore;

/// Helper: app over a fresh in-memory store and a clock the test controls.
fn test_app() -> (axum::Router, ManualClock) {
    let clock = ManualClock::new(Timestamp::parse("2026-03-02T10:00:00+05:30").unwrap());
    let state = AppState::with_store(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
        None,
    );
    (parkway_api::app(state), clock)
}

/// Helper: read response body as string.
async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn user_request(method: &str, uri: &str, user: i64) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user.to_string())
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Helper: create a lot and return its id.
async fn create_lot(app: &axum::Router, pincode: &str, spots: u32) -> i64 {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/lots",
            serde_json::json!({
                "location": "Central Mall",
                "address": "12 MG Road",
                "pincode": pincode,
                "hourly_rate": 10.0,
                "max_spots": spots,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["id"].as_i64().unwrap()
}

/// Helper: book a spot and return the response JSON.
async fn book(app: &axum::Router, lot: i64, user: i64) -> (StatusCode, serde_json::Value) {
    let resp = app
        .clone()
        .oneshot(user_request("POST", &format!("/v1/lots/{lot}/bookings"), user))
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

// ── Health probes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_health_liveness() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn test_health_readiness_without_database() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ready");
}

// ── Lots ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_lot_applies_default_time_cap() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 3).await;

    let resp = app.oneshot(get(&format!("/v1/lots/{id}"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let lot = body_json(resp).await;
    assert_eq!(lot["max_spots"], 3);
    assert_eq!(lot["max_time_minutes"], 60);
    assert_eq!(lot["pincode"], "560001");
}

#[tokio::test]
async fn test_create_lot_rejects_blank_location() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/v1/lots",
            serde_json::json!({
                "location": "   ",
                "address": "12 MG Road",
                "pincode": "560001",
                "hourly_rate": 10.0,
                "max_spots": 2,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("location"));
}

#[tokio::test]
async fn test_create_lot_rejects_non_positive_rate() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/v1/lots",
            serde_json::json!({
                "location": "Central Mall",
                "address": "12 MG Road",
                "pincode": "560001",
                "hourly_rate": 0.0,
                "max_spots": 2,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_lot_malformed_json_is_bad_request() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/lots")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_missing_lot_is_not_found() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/v1/lots/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["retryable"], false);
}

#[tokio::test]
async fn test_available_lots_filters_by_prefix_and_free_spots() {
    let (app, _) = test_app();
    let north = create_lot(&app, "560001", 1).await;
    let south = create_lot(&app, "560034", 2).await;
    let other = create_lot(&app, "110001", 2).await;

    let (status, _) = book(&app, north, 7).await;
    assert_eq!(status, StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(get("/v1/lots?pincode_prefix=560"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ids: Vec<i64> = body_json(resp)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|lot| lot["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![south]);

    let resp = app.oneshot(get("/v1/lots")).await.unwrap();
    let all = body_json(resp).await;
    let ids: Vec<i64> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|lot| lot["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![south, other]);
}

#[tokio::test]
async fn test_update_lot_changes_price_and_clears_cap() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;

    let resp = app
        .oneshot(json_request(
            "PATCH",
            &format!("/v1/lots/{id}"),
            serde_json::json!({ "hourly_rate": 25.0, "clear_max_time": true }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let lot = body_json(resp).await;
    assert_eq!(lot["hourly_rate"], 25.0);
    assert!(lot["max_time_minutes"].is_null());
    assert_eq!(lot["location"], "Central Mall");
}

#[tokio::test]
async fn test_delete_lot_then_not_found() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 2).await;
    let (status, _) = book(&app, id, 3).await;
    assert_eq!(status, StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/lots/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(get(&format!("/v1/lots/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(get("/v1/users/3/reservations/history"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!([]));
}

// ── Bookings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_booking_requires_user_header() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/lots/{id}/bookings"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_booking_rejects_non_numeric_user() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/lots/{id}/bookings"))
                .header("x-user-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_full_lot_is_conflict() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;

    let (status, first) = book(&app, id, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "active");
    assert_eq!(first["user_id"], 1);
    assert!(first["check_out"].is_null());
    assert!(first["total_cost"].is_null());

    let (status, second) = book(&app, id, 2).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["error"]["code"], "LOT_FULL");
}

#[tokio::test]
async fn test_booking_missing_lot_is_not_found() {
    let (app, _) = test_app();
    let (status, body) = book(&app, 42, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_release_bills_elapsed_hours() {
    let (app, clock) = test_app();
    let id = create_lot(&app, "560001", 2).await;
    let (_, booked) = book(&app, id, 9).await;
    let reservation = booked["id"].as_i64().unwrap();

    clock.advance(TimeDelta::minutes(130));

    let resp = app
        .oneshot(user_request(
            "POST",
            &format!("/v1/reservations/{reservation}/release"),
            9,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let released = body_json(resp).await;
    assert_eq!(released["status"], "completed");
    assert_eq!(released["display_cost"], 21.67);
    let cost = released["total_cost"].as_f64().unwrap();
    assert!((cost - 130.0 / 60.0 * 10.0).abs() < 1e-9);
    assert!(released["check_out"].is_string());
}

#[tokio::test]
async fn test_release_by_other_user_is_forbidden() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;
    let (_, booked) = book(&app, id, 1).await;
    let reservation = booked["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(user_request(
            "POST",
            &format!("/v1/reservations/{reservation}/release"),
            2,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Spot is still held.
    let (status, _) = book(&app, id, 3).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_second_release_is_conflict() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;
    let (_, booked) = book(&app, id, 1).await;
    let uri = format!("/v1/reservations/{}/release", booked["id"]);

    let resp = app.clone().oneshot(user_request("POST", &uri, 1)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(user_request("POST", &uri, 1)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "ALREADY_CLOSED");
}

#[tokio::test]
async fn test_release_missing_reservation_is_not_found() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(user_request("POST", "/v1/reservations/77/release", 1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_frees_spot_without_cost() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 1).await;
    let (_, booked) = book(&app, id, 1).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/reservations/{}/cancel", booked["id"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled = body_json(resp).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["total_cost"].is_null());

    let (status, _) = book(&app, id, 2).await;
    assert_eq!(status, StatusCode::CREATED);
}

// ── Capacity and occupancy ──────────────────────────────────────────

#[tokio::test]
async fn test_resize_shrink_below_occupied_is_conflict() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 3).await;
    book(&app, id, 1).await;
    book(&app, id, 2).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/lots/{id}/capacity"),
            serde_json::json!({ "max_spots": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_FREE_SPOTS");

    let resp = app
        .oneshot(get(&format!("/v1/lots/{id}")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["max_spots"], 3);
}

#[tokio::test]
async fn test_resize_grow_and_shrink() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 2).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/lots/{id}/capacity"),
            serde_json::json!({ "max_spots": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let grown = body_json(resp).await;
    assert_eq!(grown["previous_max_spots"], 2);
    assert_eq!(grown["new_max_spots"], 5);
    assert_eq!(grown["added"], 3);
    assert_eq!(grown["removed"], 0);

    let resp = app
        .oneshot(json_request(
            "PUT",
            &format!("/v1/lots/{id}/capacity"),
            serde_json::json!({ "max_spots": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let shrunk = body_json(resp).await;
    assert_eq!(shrunk["removed"], 4);
    assert_eq!(shrunk["new_max_spots"], 1);
}

#[tokio::test]
async fn test_occupancy_reports_split() {
    let (app, _) = test_app();
    let id = create_lot(&app, "560001", 4).await;
    book(&app, id, 1).await;

    let resp = app
        .oneshot(get(&format!("/v1/lots/{id}/occupancy")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let occupancy = body_json(resp).await;
    assert_eq!(occupancy["available"], 3);
    assert_eq!(occupancy["occupied"], 1);
    assert_eq!(occupancy["percentage"], 25.0);
}

// ── User reports ────────────────────────────────────────────────────

#[tokio::test]
async fn test_user_history_active_and_summary() {
    let (app, clock) = test_app();
    let id = create_lot(&app, "560001", 3).await;

    let (_, first) = book(&app, id, 5).await;
    clock.advance(TimeDelta::minutes(30));
    let (_, second) = book(&app, id, 5).await;
    clock.advance(TimeDelta::minutes(150));

    let resp = app
        .clone()
        .oneshot(user_request(
            "POST",
            &format!("/v1/reservations/{}/release", first["id"]),
            5,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(get("/v1/users/5/reservations/active"))
        .await
        .unwrap();
    let active = body_json(resp).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], second["id"]);

    let resp = app
        .clone()
        .oneshot(get("/v1/users/5/reservations/history"))
        .await
        .unwrap();
    let history = body_json(resp).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    // Newest check-in first.
    assert_eq!(history[0]["id"], second["id"]);
    assert_eq!(history[1]["id"], first["id"]);

    let resp = app.oneshot(get("/v1/users/5/summary")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let summary = body_json(resp).await;
    assert_eq!(summary["user_id"], 5);
    assert_eq!(summary["total_bookings"], 2);
    assert_eq!(summary["total_spent"], 30.0);
    assert_eq!(summary["total_hours"], 3.0);
}

#[tokio::test]
async fn test_unknown_user_summary_is_empty() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/v1/users/404/summary")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let summary = body_json(resp).await;
    assert_eq!(summary["total_bookings"], 0);
    assert_eq!(summary["total_spent"], 0.0);
}

// ── Operational surface ─────────────────────────────────────────────

#[tokio::test]
async fn test_openapi_spec_lists_paths() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let spec = body_json(resp).await;
    let paths = spec["paths"].as_object().unwrap();
    assert!(paths.contains_key("/v1/lots"));
    assert!(paths.contains_key("/v1/lots/{id}/bookings"));
    assert!(paths.contains_key("/v1/reservations/{id}/release"));
    assert!(paths.contains_key("/v1/users/{id}/summary"));
}

#[tokio::test]
async fn test_metrics_without_recorder_is_not_found() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/v1/nothing-here")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
