//! End-to-end tests against the assembled router

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{create_api_router, ApiOptions};
use crate::application::testing::{seeded_repos, FakeGateway, FakeMode};
use crate::application::{BookingServices, CatalogConfig, CheckoutConfig, LedgerConfig};
use crate::domain::PaymentGateway;
use crate::infrastructure::payment::notification_signature;

const SERVER_KEY: &str = "SB-Mid-server-test";

async fn app_with(gateway: Arc<dyn PaymentGateway>, verify_signature: bool) -> Router {
    let services = BookingServices::new(
        seeded_repos().await,
        gateway,
        LedgerConfig::default(),
        CheckoutConfig::default(),
        CatalogConfig::default(),
    );
    create_api_router(
        services,
        ApiOptions {
            verify_signature,
            server_key: SERVER_KEY.to_string(),
            ..ApiOptions::default()
        },
    )
}

async fn app() -> Router {
    app_with(FakeGateway::approving(), false).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

fn slot_item(hour: i32) -> Value {
    json!({
        "court_id": 1,
        "date": "2024-06-01",
        "start_min": hour * 60,
        "end_min": (hour + 1) * 60,
        "price": 90000
    })
}

fn notification(code: &str, status: &str) -> Value {
    json!({ "order_id": code, "transaction_status": status })
}

async fn slot_status(app: &Router, hour: i32) -> String {
    let (_, body) = get(app, "/courts/1/slots?date=2024-06-01").await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["start_min"] == hour * 60)
        .map(|s| s["status"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn checkout_books_slot_and_returns_redirect() {
    let app = app().await;

    let (status, body) = post(&app, "/checkout", json!({ "items": [slot_item(7)] })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    let code = data["code"].as_str().unwrap();
    assert!(code.starts_with("RESV"));
    assert_eq!(data["status"], "pending");
    assert_eq!(data["total"], 90000);
    assert_eq!(data["redirect"], format!("https://pay.example/v2/vtweb/{}", code));
    assert_eq!(data["items"][0]["start_time"], "07:00");

    assert_eq!(slot_status(&app, 7).await, "booked");

    let (status, body) = get(&app, &format!("/bookings/{}", code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_checkouts_for_one_slot_yield_one_conflict() {
    let app = app().await;

    let (a, b) = tokio::join!(
        post(&app, "/checkout", json!({ "items": [slot_item(8)] })),
        post(&app, "/checkout", json!({ "items": [slot_item(8)] })),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let loser = if a.0 == StatusCode::CONFLICT { a.1 } else { b.1 };
    assert_eq!(loser["success"], false);
    assert_eq!(loser["code"], "slot_unavailable");
    assert_eq!(loser["details"]["slot"]["start_time"], "08:00");

    let (_, list) = get(&app, "/bookings").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn settlement_webhook_is_idempotent() {
    let app = app().await;
    let (_, body) = post(&app, "/checkout", json!({ "items": [slot_item(7)] })).await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, ack) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "applied");
    assert_eq!(ack["data"]["booking_status"], "paid");

    let (status, ack) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "ignored");
    assert_eq!(ack["data"]["booking_status"], "paid");

    let (_, booking) = get(&app, &format!("/bookings/{}", code)).await;
    assert_eq!(booking["data"]["status"], "paid");
    assert_eq!(slot_status(&app, 7).await, "booked");
}

#[tokio::test]
async fn expired_payment_frees_slot_for_rebooking() {
    let app = app().await;
    let (_, body) = post(&app, "/checkout", json!({ "items": [slot_item(9)] })).await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, ack) = post(&app, "/notification", notification(&code, "expire")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["booking_status"], "failed");
    assert_eq!(slot_status(&app, 9).await, "free");

    // late settlement is acknowledged but changes nothing
    let (status, ack) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "ignored");
    assert_eq!(ack["data"]["booking_status"], "failed");

    let (status, _) = post(&app, "/checkout", json!({ "items": [slot_item(9)] })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_order_is_acknowledged() {
    let app = app().await;
    let (status, ack) = post(&app, "/notification", notification("RESV-NOPE", "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "unknown_order");
    assert!(ack["data"].get("booking_status").is_none());
}

#[tokio::test]
async fn odd_notification_payloads_are_acknowledged() {
    let app = app().await;
    let (_, body) = post(&app, "/checkout", json!({ "items": [slot_item(8)] })).await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, ack) = post(&app, "/notification", notification(&code, "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "unchanged");
    assert_eq!(ack["data"]["booking_status"], "pending");
    assert_eq!(slot_status(&app, 8).await, "booked");

    let long_code = "X".repeat(60);
    let (status, ack) = post(&app, "/notification", notification(&long_code, "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "unknown_order");
    assert_eq!(ack["data"]["order_id"], long_code);

    let (status, err) = post(&app, "/notification", notification("", "settlement")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "validation_error");
}

#[tokio::test]
async fn signature_is_checked_when_enabled() {
    let app = app_with(FakeGateway::approving(), true).await;
    let (_, body) = post(&app, "/checkout", json!({ "items": [slot_item(7)] })).await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, err) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "invalid_signature");

    let signed = json!({
        "order_id": code,
        "transaction_status": "settlement",
        "status_code": "200",
        "gross_amount": "90000.00",
        "signature_key": notification_signature(&code, "200", "90000.00", SERVER_KEY),
    });
    let (status, ack) = post(&app, "/notification", signed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["booking_status"], "paid");
}

#[tokio::test]
async fn gateway_outage_returns_503_and_keeps_slot_free() {
    let app = app_with(FakeGateway::failing(), false).await;
    let (status, err) = post(&app, "/checkout", json!({ "items": [slot_item(7)] })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err["code"], "payment_gateway_unavailable");
    assert_eq!(slot_status(&app, 7).await, "free");
}

#[tokio::test]
async fn malformed_checkouts_are_rejected() {
    let app = app().await;

    let (status, err) = send(
        &app,
        Request::post("/checkout")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_json");

    let (status, err) = post(&app, "/checkout", json!({ "items": [] })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "validation_error");

    let (status, err) = post(
        &app,
        "/checkout",
        json!({ "items": [{ "courtId": 1, "date": "2024-06-01", "startMin": 600, "endMin": 660, "price": 90000 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "unknown_slot");

    let mut cheap = slot_item(7);
    cheap["price"] = json!(1);
    let (status, err) = post(&app, "/checkout", json!({ "items": [cheap] })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "price_mismatch");
    assert_eq!(err["details"]["expected"], 90000);
    assert_eq!(slot_status(&app, 7).await, "free");
}

#[tokio::test]
async fn read_endpoints_handle_bad_input() {
    let app = app().await;

    let (status, body) = get(&app, "/courts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Lapangan Lor");

    let (status, err) = get(&app, "/courts/1/slots?date=01-06-2024").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "validation_error");

    let (status, err) = get(&app, "/courts/99/slots").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "not_found");

    let (status, _) = get(&app, "/bookings/RESV-NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for limit in ["0", "999", "abc"] {
        let (status, body) = get(&app, &format!("/bookings?limit={}", limit)).await;
        assert_eq!(status, StatusCode::OK, "limit={}", limit);
        assert!(body["data"].is_array());
    }
}

#[tokio::test]
async fn health_reports_in_memory_store_and_echoes_request_id() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");

    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "in_memory");
}

#[tokio::test]
async fn openapi_document_notes_the_response_envelope() {
    let app = app().await;
    let (status, doc) = get(&app, "/api-doc/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let description = doc["info"]["description"].as_str().unwrap();
    assert!(description.contains("data.redirect"));
    assert!(doc["paths"]["/notification"]["post"]["responses"]
        .get("503")
        .is_some());
}

#[tokio::test]
async fn notification_during_checkout_is_503_then_applies() {
    let gateway = Arc::new(FakeGateway::new(FakeMode::Slow(Duration::from_millis(200))));
    let app = app_with(gateway.clone(), false).await;

    let checkout = tokio::spawn({
        let app = app.clone();
        async move { post(&app, "/checkout", json!({ "items": [slot_item(9)] })).await }
    });
    let code = loop {
        if let Some(request) = gateway.requests().first() {
            break request.order_code.clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    let (status, err) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err["code"], "checkout_in_progress");

    let (status, _) = checkout.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let (status, ack) = post(&app, "/notification", notification(&code, "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["data"]["outcome"], "applied");
}
