//! Payment confirmation through the signed webhook

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use cinema_booker::application::ManagerMessage;

use common::*;

#[tokio::test]
async fn confirmation_notifies_manager_once() {
    let app = TestApp::new().await;
    let (tx, mut rx) = mpsc::channel(8);
    app.registry.register(MANAGER_ID, tx);

    app.reserve(ALICE_ID, SESSION_ID, &["A1", "A2"]).await;
    let payload = checkout_event("evt_c", SESSION_ID, &["A1", "A2"]);

    let (status, body) = app.deliver(&payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "confirmed");
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["CONFIRMED"]);
    assert_eq!(app.statuses(SESSION_ID, "A2").await, vec!["CONFIRMED"]);

    let message = rx.try_recv().expect("manager notified");
    let text: Value = serde_json::from_str(&message.to_text().unwrap()).unwrap();
    assert_eq!(text["type"], "booking_confirmed");
    assert_eq!(text["user_name"], "alice");
    assert_eq!(text["seats"], json!(["A1", "A2"]));
    let ManagerMessage::BookingConfirmed { message: summary, .. } = message;
    assert!(summary.contains("alice"));
    assert!(summary.contains("A1"));

    // provider retry of the same event
    let (status, body) = app.deliver(&payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "duplicate");
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["CONFIRMED"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn tampered_signature_changes_nothing() {
    let app = TestApp::new().await;
    let (tx, mut rx) = mpsc::channel(8);
    app.registry.register(MANAGER_ID, tx);
    app.reserve(ALICE_ID, SESSION_ID, &["A1", "A2"]).await;

    let payload = checkout_event("evt_e", SESSION_ID, &["A1", "A2"]);
    let timestamp = Utc::now().timestamp();
    let forged = format!("t={},v1={}", timestamp, "00".repeat(32));

    let (status, body) = app.deliver_with_signature(&payload, &forged).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["PENDING"]);
    assert_eq!(app.statuses(SESSION_ID, "A2").await, vec!["PENDING"]);
    assert!(rx.try_recv().is_err());

    // the event id was not consumed by the rejected delivery
    let (status, body) = app.deliver(&payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "confirmed");
}

#[tokio::test]
async fn signature_over_other_body_is_rejected() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["A1"]).await;

    let signed = checkout_event("evt_x", SESSION_ID, &["A9"]);
    let signature = app.verifier.sign(&signed, Utc::now().timestamp()).unwrap();
    let sent = checkout_event("evt_x", SESSION_ID, &["A1"]);

    let (status, _) = app.deliver_with_signature(&sent, &signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["PENDING"]);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let app = TestApp::new().await;
    let payload = checkout_event("evt_m", SESSION_ID, &["A1"]);
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/webhook")
        .body(axum::body::Body::from(payload))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrelated_events_are_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": { "metadata": {} } }
    })
    .to_string();

    let (status, body) = app.deliver(payload.as_bytes()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "ignored");
}

#[tokio::test]
async fn malformed_metadata_is_400() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["A1"]).await;
    let payload = json!({
        "id": "evt_bad",
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "session_id": "5", "seats": "A1" } } }
    })
    .to_string();

    let (status, _) = app.deliver(payload.as_bytes()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["PENDING"]);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let app = TestApp::new().await;
    let payload = vec![b' '; MAX_PAYLOAD + 1];
    let (status, _) = app.deliver(&payload).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn payment_after_cancel_keeps_seat_canceled() {
    let app = TestApp::new().await;
    let (tx, mut rx) = mpsc::channel(8);
    app.registry.register(MANAGER_ID, tx);

    app.reserve(ALICE_ID, SESSION_ID, &["A1"]).await;
    let id = app.booking_id(SESSION_ID, "A1").await;
    assert_eq!(app.cancel(ALICE_ID, id).await, StatusCode::NO_CONTENT);

    let (status, body) = app
        .deliver(&checkout_event("evt_late", SESSION_ID, &["A1"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "no_matching_bookings");
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["CANCELED"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn partial_cohort_confirms_what_is_pending() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["A1", "A2"]).await;
    let id = app.booking_id(SESSION_ID, "A2").await;
    app.cancel(ALICE_ID, id).await;

    let (status, body) = app
        .deliver(&checkout_event("evt_partial", SESSION_ID, &["A1", "A2"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "confirmed");
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["CONFIRMED"]);
    assert_eq!(app.statuses(SESSION_ID, "A2").await, vec!["CANCELED"]);
}

#[tokio::test]
async fn disconnected_manager_does_not_block_confirmation() {
    let app = TestApp::new().await;
    app.reserve(BOB_ID, SESSION_ID, &["B1"]).await;

    let (status, body) = app
        .deliver(&checkout_event("evt_offline", SESSION_ID, &["B1"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "confirmed");
    assert_eq!(app.statuses(SESSION_ID, "B1").await, vec!["CONFIRMED"]);
    assert!(!app.registry.is_connected(MANAGER_ID));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_redelivery_confirms_once() {
    let app = TestApp::file_backed().await;
    let (tx, mut rx) = mpsc::channel(8);
    app.registry.register(MANAGER_ID, tx);
    app.reserve(ALICE_ID, SESSION_ID, &["A1", "A2"]).await;

    let payload = checkout_event("evt_race", SESSION_ID, &["A1", "A2"]);
    let ((first_status, first), (second_status, second)) =
        tokio::join!(app.deliver(&payload), app.deliver(&payload));
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);

    let mut outcomes = vec![
        first["data"]["outcome"].as_str().unwrap().to_string(),
        second["data"]["outcome"].as_str().unwrap().to_string(),
    ];
    outcomes.sort();
    assert_eq!(outcomes, vec!["confirmed", "duplicate"]);

    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["CONFIRMED"]);
    assert_eq!(app.statuses(SESSION_ID, "A2").await, vec!["CONFIRMED"]);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}
