//! Reservation lifecycle through the HTTP API

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::json;
use tokio::task::JoinHandle;

use cinema_booker::application::booking::expire_pending_bookings;
use cinema_booker::infrastructure::database::entities::booking;

use common::*;

#[tokio::test]
async fn reserve_then_conflict() {
    let app = TestApp::new().await;

    let (status, body) = app.reserve(ALICE_ID, SESSION_ID, &["A1", "A2"]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "session_id": 5, "seats": ["A1", "A2"], "price": 1200 }));
    assert_eq!(app.statuses(SESSION_ID, "A1").await, vec!["PENDING"]);
    assert_eq!(app.statuses(SESSION_ID, "A2").await, vec!["PENDING"]);

    let (status, body) = app.reserve(BOB_ID, SESSION_ID, &["A1"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("A1"));
    assert_eq!(app.booking_count().await, 2);
}

#[tokio::test]
async fn overlapping_request_inserts_nothing() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["B2"]).await;

    let (status, _) = app.reserve(BOB_ID, SESSION_ID, &["B1", "B2", "B3"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.statuses(SESSION_ID, "B1").await.is_empty());
    assert!(app.statuses(SESSION_ID, "B3").await.is_empty());
}

#[tokio::test]
async fn same_seat_in_another_session_is_free() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["A1"]).await;

    let (status, body) = app.reserve(BOB_ID, OTHER_SESSION_ID, &["A1"]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price"], 900);
}

fn spawn_reservation(app: &TestApp, user_id: i32, seats: Vec<String>) -> JoinHandle<StatusCode> {
    let router = app.router.clone();
    let token = app.viewer(user_id);
    tokio::spawn(async move {
        let body = json!({ "session_id": SESSION_ID, "seats": seats });
        send(router, json_request(Method::POST, "/api/v1/bookings", Some(&token), &body))
            .await
            .0
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_hold_a_seat_once() {
    let app = TestApp::file_backed().await;
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let user_id = if i % 2 == 0 { ALICE_ID } else { BOB_ID };
            spawn_reservation(&app, user_id, vec!["C1".into(), "C2".into()])
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(app.statuses(SESSION_ID, "C1").await, vec!["PENDING"]);
    assert_eq!(app.statuses(SESSION_ID, "C2").await, vec!["PENDING"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_of_distinct_seats_all_succeed() {
    let app = TestApp::file_backed().await;
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let user_id = if i % 2 == 0 { ALICE_ID } else { BOB_ID };
            spawn_reservation(&app, user_id, vec![format!("D{}", i), format!("E{}", i)])
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }
    assert_eq!(app.booking_count().await, 32);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app.reserve(ALICE_ID, SESSION_ID, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.reserve(ALICE_ID, SESSION_ID, &["A1", "A1"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.reserve(ALICE_ID, SESSION_ID, &["  "]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.reserve(ALICE_ID, 404, &["A1"]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = json!({ "session_id": SESSION_ID, "seats": ["A1"] });
    let (status, body) = app
        .send(json_request(Method::POST, "/api/v1/bookings", None, &body))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    assert_eq!(app.booking_count().await, 0);
}

#[tokio::test]
async fn cancel_frees_the_seat() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["D1"]).await;
    let id = app.booking_id(SESSION_ID, "D1").await;

    assert_eq!(app.cancel(BOB_ID, id).await, StatusCode::FORBIDDEN);
    assert_eq!(app.cancel(ALICE_ID, id).await, StatusCode::NO_CONTENT);
    assert_eq!(app.cancel(ALICE_ID, id).await, StatusCode::NO_CONTENT);
    assert_eq!(app.cancel(ALICE_ID, 9999).await, StatusCode::NOT_FOUND);

    let (status, _) = app.reserve(BOB_ID, SESSION_ID, &["D1"]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.statuses(SESSION_ID, "D1").await, vec!["CANCELED", "PENDING"]);
}

#[tokio::test]
async fn confirmed_booking_cannot_be_canceled() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["E1"]).await;
    let (status, _) = app.deliver(&checkout_event("evt_paid", SESSION_ID, &["E1"])).await;
    assert_eq!(status, StatusCode::OK);

    let id = app.booking_id(SESSION_ID, "E1").await;
    assert_eq!(app.cancel(ALICE_ID, id).await, StatusCode::CONFLICT);
    assert_eq!(app.statuses(SESSION_ID, "E1").await, vec!["CONFIRMED"]);
}

#[tokio::test]
async fn get_and_list_return_details() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["F1", "F2"]).await;
    app.reserve(BOB_ID, OTHER_SESSION_ID, &["G1"]).await;
    let id = app.booking_id(SESSION_ID, "F1").await;
    let token = app.viewer(ALICE_ID);

    let get = |uri: String| {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = app.send(get(format!("/api/v1/bookings/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["place"], "F1");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["user"]["name"], "alice");
    assert_eq!(body["session"]["movie_title"], "Dune");
    assert_eq!(body["session"]["cinema_name"], "Grand Rex");

    let (status, _) = app.send(get("/api/v1/bookings/9999".into())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send(get("/api/v1/bookings?page=1&limit=2".into())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_pages"], 2);

    let (_, body) = app.send(get("/api/v1/bookings?search=heat".into())).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["place"], "G1");
}

#[tokio::test]
async fn stale_pending_reservations_expire() {
    let app = TestApp::new().await;
    app.reserve(ALICE_ID, SESSION_ID, &["H1"]).await;
    app.reserve(BOB_ID, SESSION_ID, &["H2"]).await;
    app.reserve(BOB_ID, SESSION_ID, &["H3"]).await;
    app.deliver(&checkout_event("evt_h3", SESSION_ID, &["H3"])).await;

    for place in ["H1", "H3"] {
        let id = app.booking_id(SESSION_ID, place).await;
        let mut aged = booking::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        aged.created_at = Set(Utc::now() - chrono::Duration::hours(1));
        aged.update(&app.db).await.unwrap();
    }

    let expired = expire_pending_bookings(app.repos.as_ref(), 15).await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(app.statuses(SESSION_ID, "H1").await, vec!["CANCELED"]);
    assert_eq!(app.statuses(SESSION_ID, "H2").await, vec!["PENDING"]);
    assert_eq!(app.statuses(SESSION_ID, "H3").await, vec!["CONFIRMED"]);

    let (status, _) = app.reserve(BOB_ID, SESSION_ID, &["H1"]).await;
    assert_eq!(status, StatusCode::CREATED);
}
