//! Shared fixtures for the integration tests
//!
//! Catalog: admin 1, manager 2 owning cinema 1 "Grand Rex", viewers 7 (alice)
//! and 9 (bob); session 5 of "Dune" at price 1200, session 6 of "Heat" at 900.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_booker::application::{
    create_manager_registry, BookingService, PaymentCallbackProcessor, SharedManagerRegistry,
};
use cinema_booker::domain::{RepositoryProvider, UserRole};
use cinema_booker::infrastructure::crypto::{create_token, JwtConfig, WebhookVerifier, SIGNATURE_HEADER};
use cinema_booker::infrastructure::database::entities::{booking, cinema, event, movie, room, session, user};
use cinema_booker::infrastructure::{init_database_with_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
use cinema_booker::interfaces::http::middleware::JwtIdentityProvider;
use cinema_booker::interfaces::http::{create_api_router, ApiContext};
use cinema_booker::shared::ShutdownSignal;

pub const ADMIN_ID: i32 = 1;
pub const MANAGER_ID: i32 = 2;
pub const ALICE_ID: i32 = 7;
pub const BOB_ID: i32 = 9;
pub const SESSION_ID: i32 = 5;
pub const OTHER_SESSION_ID: i32 = 6;

pub const JWT_SECRET: &str = "integration-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const MAX_PAYLOAD: usize = 4096;

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub repos: Arc<dyn RepositoryProvider>,
    pub registry: SharedManagerRegistry,
    pub jwt: JwtConfig,
    pub verifier: WebhookVerifier,
    db_file: Option<PathBuf>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_database(&DatabaseConfig::in_memory(), None).await
    }

    /// Backed by a fresh SQLite file with a pool of several connections,
    /// so concurrent requests really contend for the database lock.
    pub async fn file_backed() -> Self {
        let path = std::env::temp_dir().join(format!("cinema-booker-{}.db", uuid::Uuid::new_v4()));
        let config = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 8,
        };
        Self::with_database(&config, Some(path)).await
    }

    async fn with_database(config: &DatabaseConfig, db_file: Option<PathBuf>) -> Self {
        let db = init_database_with_migrations(config)
            .await
            .expect("migrate test database");
        seed_catalog(&db).await;

        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let registry = create_manager_registry();
        let jwt = JwtConfig::new(JWT_SECRET, 1);
        let verifier = WebhookVerifier::new(WEBHOOK_SECRET, 300);

        let router = create_api_router(ApiContext {
            booking_service: Arc::new(BookingService::new(repos.clone())),
            processor: Arc::new(PaymentCallbackProcessor::new(
                repos.clone(),
                registry.clone(),
                verifier.clone(),
                MAX_PAYLOAD,
            )),
            registry: registry.clone(),
            identity: Arc::new(JwtIdentityProvider::new(jwt.clone())),
            db: db.clone(),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
            started_at: Instant::now(),
            ws_write_timeout: Duration::from_secs(1),
            ws_channel_capacity: 8,
            shutdown: ShutdownSignal::new(),
        });

        Self {
            router,
            db,
            repos,
            registry,
            jwt,
            verifier,
            db_file,
        }
    }

    pub fn token(&self, user_id: i32, role: UserRole) -> String {
        create_token(user_id, role, &self.jwt).expect("sign token")
    }

    pub fn viewer(&self, user_id: i32) -> String {
        self.token(user_id, UserRole::Viewer)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(self.router.clone(), request).await
    }

    pub async fn reserve(&self, user_id: i32, session_id: i32, seats: &[&str]) -> (StatusCode, Value) {
        let body = json!({ "session_id": session_id, "seats": seats });
        self.send(json_request(Method::POST, "/api/v1/bookings", Some(&self.viewer(user_id)), &body))
            .await
    }

    pub async fn cancel(&self, user_id: i32, booking_id: i32) -> StatusCode {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/v1/bookings/{}", booking_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.viewer(user_id)))
            .body(Body::empty())
            .unwrap();
        self.send(request).await.0
    }

    /// Signs `payload` with the shared secret and posts it to the webhook
    pub async fn deliver(&self, payload: &[u8]) -> (StatusCode, Value) {
        let signature = self.verifier.sign(payload, Utc::now().timestamp()).unwrap();
        self.deliver_with_signature(payload, &signature).await
    }

    pub async fn deliver_with_signature(&self, payload: &[u8], signature: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(payload.to_vec()))
            .unwrap();
        self.send(request).await
    }

    /// Status of every booking row for `place` in `session_id`, oldest first
    pub async fn statuses(&self, session_id: i32, place: &str) -> Vec<String> {
        let mut rows: Vec<booking::Model> = booking::Entity::find()
            .all(&self.db)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.session_id == session_id && b.place == place)
            .collect();
        rows.sort_by_key(|b| b.id);
        rows.into_iter().map(|b| b.status).collect()
    }

    pub async fn booking_count(&self) -> usize {
        booking::Entity::find().all(&self.db).await.unwrap().len()
    }

    pub async fn booking_id(&self, session_id: i32, place: &str) -> i32 {
        booking::Entity::find()
            .all(&self.db)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.session_id == session_id && b.place == place)
            .map(|b| b.id)
            .max()
            .expect("booking row")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(path) = &self.db_file {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
            }
        }
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A `checkout.session.completed` event with the metadata the checkout creator attaches
pub fn checkout_event(event_id: &str, session_id: i32, seats: &[&str]) -> Vec<u8> {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": {
            "session_id": session_id.to_string(),
            "seats": serde_json::to_string(seats).unwrap(),
        }}}
    })
    .to_string()
    .into_bytes()
}

pub async fn seed_catalog(db: &DatabaseConnection) {
    for (id, name, role) in [
        (ADMIN_ID, "admin", user::UserRole::Admin),
        (MANAGER_ID, "manager", user::UserRole::Manager),
        (ALICE_ID, "alice", user::UserRole::Viewer),
        (BOB_ID, "bob", user::UserRole::Viewer),
    ] {
        user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(format!("{}@example.com", name)),
            role: Set(role),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
    }

    cinema::ActiveModel {
        id: Set(1),
        user_id: Set(MANAGER_ID),
        name: Set("Grand Rex".into()),
        description: Set(None),
    }
    .insert(db)
    .await
    .unwrap();

    for (id, title) in [(1, "Dune"), (2, "Heat")] {
        movie::ActiveModel {
            id: Set(id),
            title: Set(title.into()),
            language: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }

    room::ActiveModel {
        id: Set(1),
        cinema_id: Set(1),
        number: Set(1),
    }
    .insert(db)
    .await
    .unwrap();

    for (event_id, movie_id) in [(1, 1), (2, 2)] {
        event::ActiveModel {
            id: Set(event_id),
            cinema_id: Set(1),
            movie_id: Set(movie_id),
        }
        .insert(db)
        .await
        .unwrap();
    }

    for (session_id, event_id, price) in [(SESSION_ID, 1, 1200), (OTHER_SESSION_ID, 2, 900)] {
        session::ActiveModel {
            id: Set(session_id),
            event_id: Set(event_id),
            room_id: Set(1),
            price: Set(price),
            starts_at: Set(Utc::now() + chrono::Duration::days(1)),
            deleted_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }
}
