//! API Router with Swagger UI

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{BookingService, PaymentCallbackProcessor, SharedManagerRegistry};
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState, IdentityProvider};
use crate::interfaces::http::modules::bookings::{
    self, BookingDto, BookingHandlerState, BookingPage, BookingSessionDto, BookingUserDto,
    CreateBookingRequest, ReservationDraftDto,
};
use crate::interfaces::http::modules::health::{self, ComponentHealth, HealthResponse, HealthState};
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::webhook::{self, WebhookAck, WebhookState};
use crate::interfaces::ws::{manager_ws_handler, ManagerWsState};
use crate::shared::ShutdownSignal;

/// Everything the HTTP and WebSocket routes need, built once at startup
#[derive(Clone)]
pub struct ApiContext {
    pub booking_service: Arc<BookingService>,
    pub processor: Arc<PaymentCallbackProcessor>,
    pub registry: SharedManagerRegistry,
    pub identity: Arc<dyn IdentityProvider>,
    pub db: DatabaseConnection,
    pub metrics: PrometheusHandle,
    pub started_at: Instant,
    pub ws_write_timeout: Duration,
    pub ws_channel_capacity: usize,
    pub shutdown: ShutdownSignal,
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        webhook::payment_webhook,
    ),
    components(
        schemas(
            ApiResponse<String>,
            CreateBookingRequest,
            ReservationDraftDto,
            BookingDto,
            BookingUserDto,
            BookingSessionDto,
            BookingPage,
            WebhookAck,
            HealthResponse,
            ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Bookings", description = "Seat reservations for cinema sessions"),
        (name = "Payments", description = "Payment provider callbacks"),
    ),
    info(
        title = "Cinema Booker API",
        version = "1.0.0",
        description = "Seat reservation, payment confirmation and manager notifications",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(ctx: ApiContext) -> Router {
    let auth_state = AuthState {
        identity: Arc::clone(&ctx.identity),
    };

    let booking_routes = Router::new()
        .route(
            "/",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/{id}",
            get(bookings::get_booking).delete(bookings::cancel_booking),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(BookingHandlerState {
            service: Arc::clone(&ctx.booking_service),
        });

    // Authenticated by signature, not by bearer token
    let webhook_routes = Router::new()
        .route("/", post(webhook::payment_webhook))
        .layer(DefaultBodyLimit::max(ctx.processor.max_payload_bytes()))
        .with_state(WebhookState {
            processor: Arc::clone(&ctx.processor),
        });

    // Token checked inside the handler: browsers cannot send headers on upgrade
    let ws_routes = Router::new()
        .route("/{manager_id}", get(manager_ws_handler))
        .with_state(ManagerWsState {
            registry: ctx.registry.clone(),
            identity: Arc::clone(&ctx.identity),
            write_timeout: ctx.ws_write_timeout,
            channel_capacity: ctx.ws_channel_capacity,
            shutdown: ctx.shutdown.clone(),
        });

    let health_routes = Router::new()
        .route("/", get(health::health_check))
        .with_state(HealthState {
            db: ctx.db.clone(),
            registry: ctx.registry.clone(),
            started_at: Arc::new(ctx.started_at),
        });

    let metrics_routes = Router::new()
        .route("/", get(prometheus_metrics))
        .with_state(MetricsState {
            handle: ctx.metrics.clone(),
        });

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .nest("/health", health_routes)
        .nest("/metrics", metrics_routes)
        .nest("/api/v1/bookings", booking_routes)
        .nest("/api/v1/webhook", webhook_routes)
        .nest("/ws", ws_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/health",
            "/api/v1/bookings",
            "/api/v1/bookings/{id}",
            "/api/v1/webhook",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
