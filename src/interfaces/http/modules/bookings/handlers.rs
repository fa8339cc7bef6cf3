//! Booking handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{BookingDto, BookingPage, CreateBookingRequest, ListBookingsParams, ReservationDraftDto};
use crate::application::BookingService;
use crate::domain::booking::CreateBooking;
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Booking handler state
#[derive(Clone)]
pub struct BookingHandlerState {
    pub service: Arc<BookingService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Seats reserved as PENDING", body = ReservationDraftDto),
        (status = 400, description = "Invalid seat list", body = ApiResponse<String>),
        (status = 401, description = "Missing or invalid token", body = ApiResponse<String>),
        (status = 404, description = "Session not found", body = ApiResponse<String>),
        (status = 409, description = "A seat is already held", body = ApiResponse<String>)
    )
)]
pub async fn create_booking(
    State(state): State<BookingHandlerState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ReservationDraftDto>), ApiError> {
    let request = CreateBooking::new(request.session_id, request.seats)?;
    let draft = state.service.create(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(draft.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(ListBookingsParams),
    responses(
        (status = 200, description = "Booking page", body = BookingPage)
    )
)]
pub async fn list_bookings(
    State(state): State<BookingHandlerState>,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<BookingPage>, ApiError> {
    let page = state
        .service
        .get_all(params.pagination(), params.search.as_deref())
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking details", body = BookingDto),
        (status = 404, description = "Not found", body = ApiResponse<String>)
    )
)]
pub async fn get_booking(
    State(state): State<BookingHandlerState>,
    Path(id): Path<i32>,
) -> Result<Json<BookingDto>, ApiError> {
    let details = state.service.get(id).await?;
    Ok(Json(details.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Canceled, or already canceled"),
        (status = 403, description = "Booking belongs to another user", body = ApiResponse<String>),
        (status = 404, description = "Not found", body = ApiResponse<String>),
        (status = 409, description = "Booking is already paid", body = ApiResponse<String>)
    )
)]
pub async fn cancel_booking(
    State(state): State<BookingHandlerState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.service.cancel(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
