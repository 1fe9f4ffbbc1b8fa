//! Booking API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use super::dto::{BookingDto, BookingListQuery, CheckoutRequest, CheckoutResponse};
use crate::application::{CatalogService, CheckoutItem, ReservationCoordinator};
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};

#[derive(Clone)]
pub struct BookingsState {
    pub catalog: Arc<CatalogService>,
    pub checkout: Arc<ReservationCoordinator>,
}

#[utoipa::path(
    post,
    path = "/checkout",
    tag = "Bookings",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Slots booked, payment pending", body = ApiResponse<CheckoutResponse>),
        (status = 409, description = "Slot taken, price changed or hold expired"),
        (status = 422, description = "Malformed or unknown slots"),
        (status = 503, description = "Payment provider unavailable or timed out")
    )
)]
pub async fn checkout(
    State(state): State<BookingsState>,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutResponse>>), ApiError> {
    let items: Vec<CheckoutItem> = request.items.into_iter().map(CheckoutItem::from).collect();

    // Detached so a client disconnect cannot cancel a checkout halfway.
    let coordinator = state.checkout.clone();
    let receipt = tokio::spawn(async move { coordinator.checkout(items).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Checkout task failed");
            ApiError::internal("checkout task failed")
        })??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CheckoutResponse::from(receipt))),
    ))
}

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "Bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Most recent bookings first", body = ApiResponse<Vec<BookingDto>>)
    )
)]
pub async fn list_bookings(
    State(state): State<BookingsState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<ApiResponse<Vec<BookingDto>>>, ApiError> {
    let bookings = state.catalog.list_bookings(query.effective_limit()).await?;
    Ok(Json(ApiResponse::success(
        bookings.into_iter().map(BookingDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/bookings/{code}",
    tag = "Bookings",
    params(("code" = String, Path, description = "Order code")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 404, description = "No booking with this code")
    )
)]
pub async fn get_booking(
    State(state): State<BookingsState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<BookingDto>>, ApiError> {
    let booking = state.catalog.get_booking(&code).await?;
    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}
