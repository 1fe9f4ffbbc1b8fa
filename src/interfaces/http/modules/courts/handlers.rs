//! Court API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;

use super::dto::{CourtDto, SlotDto, SlotQuery};
use crate::application::CatalogService;
use crate::interfaces::http::common::{ApiError, ApiResponse};

#[derive(Clone)]
pub struct CourtsState {
    pub catalog: Arc<CatalogService>,
}

#[utoipa::path(
    get,
    path = "/courts",
    tag = "Courts",
    responses(
        (status = 200, description = "All courts with their images", body = ApiResponse<Vec<CourtDto>>)
    )
)]
pub async fn list_courts(
    State(state): State<CourtsState>,
) -> Result<Json<ApiResponse<Vec<CourtDto>>>, ApiError> {
    let courts = state.catalog.list_courts().await?;
    Ok(Json(ApiResponse::success(
        courts.into_iter().map(CourtDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/courts/{id}/slots",
    tag = "Courts",
    params(
        ("id" = i32, Path, description = "Court id"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "Slots ordered by date and start time", body = ApiResponse<Vec<SlotDto>>),
        (status = 404, description = "Court not found"),
        (status = 422, description = "Malformed date")
    )
)]
pub async fn list_slots(
    State(state): State<CourtsState>,
    Path(court_id): Path<i32>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<ApiResponse<Vec<SlotDto>>>, ApiError> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ApiError::validation(format!("date must be YYYY-MM-DD, got '{}'", raw)))?,
        ),
        None => None,
    };

    let slots = state.catalog.list_slots(court_id, date).await?;
    Ok(Json(ApiResponse::success(
        slots.into_iter().map(SlotDto::from).collect(),
    )))
}
