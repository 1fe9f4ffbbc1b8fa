//! Court and slot DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{format_minute, Court, CourtImage, Slot};

/// Court API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourtDto {
    pub id: i32,
    pub name: String,
    pub sport: String,
    pub indoor: bool,
    pub surface: String,
    pub images: Vec<CourtImageDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourtImageDto {
    pub id: i32,
    pub url: String,
}

impl From<CourtImage> for CourtImageDto {
    fn from(image: CourtImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
        }
    }
}

impl From<Court> for CourtDto {
    fn from(court: Court) -> Self {
        Self {
            id: court.id,
            name: court.name,
            sport: court.sport,
            indoor: court.indoor,
            surface: court.surface,
            images: court.images.into_iter().map(CourtImageDto::from).collect(),
        }
    }
}

/// Bookable slot
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotDto {
    pub id: i32,
    pub court_id: i32,
    #[schema(value_type = String, format = Date, example = "2024-06-01")]
    pub date: NaiveDate,
    /// Minutes since 00:00
    pub start_min: i32,
    pub end_min: i32,
    /// `HH:MM`
    pub start_time: String,
    pub end_time: String,
    /// Minor currency units
    pub price: i64,
    /// free, held or booked
    pub status: String,
    pub available: bool,
}

impl From<Slot> for SlotDto {
    fn from(slot: Slot) -> Self {
        Self {
            id: slot.id,
            court_id: slot.court_id,
            date: slot.date,
            start_min: slot.start_min,
            end_min: slot.end_min,
            start_time: format_minute(slot.start_min),
            end_time: format_minute(slot.end_min),
            price: slot.price,
            status: slot.status.as_str().to_string(),
            available: slot.is_free(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlotQuery {
    /// `YYYY-MM-DD`; all dates when omitted
    pub date: Option<String>,
}
