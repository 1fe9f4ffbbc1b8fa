//! Booking DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{CheckoutItem, CheckoutReceipt};
use crate::domain::{format_minute, Booking, BookingItem};

/// Most bookings returned by one listing
pub const MAX_LIST_LIMIT: u64 = 200;
pub const DEFAULT_LIST_LIMIT: u64 = 50;

/// One requested slot. camelCase keys are accepted for older clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    #[serde(alias = "courtId")]
    pub court_id: i32,
    #[schema(value_type = String, format = Date, example = "2024-06-01")]
    pub date: NaiveDate,
    #[serde(alias = "startMin")]
    pub start_min: i32,
    #[serde(alias = "endMin")]
    pub end_min: i32,
    /// Price the client displayed, in minor units
    pub price: i64,
}

impl From<CheckoutItemRequest> for CheckoutItem {
    fn from(item: CheckoutItemRequest) -> Self {
        Self {
            court_id: item.court_id,
            date: item.date,
            start_min: item.start_min,
            end_min: item.end_min,
            price: item.price,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 48, message = "between 1 and 48 slots per checkout"))]
    pub items: Vec<CheckoutItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingItemDto {
    pub court_id: i32,
    #[schema(value_type = String, format = Date, example = "2024-06-01")]
    pub date: NaiveDate,
    pub start_min: i32,
    pub end_min: i32,
    pub start_time: String,
    pub end_time: String,
    pub price: i64,
}

impl From<BookingItem> for BookingItemDto {
    fn from(item: BookingItem) -> Self {
        Self {
            court_id: item.court_id,
            date: item.date,
            start_min: item.start_min,
            end_min: item.end_min,
            start_time: format_minute(item.start_min),
            end_time: format_minute(item.end_min),
            price: item.price,
        }
    }
}

/// Result of a successful checkout
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub booking_id: i32,
    pub code: String,
    pub total: i64,
    pub status: String,
    /// Hosted payment page
    pub redirect: String,
    pub token: String,
    pub items: Vec<BookingItemDto>,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        let booking = receipt.booking;
        Self {
            booking_id: booking.id,
            code: booking.code,
            total: booking.total,
            status: booking.status.as_str().to_string(),
            redirect: receipt.redirect_url,
            token: receipt.token,
            items: booking.items.into_iter().map(BookingItemDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: i32,
    pub code: String,
    pub total: i64,
    /// pending, paid or failed
    pub status: String,
    pub items: Vec<BookingItemDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            code: b.code,
            total: b.total,
            status: b.status.as_str().to_string(),
            items: b.items.into_iter().map(BookingItemDto::from).collect(),
            redirect_url: b.redirect_url,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookingListQuery {
    /// 1..=200, default 50; anything else falls back to the default
    pub limit: Option<String>,
}

impl BookingListQuery {
    pub fn effective_limit(&self) -> u64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|n| (1..=MAX_LIST_LIMIT).contains(n))
            .unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(raw: Option<&str>) -> u64 {
        BookingListQuery {
            limit: raw.map(String::from),
        }
        .effective_limit()
    }

    #[test]
    fn list_limit_falls_back_to_default() {
        assert_eq!(limit(None), 50);
        assert_eq!(limit(Some("10")), 10);
        assert_eq!(limit(Some("200")), 200);
        assert_eq!(limit(Some("201")), 50);
        assert_eq!(limit(Some("0")), 50);
        assert_eq!(limit(Some("-3")), 50);
        assert_eq!(limit(Some("ten")), 50);
    }

    #[test]
    fn checkout_item_accepts_camel_case() {
        let item: CheckoutItemRequest = serde_json::from_value(serde_json::json!({
            "courtId": 1, "date": "2024-06-01", "startMin": 420, "endMin": 480, "price": 90000
        }))
        .unwrap();
        assert_eq!(item.start_min, 420);
        assert_eq!(item.court_id, 1);
    }
}
