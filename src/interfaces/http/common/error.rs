//! Mapping of service errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

use super::ApiResponse;
use crate::application::{CheckoutError, NotificationError};
use crate::domain::{format_minute, DomainError, SlotKey};

/// Error response: status, machine-readable code, message and optional details
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.message)
            .with_code(self.code)
            .with_details(self.details);
        (self.status, Json(body)).into_response()
    }
}

pub fn slot_json(key: &SlotKey) -> serde_json::Value {
    json!({
        "court_id": key.court_id,
        "date": key.date,
        "start_min": key.start_min,
        "end_min": key.end_min,
        "start_time": format_minute(key.start_min),
        "end_time": format_minute(key.end_min),
    })
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "not_found", e.to_string()),
            DomainError::Validation(_) => Self::validation(e.to_string()),
            DomainError::Conflict(_) => Self::new(StatusCode::CONFLICT, "conflict", e.to_string()),
            DomainError::Storage(_) => {
                error!(error = %e, "Storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self {
        let message = e.to_string();
        match e {
            CheckoutError::Empty | CheckoutError::InvalidSlot(_) => Self::validation(message),
            CheckoutError::DuplicateSlot(key) => {
                Self::validation(message).with_details(json!({ "slot": slot_json(&key) }))
            }
            CheckoutError::UnknownSlot { key } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "unknown_slot", message)
                    .with_details(json!({ "slot": slot_json(&key) }))
            }
            CheckoutError::SlotUnavailable { key } => {
                info!(slot = %key, "Checkout conflict");
                Self::new(StatusCode::CONFLICT, "slot_unavailable", message)
                    .with_details(json!({ "slot": slot_json(&key) }))
            }
            CheckoutError::PriceMismatch {
                key,
                expected,
                submitted,
            } => Self::new(StatusCode::CONFLICT, "price_mismatch", message).with_details(json!({
                "slot": slot_json(&key),
                "expected": expected,
                "submitted": submitted,
            })),
            CheckoutError::HoldExpired => Self::new(StatusCode::CONFLICT, "hold_expired", message),
            CheckoutError::PaymentGatewayUnavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "payment_gateway_unavailable",
                message,
            ),
            CheckoutError::Timeout => Self::new(StatusCode::SERVICE_UNAVAILABLE, "timeout", message),
            CheckoutError::Storage(inner) => inner.into(),
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(e: NotificationError) -> Self {
        let message = e.to_string();
        match e {
            // The webhook handler answers unknown orders itself; this is the fallback.
            NotificationError::UnknownOrder(_) => Self::new(StatusCode::NOT_FOUND, "unknown_order", message),
            NotificationError::Timeout(_) => Self::new(StatusCode::SERVICE_UNAVAILABLE, "timeout", message),
            NotificationError::CheckoutInProgress(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "checkout_in_progress", message)
            }
            NotificationError::Storage(inner) => inner.into(),
        }
    }
}
