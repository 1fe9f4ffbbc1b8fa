//! Notification DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::PaymentNotification;

/// Provider callback body. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NotificationPayload {
    /// Booking code
    #[validate(length(min = 1))]
    pub order_id: String,
    /// Unrecognised values leave the booking unchanged
    pub transaction_status: String,
    pub fraud_status: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
}

impl NotificationPayload {
    pub fn to_notification(&self) -> PaymentNotification {
        PaymentNotification::parse(
            self.order_id.clone(),
            &self.transaction_status,
            self.fraud_status.as_deref(),
        )
    }
}

/// Acknowledgement returned to the provider
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationAck {
    pub order_id: String,
    /// applied, unchanged, ignored or unknown_order
    pub outcome: String,
    /// Booking status after the notification, absent for unknown orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<String>,
}
