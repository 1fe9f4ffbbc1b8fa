//! Payment intent port
//!
//! The reservation flow only needs a token and a redirect URL for a booking;
//! how the provider produces them is the adapter's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub price: i64,
    pub qty: u32,
    pub name: String,
}

/// What the provider needs to open a payment for one booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Booking code, echoed back as `order_id` in notifications
    pub order_code: String,
    /// Integer minor units
    pub gross_amount: i64,
    pub customer: CustomerDetails,
    pub line_item: LineItem,
}

/// Where to send the customer to pay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub redirect_url: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider unreachable: {0}")]
    Transport(String),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;
}
