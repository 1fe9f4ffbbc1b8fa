//! Snap (hosted checkout) payment gateway over HTTP

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{GatewayError, PaymentGateway, PaymentIntent, PaymentIntentRequest};

pub const SANDBOX_BASE_URL: &str = "https://app.sandbox.midtrans.com";

#[derive(Debug, Clone)]
pub struct SnapConfig {
    pub server_key: String,
    /// Scheme and host, no trailing path
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            server_key: String::new(),
            base_url: SANDBOX_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct SnapGateway {
    client: reqwest::Client,
    endpoint: String,
    authorization: String,
}

impl SnapGateway {
    pub fn new(config: SnapConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/snap/v1/transactions",
                config.base_url.trim_end_matches('/')
            ),
            authorization: format!("Basic {}", STANDARD.encode(format!("{}:", config.server_key))),
        })
    }
}

// ── Wire types ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: CustomerDetail<'a>,
    item_details: Vec<ItemDetail<'a>>,
}

#[derive(Debug, Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct CustomerDetail<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct ItemDetail<'a> {
    id: &'a str,
    price: i64,
    quantity: u32,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct SnapErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

impl<'a> From<&'a PaymentIntentRequest> for SnapRequest<'a> {
    fn from(req: &'a PaymentIntentRequest) -> Self {
        Self {
            transaction_details: TransactionDetails {
                order_id: &req.order_code,
                gross_amount: req.gross_amount,
            },
            customer_details: CustomerDetail {
                first_name: &req.customer.name,
                email: &req.customer.email,
            },
            item_details: vec![ItemDetail {
                id: &req.line_item.id,
                price: req.line_item.price,
                quantity: req.line_item.qty,
                name: &req.line_item.name,
            }],
        }
    }
}

#[async_trait]
impl PaymentGateway for SnapGateway {
    async fn create_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        debug!(order = %request.order_code, amount = request.gross_amount, "Creating payment intent");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&SnapRequest::from(request))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let parsed: SnapErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = if parsed.error_messages.is_empty() {
                body
            } else {
                parsed.error_messages.join("; ")
            };
            warn!(order = %request.order_code, status = status.as_u16(), "Payment intent rejected: {}", message);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SnapResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if parsed.token.is_empty() || parsed.redirect_url.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "missing token or redirect_url".to_string(),
            ));
        }

        Ok(PaymentIntent {
            redirect_url: parsed.redirect_url,
            token: parsed.token,
        })
    }
}
