//! Notification handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, warn};

use super::dto::{NotificationAck, NotificationPayload};
use crate::application::{AppliedOutcome, NotificationError, SettlementReconciler};
use crate::domain::BookingStatus;
use crate::infrastructure::payment::verify_notification_signature;
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};

#[derive(Clone)]
pub struct PaymentsState {
    pub settlement: Arc<SettlementReconciler>,
    /// Reject callbacks whose `signature_key` does not match
    pub verify_signature: bool,
    pub server_key: String,
}

impl PaymentsState {
    fn signature_ok(&self, p: &NotificationPayload) -> bool {
        match (&p.status_code, &p.gross_amount, &p.signature_key) {
            (Some(status_code), Some(gross_amount), Some(signature)) => verify_notification_signature(
                &p.order_id,
                status_code,
                gross_amount,
                &self.server_key,
                signature,
            ),
            _ => false,
        }
    }
}

#[utoipa::path(
    post,
    path = "/notification",
    tag = "Payments",
    request_body = NotificationPayload,
    responses(
        (status = 200, description = "Accepted, including duplicates and unknown orders", body = ApiResponse<NotificationAck>),
        (status = 403, description = "Signature verification failed"),
        (status = 503, description = "Timed out or checkout still in progress; the provider retries")
    )
)]
pub async fn payment_notification(
    State(state): State<PaymentsState>,
    ValidatedJson(payload): ValidatedJson<NotificationPayload>,
) -> Result<Json<ApiResponse<NotificationAck>>, ApiError> {
    if state.verify_signature && !state.signature_ok(&payload) {
        warn!(code = %payload.order_id, "Notification signature rejected");
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "invalid_signature",
            "notification signature mismatch",
        ));
    }

    let notification = payload.to_notification();
    let settlement = state.settlement.clone();
    let result = tokio::spawn(async move { settlement.apply_notification(&notification).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Notification task failed");
            ApiError::internal("notification task failed")
        })?;

    let (outcome, booking_status) = match result {
        Ok(AppliedOutcome::Applied { new_status }) => ("applied", Some(new_status)),
        Ok(AppliedOutcome::Unchanged) => ("unchanged", Some(BookingStatus::Pending)),
        Ok(AppliedOutcome::Ignored { current }) => ("ignored", Some(current)),
        Err(NotificationError::UnknownOrder(code)) => {
            // Acknowledged so the provider stops retrying.
            warn!(code = %code, "Notification for unknown order");
            ("unknown_order", None)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ApiResponse::success(NotificationAck {
        order_id: payload.order_id,
        outcome: outcome.to_string(),
        booking_status: booking_status.map(|s| s.as_str().to_string()),
    })))
}
