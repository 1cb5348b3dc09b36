//! PayPal capture handling.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use super::{record_successful_payment, CustomerDto, TransactionDto};
use crate::models::PaymentProvider;
use crate::services::paypal::CAPTURE_COMPLETED;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CapturePaymentRequest {
    pub paypal_order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CapturePaymentResponse {
    pub success: bool,
    pub transaction: TransactionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDto>,
}

/// Capture an approved PayPal order.
///
/// A capture status other than `COMPLETED` fails the call and performs no
/// writes: the order stays `created`.
pub async fn capture_payment(
    State(state): State<AppState>,
    Json(payload): Json<CapturePaymentRequest>,
) -> Result<Json<CapturePaymentResponse>, AppError> {
    if payload.paypal_order_id.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Missing PayPal order id"
        )));
    }

    let order = state
        .repository
        .find_order_by_provider_order_id(PaymentProvider::Paypal, &payload.paypal_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    let capture = state
        .paypal
        .capture_order(&payload.paypal_order_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "PayPal capture call failed");
            AppError::InternalError(anyhow::anyhow!("Failed to capture payment"))
        })?;

    if capture.status != CAPTURE_COMPLETED {
        tracing::warn!(
            paypal_order_id = %payload.paypal_order_id,
            status = %capture.status,
            "PayPal capture not completed"
        );
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment capture was not completed"
        )));
    }

    let capture_id = capture.capture_id().to_string();
    let recorded = record_successful_payment(
        &state,
        &order,
        &capture_id,
        None,
        Some("paypal".to_string()),
    )
    .await?;

    Ok(Json(CapturePaymentResponse {
        success: true,
        transaction: recorded.transaction.into(),
        customer: recorded.customer.map(Into::into),
    }))
}
