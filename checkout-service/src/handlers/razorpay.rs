//! Razorpay verification and webhook handling.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use super::{record_successful_payment, CustomerDto, TransactionDto};
use crate::models::PaymentProvider;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub transaction: TransactionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDto>,
}

/// Verify a payment after checkout completion.
///
/// The signature check is constant-time; a mismatch performs no writes and
/// leaves the order in `created` state for manual reconciliation.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    if payload.razorpay_order_id.is_empty()
        || payload.razorpay_payment_id.is_empty()
        || payload.razorpay_signature.is_empty()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Missing payment verification data"
        )));
    }

    let is_valid = state
        .razorpay
        .verify_payment_signature(
            &payload.razorpay_order_id,
            &payload.razorpay_payment_id,
            &payload.razorpay_signature,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Signature verification error");
            AppError::InternalError(anyhow::anyhow!("Signature verification failed"))
        })?;

    if !is_valid {
        tracing::warn!(
            order_id = %payload.razorpay_order_id,
            payment_id = %payload.razorpay_payment_id,
            "Invalid payment signature"
        );
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid payment signature"
        )));
    }

    let order = state
        .repository
        .find_order_by_provider_order_id(PaymentProvider::Razorpay, &payload.razorpay_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    // Method label is cosmetic; a fetch failure must not block verification.
    let payment_method = match state
        .razorpay
        .fetch_payment(&payload.razorpay_payment_id)
        .await
    {
        Ok(payment) => payment.method,
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch payment details");
            None
        }
    };

    let recorded = record_successful_payment(
        &state,
        &order,
        &payload.razorpay_payment_id,
        Some(&payload.razorpay_signature),
        payment_method,
    )
    .await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        transaction: recorded.transaction.into(),
        customer: recorded.customer.map(Into::into),
    }))
}

/// Provider-initiated webhook.
///
/// Operates on the raw body bytes: the HMAC covers exactly what the
/// provider signed, never a re-serialized document. Only `payment.failed`
/// is processed; every other event type is acknowledged and ignored.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get("X-Razorpay-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing X-Razorpay-Signature header");
            AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
        })?;

    let is_valid = state
        .razorpay
        .verify_webhook_signature(&body, signature)
        .map_err(|e| {
            tracing::error!(error = %e, "Webhook signature verification error");
            AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
        })?;

    if !is_valid {
        tracing::warn!("Invalid webhook signature");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid webhook signature"
        )));
    }

    let event = state.razorpay.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload"))
    })?;

    if event.event == "payment.failed" {
        if let Some(order_id) = event
            .payload
            .payment
            .as_ref()
            .and_then(|p| p.entity.order_id.as_deref())
        {
            match state.repository.mark_order_failed(order_id).await {
                Ok(true) => {
                    tracing::info!(order_id = %order_id, "Order marked failed via webhook");
                }
                Ok(false) => {
                    tracing::warn!(order_id = %order_id, "Failed-payment webhook for unknown order");
                }
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "Failed to update order from webhook");
                }
            }
        }
    } else {
        tracing::debug!(event_type = %event.event, "Ignored webhook event type");
    }

    // Always acknowledge so the provider stops retrying.
    Ok(StatusCode::OK)
}
