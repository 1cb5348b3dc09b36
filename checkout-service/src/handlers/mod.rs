pub mod coupons;
pub mod customers;
pub mod orders;
pub mod paypal;
pub mod razorpay;

use axum::{http::StatusCode, response::IntoResponse, Json};
use mongodb::bson::DateTime;
use serde::Serialize;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Customer, CustomerStatus, PaymentOrder, PaymentStatus, PaymentTransaction,
};
use crate::services::PaymentConfirmation;
use crate::AppState;

/// Health check endpoint for liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "checkout-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint.
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

/// Transaction view returned to callers.
#[derive(Debug, Serialize)]
pub struct TransactionDto {
    pub id: Uuid,
    pub receipt: String,
    pub course_id: String,
    pub course_name: String,
    pub amount: f64,
    pub currency: String,
    pub provider: String,
    pub provider_order_id: String,
    pub provider_payment_id: String,
    pub payment_method: Option<String>,
    pub paid_at: String,
}

impl From<PaymentTransaction> for TransactionDto {
    fn from(t: PaymentTransaction) -> Self {
        Self {
            id: t.id,
            receipt: t.receipt,
            course_id: t.course_id,
            course_name: t.course_name,
            amount: t.amount,
            currency: t.currency,
            provider: t.provider.to_string(),
            provider_order_id: t.provider_order_id,
            provider_payment_id: t.provider_payment_id,
            payment_method: t.payment_method,
            paid_at: t.paid_at.to_string(),
        }
    }
}

/// Customer view returned to callers.
#[derive(Debug, Serialize)]
pub struct CustomerDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_id: String,
    pub course_name: String,
    pub amount_paid: Option<f64>,
    pub payment_status: PaymentStatus,
    pub status: CustomerStatus,
}

impl From<Customer> for CustomerDto {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            course_id: c.course_id,
            course_name: c.course_name,
            amount_paid: c.amount_paid,
            payment_status: c.payment_status,
            status: c.status,
        }
    }
}

pub(crate) struct RecordedPayment {
    pub transaction: PaymentTransaction,
    pub customer: Option<Customer>,
    pub replayed: bool,
}

/// Shared success path for both provider flows.
///
/// Idempotent on the provider payment id: a retried callback returns the
/// existing transaction without creating duplicate financial records. The
/// order-status flip and transaction insert are atomic (repository-level
/// session transaction); the customer write follows, and the confirmation
/// email is fire-and-forget.
pub(crate) async fn record_successful_payment(
    state: &AppState,
    order: &PaymentOrder,
    provider_payment_id: &str,
    provider_signature: Option<&str>,
    payment_method: Option<String>,
) -> Result<RecordedPayment, AppError> {
    if let Some(existing) = state
        .repository
        .find_transaction_by_payment_id(provider_payment_id)
        .await?
    {
        tracing::info!(
            provider_payment_id = %provider_payment_id,
            "Replayed payment callback, returning existing transaction"
        );
        let customer = state
            .repository
            .find_customer(&existing.customer.email, &existing.course_id)
            .await?;
        return Ok(RecordedPayment {
            transaction: existing,
            customer,
            replayed: true,
        });
    }

    let transaction = PaymentTransaction {
        id: Uuid::new_v4(),
        order_id: order.id,
        receipt: order.receipt.clone(),
        course_id: order.course_id.clone(),
        course_name: order.course_name.clone(),
        amount: order.amount,
        currency: order.currency.clone(),
        provider: order.provider,
        provider_order_id: order
            .provider_order_id
            .clone()
            .unwrap_or_default(),
        provider_payment_id: provider_payment_id.to_string(),
        payment_method,
        customer: order.customer.clone(),
        paid_at: DateTime::now(),
    };

    if let Err(e) = state
        .repository
        .finalize_paid_order(order.id, provider_payment_id, provider_signature, &transaction)
        .await
    {
        // A concurrent callback may have won the unique-index race; treat
        // that as a replay rather than a failure.
        if let Some(existing) = state
            .repository
            .find_transaction_by_payment_id(provider_payment_id)
            .await?
        {
            let customer = state
                .repository
                .find_customer(&existing.customer.email, &existing.course_id)
                .await?;
            return Ok(RecordedPayment {
                transaction: existing,
                customer,
                replayed: true,
            });
        }
        return Err(AppError::DatabaseError(e));
    }

    let now = DateTime::now();
    let customer = Customer {
        id: Uuid::new_v4(),
        name: order.customer.name.clone(),
        email: order.customer.email.clone(),
        phone: order.customer.phone.clone(),
        course_id: order.course_id.clone(),
        course_name: order.course_name.clone(),
        amount_paid: Some(order.amount),
        payment_status: PaymentStatus::Paid,
        status: CustomerStatus::Pending,
        message: None,
        created_at: now,
        updated_at: now,
    };
    state.repository.create_customer(&customer).await?;

    if state.mailer.is_enabled() {
        let mailer = state.mailer.clone();
        let confirmation = PaymentConfirmation {
            name: customer.name.clone(),
            email: customer.email.clone(),
            course_name: order.course_name.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            receipt: order.receipt.clone(),
            payment_id: provider_payment_id.to_string(),
        };
        tokio::spawn(async move {
            if let Err(e) = mailer.send_payment_confirmation(&confirmation).await {
                tracing::warn!(error = %e, "Confirmation email failed");
            }
        });
    }

    tracing::info!(
        order_id = %order.id,
        receipt = %order.receipt,
        provider_payment_id = %provider_payment_id,
        "Payment recorded"
    );

    Ok(RecordedPayment {
        transaction,
        customer: Some(customer),
        replayed: false,
    })
}
