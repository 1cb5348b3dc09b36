//! Checkout initiation: resolve price, apply coupon, create provider order,
//! persist the local order row.

use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::{doc, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    round_money, CustomerContact, OrderStatus, PaymentOrder, PaymentProvider,
};
use crate::utils::generate_receipt_id;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Course id is required"))]
    pub course_id: String,
    pub customer_info: CustomerInfo,
    pub coupon_code: Option<String>,
    pub payment_provider: String,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderDescriptor,
}

#[derive(Debug, Serialize)]
pub struct OrderDescriptor {
    /// Provider-side order handle used by the frontend flow.
    pub order_id: String,
    /// Internal order id (`ORD-...`), for reconciliation and support.
    pub internal_order_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_key_id: Option<String>,
    pub pricing: PricingBreakdown,
}

#[derive(Debug, Serialize)]
pub struct PricingBreakdown {
    pub original_amount: f64,
    pub final_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountInfo>,
}

#[derive(Debug, Serialize)]
pub struct DiscountInfo {
    pub code: String,
    pub discount_amount: f64,
    pub savings: f64,
}

/// Create a payment order for a course.
///
/// Provider failure aborts the whole operation: no local order row is
/// written, so there are no orphaned `created` rows to reconcile.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    payload.validate()?;
    payload.customer_info.validate()?;

    let provider = PaymentProvider::parse(&payload.payment_provider).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Unsupported payment provider: {}",
            payload.payment_provider
        ))
    })?;

    let course = state
        .repository
        .get_course(&payload.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Course not found")))?;

    let original_amount = state
        .repository
        .get_current_price(&payload.course_id)
        .await?
        .filter(|price| *price > 0.0)
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Course pricing is unavailable"))
        })?;
    let original_amount = round_money(original_amount);

    // Coupon application consumes a use before the provider call; a provider
    // failure after that point costs one usage slot, never an order row.
    let mut final_amount = original_amount;
    let mut discount = None;
    if let Some(ref code) = payload.coupon_code {
        if !code.trim().is_empty() {
            let (coupon, breakdown) = state
                .coupons
                .apply(code, &payload.course_id, original_amount)
                .await?;
            final_amount = breakdown.final_price;
            discount = Some(DiscountInfo {
                code: coupon.code,
                discount_amount: breakdown.discount_amount,
                savings: breakdown.savings,
            });
        }
    }

    let receipt = generate_receipt_id();
    let currency = payload
        .currency
        .clone()
        .unwrap_or_else(|| match provider {
            PaymentProvider::Razorpay => "INR".to_string(),
            PaymentProvider::Paypal => "USD".to_string(),
        });

    let provider_order_id = match provider {
        PaymentProvider::Razorpay => {
            if !state.razorpay.is_configured() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Razorpay is not available"
                )));
            }
            // Razorpay takes minor units.
            let amount_minor = (final_amount * 100.0).round() as u64;
            let notes = json!({
                "receipt": receipt,
                "course_id": payload.course_id,
            });
            let order = state
                .razorpay
                .create_order(amount_minor, &currency, Some(receipt.clone()), Some(notes))
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Razorpay order creation failed");
                    AppError::InternalError(anyhow::anyhow!("Failed to create payment order"))
                })?;
            order.id
        }
        PaymentProvider::Paypal => {
            if !state.paypal.is_configured() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "PayPal is not available"
                )));
            }
            // PayPal takes major units.
            let order = state
                .paypal
                .create_order(final_amount, &currency, &receipt)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "PayPal order creation failed");
                    AppError::InternalError(anyhow::anyhow!("Failed to create payment order"))
                })?;
            order.id
        }
    };

    let mut notes = doc! {
        "original_amount": original_amount,
        "final_amount": final_amount,
    };
    if let Some(ref d) = discount {
        notes.insert("coupon_code", &d.code);
        notes.insert("discount_amount", d.discount_amount);
    }

    let now = DateTime::now();
    let order = PaymentOrder {
        id: Uuid::new_v4(),
        receipt: receipt.clone(),
        course_id: payload.course_id.clone(),
        course_name: course.title.clone(),
        original_amount,
        amount: final_amount,
        currency: currency.clone(),
        status: OrderStatus::Created,
        provider,
        customer: CustomerContact {
            name: payload.customer_info.name.clone(),
            email: payload.customer_info.email.clone(),
            phone: payload.customer_info.phone.clone(),
        },
        provider_order_id: Some(provider_order_id.clone()),
        provider_payment_id: None,
        provider_signature: None,
        notes,
        created_at: now,
        updated_at: now,
    };
    state.repository.create_order(&order).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to persist payment order");
        AppError::DatabaseError(e)
    })?;

    tracing::info!(
        receipt = %receipt,
        provider = %provider,
        provider_order_id = %provider_order_id,
        amount = final_amount,
        "Payment order created"
    );

    let razorpay_key_id = match provider {
        PaymentProvider::Razorpay => Some(state.razorpay.key_id().to_string()),
        PaymentProvider::Paypal => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            order: OrderDescriptor {
                order_id: provider_order_id,
                internal_order_id: receipt,
                amount: final_amount,
                currency,
                razorpay_key_id,
                pricing: PricingBreakdown {
                    original_amount,
                    final_amount,
                    discount,
                },
            },
        }),
    ))
}
