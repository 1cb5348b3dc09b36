//! Razorpay provider client (signature-based order/verify flow).
//!
//! Amounts cross this boundary in the smallest currency unit (paise for
//! INR); that encoding is owned by this integration and by nothing else.

use crate::config::RazorpayConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::utils::signature::verify_hmac_sha256;

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    /// Amount in smallest currency unit.
    amount: u64,
    currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<serde_json::Value>,
}

/// Provider-side order handle.
#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// Payment details fetched after capture, used for the method label.
#[derive(Debug, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: String,
    description: String,
}

/// Webhook event envelope. Only the fields the failure handler reads.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    pub entity: WebhookPaymentDetails,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentDetails {
    pub id: String,
    pub order_id: Option<String>,
    pub status: Option<String>,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Whether credentials are present. Missing credentials disable this
    /// provider without affecting the other one.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    /// Key id handed to the frontend checkout widget.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create a provider-side order for `amount` minor units.
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: Option<String>,
        notes: Option<serde_json::Value>,
    ) -> Result<RazorpayOrder> {
        if !self.is_configured() {
            return Err(anyhow!("Razorpay credentials not configured"));
        }

        let request = CreateOrderRequest {
            amount,
            currency: currency.to_string(),
            receipt,
            notes,
        };

        let url = format!("{}/orders", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let order: RazorpayOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Razorpay order created"
            );
            Ok(order)
        } else {
            Err(self.api_error("order creation", &body))
        }
    }

    /// Fetch payment details by payment id (for the method label).
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment> {
        if !self.is_configured() {
            return Err(anyhow!("Razorpay credentials not configured"));
        }

        let url = format!("{}/payments/{}", self.config.api_base_url, payment_id);
        let response = self
            .client
            .get(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(self.api_error("payment fetch", &body))
        }
    }

    /// Verify the checkout signature: `HMAC-SHA256(order_id|payment_id, key_secret)`.
    ///
    /// Constant-time comparison; any mismatch is a hard rejection.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let payload = format!("{}|{}", order_id, payment_id);
        verify_hmac_sha256(self.config.key_secret.expose_secret(), &payload, signature)
    }

    /// Verify a webhook signature over the raw request body bytes.
    pub fn verify_webhook_signature(&self, raw_body: &str, signature: &str) -> Result<bool> {
        verify_hmac_sha256(
            self.config.webhook_secret.expose_secret(),
            raw_body,
            signature,
        )
    }

    pub fn parse_webhook_event(&self, raw_body: &str) -> Result<WebhookEvent> {
        Ok(serde_json::from_str(raw_body)?)
    }

    fn api_error(&self, operation: &str, body: &str) -> anyhow::Error {
        match serde_json::from_str::<ApiError>(body) {
            Ok(err) => {
                tracing::error!(
                    code = %err.error.code,
                    description = %err.error.description,
                    "Razorpay {} failed",
                    operation
                );
                anyhow!(
                    "Razorpay error: {} - {}",
                    err.error.code,
                    err.error.description
                )
            }
            Err(_) => anyhow!("Razorpay {} failed: {}", operation, body),
        }
    }
}
