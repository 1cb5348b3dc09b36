//! PayPal provider client (redirect-based order/capture flow).
//!
//! Amounts cross this boundary in major units as a `"%.2f"` string; that
//! encoding is owned by this integration. The unit mismatch with the
//! Razorpay client is intentional: each provider owns its own contract.

use crate::config::PayPalConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const CAPTURE_COMPLETED: &str = "COMPLETED";

#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    config: PayPalConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Provider-side order handle.
#[derive(Debug, Deserialize)]
pub struct PayPalOrder {
    pub id: String,
    pub status: String,
}

/// Result of a capture call.
#[derive(Debug, Deserialize)]
pub struct PayPalCapture {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payer: Option<PayPalPayer>,
    #[serde(default)]
    pub purchase_units: Vec<CapturedPurchaseUnit>,
}

#[derive(Debug, Deserialize)]
pub struct PayPalPayer {
    pub payer_id: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CapturedPurchaseUnit {
    #[serde(default)]
    pub payments: Option<CapturedPayments>,
}

#[derive(Debug, Deserialize)]
pub struct CapturedPayments {
    #[serde(default)]
    pub captures: Vec<CaptureDetail>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CaptureDetail {
    pub id: String,
    pub status: String,
}

impl PayPalCapture {
    /// The capture id recorded as the provider payment id. Falls back to the
    /// order id when the capture detail is absent from the response.
    pub fn capture_id(&self) -> &str {
        self.purchase_units
            .first()
            .and_then(|u| u.payments.as_ref())
            .and_then(|p| p.captures.first())
            .map(|c| c.id.as_str())
            .unwrap_or(&self.id)
    }
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.expose_secret().is_empty()
    }

    async fn access_token(&self) -> Result<String> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let token: TokenResponse = serde_json::from_str(&body)?;
            Ok(token.access_token)
        } else {
            tracing::error!(status = %status, "PayPal token request failed");
            Err(anyhow!("PayPal authentication failed"))
        }
    }

    /// Create a provider-side order for `amount` major units.
    pub async fn create_order(
        &self,
        amount: f64,
        currency: &str,
        reference_id: &str,
    ) -> Result<PayPalOrder> {
        if !self.is_configured() {
            return Err(anyhow!("PayPal credentials not configured"));
        }

        let token = self.access_token().await?;
        let url = format!("{}/v2/checkout/orders", self.config.api_base_url);

        let payload = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": reference_id,
                "amount": {
                    "currency_code": currency,
                    "value": format!("{:.2}", amount),
                }
            }]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let order: PayPalOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                amount = amount,
                currency = %currency,
                "PayPal order created"
            );
            Ok(order)
        } else {
            tracing::error!(status = %status, body = %body, "PayPal order creation failed");
            Err(anyhow!("PayPal order creation failed"))
        }
    }

    /// Capture an approved order. The caller must check the returned status;
    /// anything other than `COMPLETED` means no funds moved.
    pub async fn capture_order(&self, order_id: &str) -> Result<PayPalCapture> {
        if !self.is_configured() {
            return Err(anyhow!("PayPal credentials not configured"));
        }

        let token = self.access_token().await?;
        let url = format!(
            "{}/v2/checkout/orders/{}/capture",
            self.config.api_base_url, order_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let capture: PayPalCapture = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order_id,
                status = %capture.status,
                "PayPal capture response"
            );
            Ok(capture)
        } else {
            tracing::error!(status = %status, body = %body, "PayPal capture failed");
            Err(anyhow!("PayPal capture failed"))
        }
    }
}
