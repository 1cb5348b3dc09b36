//! Payment confirmation email.
//!
//! Sending is strictly best-effort: callers spawn the send and a failure is
//! logged, never propagated to the HTTP response.

use crate::config::SmtpConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

/// Flat data bag rendered into the confirmation message.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub name: String,
    pub email: String,
    pub course_name: String,
    pub amount: f64,
    pub currency: String,
    pub receipt: String,
    pub payment_id: String,
}

pub struct ConfirmationMailer {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl ConfirmationMailer {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| anyhow!("Failed to create SMTP relay: {}", e))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send_payment_confirmation(&self, data: &PaymentConfirmation) -> Result<()> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| anyhow!("SMTP transport not initialized"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;
        let to: Mailbox = data
            .email
            .parse()
            .map_err(|e| anyhow!("Invalid recipient: {}", e))?;

        let subject = format!("Payment confirmed: {}", data.course_name);
        let text = format!(
            "Hi {},\n\n\
             Your payment of {} {:.2} for \"{}\" has been received.\n\n\
             Order reference: {}\n\
             Payment id: {}\n\n\
             You will hear from our team shortly with access details.\n",
            data.name, data.currency, data.amount, data.course_name, data.receipt, data.payment_id,
        );
        let html = format!(
            "<p>Hi {},</p>\
             <p>Your payment of <strong>{} {:.2}</strong> for <strong>{}</strong> has been received.</p>\
             <p>Order reference: <code>{}</code><br>Payment id: <code>{}</code></p>\
             <p>You will hear from our team shortly with access details.</p>",
            data.name, data.currency, data.amount, data.course_name, data.receipt, data.payment_id,
        );

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| anyhow!("Failed to build message: {}", e))?;

        transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::info!(
            to = %data.email,
            receipt = %data.receipt,
            "Payment confirmation email sent"
        );
        Ok(())
    }
}
