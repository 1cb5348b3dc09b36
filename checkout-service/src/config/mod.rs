use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub razorpay: RazorpayConfig,
    pub paypal: PayPalConfig,
    pub smtp: SmtpConfig,
    pub rate_limit: RateLimitConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Provider credentials are optional: a provider with missing credentials
    /// is disabled at startup and the other one remains usable.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("CHECKOUT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CHECKOUT_PORT")
            .unwrap_or_else(|_| "3004".to_string())
            .parse()?;

        let db_url = env::var("CHECKOUT_DATABASE_URL")
            .map_err(|_| anyhow!("CHECKOUT_DATABASE_URL must be set"))?;
        let db_name =
            env::var("CHECKOUT_DATABASE_NAME").unwrap_or_else(|_| "checkout_db".to_string());

        let razorpay = RazorpayConfig {
            key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            key_secret: Secret::new(env::var("RAZORPAY_KEY_SECRET").unwrap_or_default()),
            webhook_secret: Secret::new(env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default()),
            api_base_url: env::var("RAZORPAY_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
        };

        let paypal = PayPalConfig {
            client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            client_secret: Secret::new(env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default()),
            api_base_url: env::var("PAYPAL_API_BASE_URL")
                .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
        };

        let smtp = SmtpConfig {
            enabled: env::var("SMTP_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()?,
            user: env::var("SMTP_USER").unwrap_or_default(),
            password: Secret::new(env::var("SMTP_PASSWORD").unwrap_or_default()),
            from_email: env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@example.com".to_string()),
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Course Team".to_string()),
        };

        let rate_limit = RateLimitConfig {
            requests_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
        };

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            razorpay,
            paypal,
            smtp,
            rate_limit,
            service_name: "checkout-service".to_string(),
        })
    }
}
