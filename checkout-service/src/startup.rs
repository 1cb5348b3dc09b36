//! Application wiring and lifecycle.

use crate::config::Config;
use crate::handlers;
use crate::services::{
    CheckoutRepository, ConfirmationMailer, CouponService, PayPalClient, RazorpayClient,
};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware};
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub repository: CheckoutRepository,
    pub coupons: CouponService,
    pub razorpay: RazorpayClient,
    pub paypal: PayPalClient,
    pub mailer: Arc<ConfirmationMailer>,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::DatabaseError(e.into())
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(e.into())
        })?;
        let db = client.database(&config.database.db_name);

        let repository = CheckoutRepository::new(&client, &db);
        repository.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            AppError::DatabaseError(e)
        })?;

        let coupons = CouponService::new(&db);

        // A provider with missing credentials is disabled; the other stays usable.
        let razorpay = RazorpayClient::new(config.razorpay.clone());
        if razorpay.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!("Razorpay credentials not configured - provider disabled");
        }
        let paypal = PayPalClient::new(config.paypal.clone());
        if paypal.is_configured() {
            tracing::info!("PayPal client initialized");
        } else {
            tracing::warn!("PayPal credentials not configured - provider disabled");
        }

        let mailer = ConfirmationMailer::new(config.smtp.clone())
            .map_err(AppError::ConfigError)?;
        if !mailer.is_enabled() {
            tracing::warn!("SMTP disabled - confirmation emails will be skipped");
        }

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            repository,
            coupons,
            razorpay,
            paypal,
            mailer: Arc::new(mailer),
        };

        let rate_limiter = create_ip_rate_limiter(config.rate_limit.requests_per_minute, 60);

        let api_router = Router::new()
            .route("/api/payments/create-order", post(handlers::orders::create_order))
            .route("/api/payments/verify", post(handlers::razorpay::verify_payment))
            .route(
                "/api/payments/paypal/capture-payment",
                post(handlers::paypal::capture_payment),
            )
            .route("/api/payments/webhook", post(handlers::razorpay::webhook))
            .route("/api/coupons/validate", post(handlers::coupons::validate_coupon))
            .route("/api/inquiries", post(handlers::customers::create_inquiry))
            .route("/api/admin/customers", get(handlers::customers::list_customers))
            .route(
                "/api/admin/customers/:id/status",
                patch(handlers::customers::update_customer_status),
            )
            .layer(from_fn_with_state(rate_limiter, ip_rate_limit_middleware));

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .merge(api_router)
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random port for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Checkout service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
