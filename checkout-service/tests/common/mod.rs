use checkout_service::config::{
    Config, DatabaseConfig, PayPalConfig, RateLimitConfig, RazorpayConfig, ServerConfig,
    SmtpConfig,
};
use checkout_service::models::{
    Coupon, CustomerContact, DiscountType, OrderStatus, PaymentOrder, PaymentProvider,
};
use checkout_service::Application;
use mongodb::bson::{doc, DateTime};
use secrecy::Secret;
use uuid::Uuid;
use wiremock::MockServer;

pub const RAZORPAY_KEY_SECRET: &str = "test_key_secret";
pub const RAZORPAY_WEBHOOK_SECRET: &str = "test_webhook_secret";

pub struct TestApp {
    pub address: String,
    pub db: mongodb::Database,
    pub razorpay_server: MockServer,
    pub paypal_server: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let razorpay_server = MockServer::start().await;
        let paypal_server = MockServer::start().await;

        let db_name = format!("checkout_test_{}", Uuid::new_v4());
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_string(),
                key_secret: Secret::new(RAZORPAY_KEY_SECRET.to_string()),
                webhook_secret: Secret::new(RAZORPAY_WEBHOOK_SECRET.to_string()),
                api_base_url: razorpay_server.uri(),
            },
            paypal: PayPalConfig {
                client_id: "pp_test_client".to_string(),
                client_secret: Secret::new("pp_test_secret".to_string()),
                api_base_url: paypal_server.uri(),
            },
            smtp: SmtpConfig {
                enabled: false,
                host: "localhost".to_string(),
                port: 587,
                user: String::new(),
                password: Secret::new(String::new()),
                from_email: "noreply@test.local".to_string(),
                from_name: "Test".to_string(),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 10_000,
            },
            service_name: "checkout-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to come up
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            db,
            razorpay_server,
            paypal_server,
            client,
        }
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn seed_course(&self, course_id: &str, title: &str) {
        self.db
            .collection::<mongodb::bson::Document>("courses")
            .insert_one(
                doc! { "_id": course_id, "title": title, "category": "data", "badge": "new" },
                None,
            )
            .await
            .expect("Failed to seed course");
    }

    pub async fn seed_pricing(&self, course_id: &str, current: f64) {
        self.db
            .collection::<mongodb::bson::Document>("course_pricing")
            .insert_one(doc! { "course_id": course_id, "current": current }, None)
            .await
            .expect("Failed to seed pricing");
    }

    pub async fn seed_coupon(&self, coupon: &Coupon) {
        self.db
            .collection::<Coupon>("coupons")
            .insert_one(coupon, None)
            .await
            .expect("Failed to seed coupon");
    }

    pub async fn seed_order(&self, order: &PaymentOrder) {
        self.db
            .collection::<PaymentOrder>("orders")
            .insert_one(order, None)
            .await
            .expect("Failed to seed order");
    }

    pub async fn count(&self, collection: &str) -> u64 {
        self.db
            .collection::<mongodb::bson::Document>(collection)
            .count_documents(None, None)
            .await
            .expect("Failed to count documents")
    }

    pub async fn find_order(&self, provider_order_id: &str) -> Option<PaymentOrder> {
        self.db
            .collection::<PaymentOrder>("orders")
            .find_one(doc! { "provider_order_id": provider_order_id }, None)
            .await
            .expect("Failed to fetch order")
    }

    pub async fn coupon_used_count(&self, code: &str) -> i64 {
        let coupon = self
            .db
            .collection::<Coupon>("coupons")
            .find_one(doc! { "code": code }, None)
            .await
            .expect("Failed to fetch coupon")
            .expect("Coupon not found");
        coupon.used_count
    }

    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}

/// Coupon fixture with sensible defaults; tweak fields per test.
pub fn coupon_fixture(code: &str, course_id: &str) -> Coupon {
    let now = DateTime::now();
    Coupon {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: 20.0,
        course_ids: vec![course_id.to_string()],
        is_active: true,
        expires_at: None,
        usage_limit: None,
        used_count: 0,
        min_purchase_amount: None,
        max_discount_amount: None,
        description: Some("test coupon".to_string()),
        created_by: "admin".to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Order fixture in `created` state for verification/capture tests.
pub fn order_fixture(provider: PaymentProvider, provider_order_id: &str) -> PaymentOrder {
    let now = DateTime::now();
    PaymentOrder {
        id: Uuid::new_v4(),
        receipt: format!("ORD-{}-TEST42", now.timestamp_millis()),
        course_id: "course-1".to_string(),
        course_name: "Data Analyst Bootcamp".to_string(),
        original_amount: 100.0,
        amount: 80.0,
        currency: match provider {
            PaymentProvider::Razorpay => "INR".to_string(),
            PaymentProvider::Paypal => "USD".to_string(),
        },
        status: OrderStatus::Created,
        provider,
        customer: CustomerContact {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+441234567890".to_string(),
        },
        provider_order_id: Some(provider_order_id.to_string()),
        provider_payment_id: None,
        provider_signature: None,
        notes: doc! { "original_amount": 100.0, "final_amount": 80.0 },
        created_at: now,
        updated_at: now,
    }
}
