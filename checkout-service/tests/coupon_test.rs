mod common;

use checkout_service::services::{CouponError, CouponService};
use common::{coupon_fixture, TestApp};
use mongodb::bson::DateTime;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn unknown_coupon_is_invalid() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "NOPE",
                "course_id": "course-1",
                "original_price": 100.0
            }),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("coupon"));

    app.cleanup().await;
}

#[tokio::test]
async fn percentage_coupon_computes_discount() {
    let app = TestApp::spawn().await;
    app.seed_coupon(&coupon_fixture("SAVE20", "course-1")).await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "save20",
                "course_id": "course-1",
                "original_price": 100.0
            }),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["coupon"]["code"], "SAVE20");
    assert_eq!(body["discount"]["discount_amount"], 20.0);
    assert_eq!(body["discount"]["final_price"], 80.0);
    assert_eq!(body["discount"]["savings"], 20.0);

    app.cleanup().await;
}

#[tokio::test]
async fn flat_coupon_is_clamped_to_max_discount() {
    let app = TestApp::spawn().await;
    let mut coupon = coupon_fixture("FLAT50", "course-1");
    coupon.discount_type = checkout_service::models::DiscountType::Flat;
    coupon.discount_value = 50.0;
    coupon.max_discount_amount = Some(10.0);
    app.seed_coupon(&coupon).await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "FLAT50",
                "course_id": "course-1",
                "original_price": 40.0
            }),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["discount"]["discount_amount"], 10.0);
    assert_eq!(body["discount"]["final_price"], 30.0);

    app.cleanup().await;
}

#[tokio::test]
async fn expired_coupon_is_rejected_regardless_of_usage() {
    let app = TestApp::spawn().await;
    let mut coupon = coupon_fixture("OLD10", "course-1");
    coupon.expires_at = Some(DateTime::from_millis(
        DateTime::now().timestamp_millis() - 86_400_000,
    ));
    app.seed_coupon(&coupon).await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "OLD10",
                "course_id": "course-1",
                "original_price": 100.0
            }),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("expired"));

    app.cleanup().await;
}

#[tokio::test]
async fn minimum_purchase_is_enforced_before_discount_math() {
    let app = TestApp::spawn().await;
    let mut coupon = coupon_fixture("MIN50", "course-1");
    coupon.min_purchase_amount = Some(50.0);
    app.seed_coupon(&coupon).await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "MIN50",
                "course_id": "course-1",
                "original_price": 40.0
            }),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Minimum purchase amount"));

    app.cleanup().await;
}

#[tokio::test]
async fn coupon_scoped_to_other_course_is_not_found() {
    let app = TestApp::spawn().await;
    app.seed_coupon(&coupon_fixture("SAVE20", "course-2")).await;

    let response = app
        .post(
            "/api/coupons/validate",
            &json!({
                "coupon_code": "SAVE20",
                "course_id": "course-1",
                "original_price": 100.0
            }),
        )
        .await;

    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn validation_does_not_consume_a_use() {
    let app = TestApp::spawn().await;
    app.seed_coupon(&coupon_fixture("SAVE20", "course-1")).await;

    for _ in 0..3 {
        let response = app
            .post(
                "/api/coupons/validate",
                &json!({
                    "coupon_code": "SAVE20",
                    "course_id": "course-1",
                    "original_price": 100.0
                }),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    assert_eq!(app.coupon_used_count("SAVE20").await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn usage_limit_exhausts_exactly_at_n_applications() {
    let app = TestApp::spawn().await;
    app.seed_course("course-1", "Data Analyst Bootcamp").await;
    app.seed_pricing("course-1", 100.0).await;

    let mut coupon = coupon_fixture("LIMIT2", "course-1");
    coupon.usage_limit = Some(2);
    app.seed_coupon(&coupon).await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_rzp_1",
            "amount": 8000,
            "currency": "INR",
            "receipt": "ORD-1",
            "status": "created"
        })))
        .mount(&app.razorpay_server)
        .await;

    let request = json!({
        "course_id": "course-1",
        "customer_info": { "name": "Ada", "email": "ada@example.com", "phone": "+441234" },
        "coupon_code": "LIMIT2",
        "payment_provider": "razorpay"
    });

    // First N applications succeed
    for _ in 0..2 {
        let response = app.post("/api/payments/create-order", &request).await;
        assert_eq!(response.status(), 201);
    }
    assert_eq!(app.coupon_used_count("LIMIT2").await, 2);

    // The (N+1)th fails with the usage-limit error and no further increment
    let response = app.post("/api/payments/create-order", &request).await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("usage limit"));
    assert_eq!(app.coupon_used_count("LIMIT2").await, 2);

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_applications_never_overshoot_the_limit() {
    let app = TestApp::spawn().await;

    let mut coupon = coupon_fixture("RACE5", "course-1");
    coupon.usage_limit = Some(5);
    app.seed_coupon(&coupon).await;

    // Ten applications racing for five uses: exactly five may win, and the
    // losers must fail with the usage-limit error, whether they lose in
    // validation or in the guarded increment itself.
    let service = CouponService::new(&app.db);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.apply("RACE5", "course-1", 100.0).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CouponError::UsageLimitReached) => {}
            Err(other) => panic!("unexpected coupon error: {other}"),
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(app.coupon_used_count("RACE5").await, 5);

    app.cleanup().await;
}

#[tokio::test]
async fn exhaustion_between_validation_and_increment_is_caught() {
    let app = TestApp::spawn().await;

    let mut coupon = coupon_fixture("LASTONE", "course-1");
    coupon.usage_limit = Some(3);
    coupon.used_count = 2;
    app.seed_coupon(&coupon).await;

    // Two requests race for the final use. Both can pass validation; the
    // conditional increment lets only one through.
    let service = CouponService::new(&app.db);
    let (a, b) = tokio::join!(
        service.apply("LASTONE", "course-1", 100.0),
        service.apply("LASTONE", "course-1", 100.0),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .all(|r| matches!(r, Ok(_) | Err(CouponError::UsageLimitReached))));
    assert_eq!(app.coupon_used_count("LASTONE").await, 3);

    app.cleanup().await;
}
