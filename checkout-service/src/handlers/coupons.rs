//! Public coupon validation endpoint.
//!
//! Returns the discount a coupon would grant without consuming a use.
//! Business rejections are 400s with user-facing copy; they are meant to be
//! shown in the checkout UI verbatim.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;

use crate::services::CouponError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub coupon_code: String,
    pub course_id: String,
    pub original_price: f64,
}

pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<Response, AppError> {
    if payload.coupon_code.trim().is_empty() || payload.course_id.trim().is_empty() {
        return Ok(rejection("Coupon code and course id are required"));
    }
    if payload.original_price <= 0.0 {
        return Ok(rejection("Original price must be positive"));
    }

    match state
        .coupons
        .validate(&payload.coupon_code, &payload.course_id, payload.original_price)
        .await
    {
        Ok(coupon) => {
            let discount = coupon.calculate_discount(payload.original_price);
            Ok((
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "valid": true,
                    "coupon": {
                        "code": coupon.code,
                        "discount_type": coupon.discount_type,
                        "discount_value": coupon.discount_value,
                        "description": coupon.description,
                    },
                    "discount": discount,
                })),
            )
                .into_response())
        }
        Err(CouponError::Database(e)) => Err(AppError::DatabaseError(e.into())),
        Err(rejected) => Ok(rejection(&rejected.to_string())),
    }
}

fn rejection(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "valid": false,
            "error": message,
        })),
    )
        .into_response()
}
