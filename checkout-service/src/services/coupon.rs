//! Coupon validation and application.
//!
//! Eligibility rules run in a fixed order: existence/applicability, expiry,
//! usage limit, minimum purchase. Rejection messages are user-facing copy and
//! are surfaced verbatim to the client.

use crate::models::{Coupon, DiscountBreakdown};
use mongodb::bson::{doc, DateTime};
use mongodb::{Collection, Database};
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Invalid or inapplicable coupon code")]
    NotFound,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum purchase amount of {0:.2} required")]
    MinimumNotMet(f64),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Database(e) => AppError::DatabaseError(e.into()),
            rejection => AppError::BadRequest(anyhow::anyhow!(rejection.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct CouponService {
    coupons: Collection<Coupon>,
}

impl CouponService {
    pub fn new(db: &Database) -> Self {
        Self {
            coupons: db.collection("coupons"),
        }
    }

    /// Validate a coupon against a course and its listed price.
    ///
    /// Does not consume a use; see [`CouponService::apply`].
    pub async fn validate(
        &self,
        code: &str,
        course_id: &str,
        original_price: f64,
    ) -> Result<Coupon, CouponError> {
        let normalized = Coupon::normalize_code(code);
        let filter = doc! {
            "code": &normalized,
            "is_active": true,
            "course_ids": course_id,
        };

        let coupon = self
            .coupons
            .find_one(filter, None)
            .await?
            .ok_or(CouponError::NotFound)?;

        if coupon.is_expired(DateTime::now()) {
            return Err(CouponError::Expired);
        }
        if coupon.is_exhausted() {
            return Err(CouponError::UsageLimitReached);
        }
        if let Some(min) = coupon.min_purchase_amount {
            if original_price < min {
                return Err(CouponError::MinimumNotMet(min));
            }
        }

        Ok(coupon)
    }

    /// Validate, compute the discount, and consume one use.
    ///
    /// The increment is a single conditional update: it matches only while
    /// `used_count` is below the limit, so two concurrent applications of a
    /// nearly-exhausted coupon cannot both succeed. Zero matched documents
    /// means another request won the race and this one fails late with
    /// `UsageLimitReached`.
    pub async fn apply(
        &self,
        code: &str,
        course_id: &str,
        original_price: f64,
    ) -> Result<(Coupon, DiscountBreakdown), CouponError> {
        let coupon = self.validate(code, course_id, original_price).await?;
        let breakdown = coupon.calculate_discount(original_price);

        let mut filter = doc! {
            "_id": coupon.id.to_string(),
            "is_active": true,
        };
        if let Some(limit) = coupon.usage_limit {
            filter.insert("used_count", doc! { "$lt": limit });
        }

        let update = doc! {
            "$inc": { "used_count": 1 },
            "$set": { "updated_at": DateTime::now() },
        };

        let result = self.coupons.update_one(filter, update, None).await?;
        if result.matched_count == 0 {
            tracing::warn!(
                code = %coupon.code,
                "Coupon exhausted between validation and increment"
            );
            return Err(CouponError::UsageLimitReached);
        }

        tracing::info!(
            code = %coupon.code,
            course_id = %course_id,
            discount = breakdown.discount_amount,
            "Coupon applied"
        );

        Ok((coupon, breakdown))
    }
}
