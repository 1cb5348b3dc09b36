use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a coupon discounts the course price.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Flat,
}

/// A named discount rule scoped to one or more courses.
///
/// `code` is normalized to uppercase on every write. `used_count` never
/// exceeds `usage_limit` when a limit is set; the increment is guarded by an
/// atomic conditional update in the coupon service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub course_ids: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub min_purchase_amount: Option<f64>,
    pub max_discount_amount: Option<f64>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Discount figures for one coupon applied to one price.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiscountBreakdown {
    pub discount_amount: f64,
    pub final_price: f64,
    pub savings: f64,
}

/// Round a monetary amount half-up to 2 decimal places.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

impl Coupon {
    /// Normalize a user-supplied code for lookup and storage.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Compute the discount this coupon grants on `original_price`.
    ///
    /// The raw discount is clamped first to `max_discount_amount` (if set)
    /// and then to the price itself, so the final price is never negative.
    pub fn calculate_discount(&self, original_price: f64) -> DiscountBreakdown {
        let raw = match self.discount_type {
            DiscountType::Percentage => original_price * self.discount_value / 100.0,
            DiscountType::Flat => self.discount_value,
        };

        let capped = match self.max_discount_amount {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        let discount_amount = round_money(capped.min(original_price));
        let final_price = round_money(original_price - discount_amount);

        DiscountBreakdown {
            discount_amount,
            final_price,
            savings: discount_amount,
        }
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.used_count >= limit)
    }
}

/// Lifecycle of a checkout attempt.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Razorpay,
    Paypal,
}

impl PaymentProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "razorpay" => Some(Self::Razorpay),
            "paypal" => Some(Self::Paypal),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Razorpay => write!(f, "razorpay"),
            Self::Paypal => write!(f, "paypal"),
        }
    }
}

/// Contact snapshot captured at checkout.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Internal record of a checkout attempt, pre-payment.
///
/// Terminal states are never mutated except for provider id backfill on the
/// transition to `paid`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentOrder {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Internal order id shown to the customer (`ORD-<millis>-<suffix>`).
    pub receipt: String,
    pub course_id: String,
    pub course_name: String,
    /// Listed price before any discount.
    pub original_amount: f64,
    /// Amount actually charged, post-discount.
    pub amount: f64,
    pub currency: String,
    pub status: OrderStatus,
    pub provider: PaymentProvider,
    pub customer: CustomerContact,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    /// Free-form notes; carries the discount breakdown captured at creation.
    pub notes: mongodb::bson::Document,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Immutable record of a completed, verified payment. Never updated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: Uuid,
    pub receipt: String,
    pub course_id: String,
    pub course_name: String,
    pub amount: f64,
    pub currency: String,
    pub provider: PaymentProvider,
    pub provider_order_id: String,
    /// Unique per transaction; the idempotency key for retried callbacks.
    pub provider_payment_id: String,
    pub payment_method: Option<String>,
    pub customer: CustomerContact,
    pub paid_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    InstallmentPending,
}

/// Manual-review workflow advanced by a human admin, not by the core logic.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
    InstallmentPending,
}

impl CustomerStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "installment_pending" => Some(Self::InstallmentPending),
            _ => None,
        }
    }
}

/// Lead record derived from a completed payment or an installment inquiry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_id: String,
    pub course_name: String,
    pub amount_paid: Option<f64>,
    pub payment_status: PaymentStatus,
    pub status: CustomerStatus,
    pub message: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Course lookup collaborator document (read-only to the core).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    pub badge: Option<String>,
}

/// Course pricing collaborator document (read-only to the core).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoursePricing {
    pub course_id: String,
    pub current: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(discount_type: DiscountType, value: f64, cap: Option<f64>) -> Coupon {
        let now = DateTime::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            discount_type,
            discount_value: value,
            course_ids: vec!["course-1".to_string()],
            is_active: true,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            min_purchase_amount: None,
            max_discount_amount: cap,
            description: None,
            created_by: "admin".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount_on_round_price() {
        let c = coupon(DiscountType::Percentage, 20.0, None);
        let b = c.calculate_discount(100.0);
        assert_eq!(b.discount_amount, 20.0);
        assert_eq!(b.final_price, 80.0);
        assert_eq!(b.savings, 20.0);
    }

    #[test]
    fn flat_discount_clamped_to_cap() {
        let c = coupon(DiscountType::Flat, 50.0, Some(10.0));
        let b = c.calculate_discount(40.0);
        assert_eq!(b.discount_amount, 10.0);
        assert_eq!(b.final_price, 30.0);
    }

    #[test]
    fn discount_never_exceeds_price() {
        let c = coupon(DiscountType::Flat, 500.0, None);
        let b = c.calculate_discount(40.0);
        assert_eq!(b.discount_amount, 40.0);
        assert_eq!(b.final_price, 0.0);
    }

    #[test]
    fn full_percentage_leaves_zero_price() {
        let c = coupon(DiscountType::Percentage, 100.0, None);
        let b = c.calculate_discount(79.99);
        assert_eq!(b.discount_amount, 79.99);
        assert_eq!(b.final_price, 0.0);
    }

    #[test]
    fn percentage_keeps_final_price_within_bounds() {
        let c = coupon(DiscountType::Percentage, 33.0, None);
        for price in [0.01, 9.99, 49.5, 100.0, 12345.67] {
            let b = c.calculate_discount(price);
            assert!(b.final_price >= 0.0);
            assert!(b.final_price <= price);
            assert!(b.discount_amount <= price);
        }
    }

    #[test]
    fn monetary_outputs_round_half_up() {
        let c = coupon(DiscountType::Percentage, 15.0, None);
        // 15% of 33.33 = 4.9995 -> 5.00
        let b = c.calculate_discount(33.33);
        assert_eq!(b.discount_amount, 5.0);
        assert_eq!(b.final_price, 28.33);
    }

    #[test]
    fn cap_applies_before_price_clamp() {
        let c = coupon(DiscountType::Percentage, 90.0, Some(25.0));
        let b = c.calculate_discount(100.0);
        assert_eq!(b.discount_amount, 25.0);
        assert_eq!(b.final_price, 75.0);
    }

    #[test]
    fn code_normalization_uppercases_and_trims() {
        assert_eq!(Coupon::normalize_code("  save20 "), "SAVE20");
        assert_eq!(Coupon::normalize_code("SAVE20"), "SAVE20");
    }

    #[test]
    fn expiry_check_uses_supplied_clock() {
        let mut c = coupon(DiscountType::Flat, 5.0, None);
        let now = DateTime::now();
        assert!(!c.is_expired(now));

        c.expires_at = Some(DateTime::from_millis(now.timestamp_millis() - 1000));
        assert!(c.is_expired(now));

        c.expires_at = Some(DateTime::from_millis(now.timestamp_millis() + 60_000));
        assert!(!c.is_expired(now));
    }

    #[test]
    fn exhaustion_only_with_limit_set() {
        let mut c = coupon(DiscountType::Flat, 5.0, None);
        c.used_count = 1_000_000;
        assert!(!c.is_exhausted());

        c.usage_limit = Some(3);
        c.used_count = 2;
        assert!(!c.is_exhausted());
        c.used_count = 3;
        assert!(c.is_exhausted());
    }
}
