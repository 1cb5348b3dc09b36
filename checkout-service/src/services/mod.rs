pub mod coupon;
pub mod email;
pub mod paypal;
pub mod razorpay;
pub mod repository;

pub use coupon::{CouponError, CouponService};
pub use email::{ConfirmationMailer, PaymentConfirmation};
pub use paypal::PayPalClient;
pub use razorpay::RazorpayClient;
pub use repository::CheckoutRepository;
