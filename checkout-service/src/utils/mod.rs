use rand::{distributions::Alphanumeric, Rng};

/// Generate an internal order id: `ORD-<millis>-<6 uppercase alnum>`.
pub fn generate_receipt_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}
