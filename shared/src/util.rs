/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a local queue id (v4 UUID).
///
/// The id is stable for the lifetime of a queued order and doubles as the
/// idempotency key sent with every submission attempt.
pub fn queue_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
