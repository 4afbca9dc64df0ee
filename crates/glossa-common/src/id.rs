use uuid::Uuid;

/// Generate a fresh callback identifier for correlating an outbound
/// command with its eventual inbound response.
pub fn new_callback_id() -> String {
    Uuid::new_v4().to_string()
}
