//! ID generation utilities for Restartr
//!
//! Provides functions for generating unique identifiers for workflows
//! and report events.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Generate a unique workflow ID
///
/// Format: `wf-{timestamp_ms}-{random_hex}`
/// Example: `wf-1738300800123-a1b2`
pub fn generate_workflow_id() -> String {
    let random: u16 = rand::rng().random();
    format!("wf-{}-{:04x}", now_ms(), random)
}

/// Generate an event ID
///
/// Format: `evt-{timestamp_ms}-{random_hex}`
pub fn generate_event_id() -> String {
    let random: u16 = rand::rng().random();
    format!("evt-{}-{:04x}", now_ms(), random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        let ts = now_ms();
        assert!(ts > 1577836800000); // 2020-01-01
        assert!(ts < 4102444800000); // 2100-01-01
    }

    #[test]
    fn test_generate_workflow_id_format() {
        let id = generate_workflow_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "wf");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_event_id_format() {
        let id = generate_event_id();
        assert!(id.starts_with("evt-"));
        assert_eq!(id.split('-').count(), 3);
    }
}
