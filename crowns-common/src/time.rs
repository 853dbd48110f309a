//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch milliseconds, the unit stored in documents
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        let millis = now_millis();
        // After 2020-01-01 and before 2100-01-01
        assert!(millis > 1_577_836_800_000);
        assert!(millis < 4_102_444_800_000);
    }

    #[tokio::test]
    async fn test_now_millis_advances() {
        let first = now_millis();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = now_millis();
        assert!(second > first);
    }
}
