//! User-facing message catalog.
//!
//! Strings shown to end users live here rather than at their call sites.
//! Rate limit messages must stay generic: no counts, limits, or wait times.

/// Shown when an action is rejected by the rate limiter
/// ("please wait a while and try again").
pub const RATE_LIMIT_EXCEEDED_MESSAGE: &str = "しばらく時間をおいてから再度お試しください";

/// Label for a roster that is running out of room ("N slots remaining").
pub fn remaining_slots_label(remaining_slots: i64) -> String {
    format!("残り{}枠", remaining_slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_reveals_nothing() {
        assert!(!RATE_LIMIT_EXCEEDED_MESSAGE.chars().any(|c| c.is_ascii_digit()));
        for unit in ["分", "回", "件", "秒"] {
            assert!(!RATE_LIMIT_EXCEEDED_MESSAGE.contains(unit));
        }
    }

    #[test]
    fn test_remaining_slots_label() {
        assert_eq!(remaining_slots_label(3), "残り3枠");
        assert_eq!(remaining_slots_label(0), "残り0枠");
    }
}
