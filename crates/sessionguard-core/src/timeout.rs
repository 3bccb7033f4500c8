const MS_PER_MINUTE: f64 = 60_000.0;

/// Minutes between the last hit and `now_ms`. Negative if the clock went back.
pub fn elapsed_minutes(now_ms: i64, last_hit_ms: i64) -> f64 {
    (now_ms - last_hit_ms) as f64 / MS_PER_MINUTE
}

/// True iff the idle time strictly exceeds the timeout
pub fn session_has_timed_out(now_ms: i64, last_hit_ms: i64, timeout_minutes: f64) -> bool {
    elapsed_minutes(now_ms, last_hit_ms) > timeout_minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60_000;
    const SECOND: i64 = 1_000;

    #[test]
    fn test_boundary_around_thirty_minutes() {
        let now = 10_000 * MINUTE;

        assert!(session_has_timed_out(now, now - (30 * MINUTE + SECOND), 30.0));
        assert!(!session_has_timed_out(now, now - (29 * MINUTE + 59 * SECOND), 30.0));
    }

    #[test]
    fn test_exactly_at_timeout_is_not_expired() {
        let now = 10_000 * MINUTE;
        assert!(!session_has_timed_out(now, now - 30 * MINUTE, 30.0));
        assert!(session_has_timed_out(now, now - 30 * MINUTE - 1, 30.0));
    }

    #[test]
    fn test_fractional_timeout() {
        let now = 100 * MINUTE;
        assert!(session_has_timed_out(now, now - 31 * SECOND, 0.5));
        assert!(!session_has_timed_out(now, now - 29 * SECOND, 0.5));
    }

    #[test]
    fn test_clock_going_back_never_expires() {
        assert!(elapsed_minutes(0, 5 * MINUTE) < 0.0);
        assert!(!session_has_timed_out(0, 90 * MINUTE, 30.0));
    }
}
