use chrono::Utc;

/// Source of "now" for cache expiry
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock in epoch milliseconds
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
