use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of "now" for session timing.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time advanced by tokio's monotonic clock, so elapsed time is
/// measured from a fixed anchor instead of summed from timer ticks.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin_wall: Utc::now(),
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

/// Whole seconds from `earlier` to `later`, never negative.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u64 {
    (later - earlier).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_between_floors_at_zero() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::milliseconds(2500);
        assert_eq!(seconds_between(t0, t1), 2);
        assert_eq!(seconds_between(t1, t0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::new();
        let start = clock.now();
        tokio::time::advance(std::time::Duration::from_secs(90)).await;
        assert_eq!(seconds_between(start, clock.now()), 90);
    }
}
