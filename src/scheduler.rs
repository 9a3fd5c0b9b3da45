//! Recurrence rules for [`crate::TimingWheel::schedule`].

use std::time::Duration;

/// Computes the next firing time of a recurring timer from its own previous *scheduled*
/// expiration, not from wall-clock "now", which keeps a recurring timer from drifting
/// later every time the driver loop is itself a little late. Returning `None` ends the
/// recurrence.
pub trait Scheduler: Send + Sync {
    fn next(&self, prev_expiration_ms: i64) -> Option<i64>;
}

/// A fixed-interval recurrence: fires every `interval` after the previous scheduled
/// expiration, indefinitely.
pub struct EveryScheduler {
    interval_ms: i64,
}

impl EveryScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as i64,
        }
    }
}

impl Scheduler for EveryScheduler {
    fn next(&self, prev_expiration_ms: i64) -> Option<i64> {
        Some(prev_expiration_ms + self.interval_ms)
    }
}

/// Fires a fixed number of times total, then stops.
pub struct CountedScheduler {
    interval_ms: i64,
    remaining: std::sync::atomic::AtomicU64,
}

impl CountedScheduler {
    pub fn new(interval: Duration, count: u64) -> Self {
        Self {
            interval_ms: interval.as_millis() as i64,
            remaining: std::sync::atomic::AtomicU64::new(count),
        }
    }
}

impl Scheduler for CountedScheduler {
    fn next(&self, prev_expiration_ms: i64) -> Option<i64> {
        use std::sync::atomic::Ordering;
        let prev = self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            if n == 0 {
                None
            } else {
                Some(n - 1)
            }
        });
        match prev {
            Ok(_) => Some(prev_expiration_ms + self.interval_ms),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_scheduler_never_drifts_from_its_own_cadence() {
        let s = EveryScheduler::new(Duration::from_millis(10));
        let a = s.next(0).unwrap();
        let b = s.next(a).unwrap();
        assert_eq!(a, 10);
        assert_eq!(b, 20);
    }

    #[test]
    fn counted_scheduler_stops_after_its_count_is_exhausted() {
        let s = CountedScheduler::new(Duration::from_millis(5), 2);
        assert_eq!(s.next(0), Some(5));
        assert_eq!(s.next(5), Some(10));
        assert_eq!(s.next(10), None);
    }
}
