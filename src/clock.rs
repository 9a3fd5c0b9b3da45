//! Time sources.
//!
//! The wheel and delay queue never call `SystemTime::now()` or `tokio::time::sleep`'s
//! implicit clock directly outside of [`SystemClock`]; every deadline they compute is
//! expressed relative to a `&dyn Clock`. That makes it possible to swap in
//! [`ManualClock`] for unit tests of the bucketing and cascade logic, and lets
//! integration tests run under `#[tokio::test(start_paused = true)]` with
//! `tokio::time::advance` driving the wheel deterministically instead of real wall time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant as TokioInstant;

/// A source of "now", in milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Computed from a `tokio::time::Instant` baseline rather than `SystemTime::now()` on
/// every call, so that under `tokio::time::pause()` this clock advances in lockstep
/// with the runtime's virtual clock instead of real time.
pub struct SystemClock {
    epoch_ms_at_start: i64,
    start: TokioInstant,
}

impl SystemClock {
    pub fn new() -> Self {
        let epoch_ms_at_start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            epoch_ms_at_start,
            start: TokioInstant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms_at_start + self.start.elapsed().as_millis() as i64
    }
}

/// A clock driven entirely by the caller. Useful for exercising wheel bucketing and
/// cascade behavior without spawning the driver loop or waiting on real time at all.
///
/// Available in this crate's own tests unconditionally; downstream crates opt in with
/// the `testing` feature.
#[cfg(any(test, feature = "testing"))]
pub struct ManualClock(AtomicI64);

#[cfg(any(test, feature = "testing"))]
impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(AtomicI64::new(start_ms))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::AcqRel);
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }
}
