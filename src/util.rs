//! Small millisecond-arithmetic helpers shared by the wheel and delay queue.

use std::time::Duration;

/// Round `x` down to the nearest multiple of `m` (or return `x` unchanged if `m <= 0`).
///
/// Used to keep a wheel's `current_time_ms` aligned to its own tick boundary.
pub fn truncate(x: i64, m: i64) -> i64 {
    if m <= 0 {
        x
    } else {
        x - x.rem_euclid(m)
    }
}

pub fn duration_to_ms(d: Duration) -> i64 {
    d.as_millis() as i64
}

pub fn ms_to_duration(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}
