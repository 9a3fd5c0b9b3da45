//! A single level of the hierarchical wheel.

use crate::bucket::Bucket;
use crate::clock::Clock;
use crate::delay_queue::DelayQueue;
use crate::timer::Timer;
use crate::util::truncate;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// One level of the hierarchical wheel.
///
/// The base level is created once, with the caller's configured tick and size. Every
/// further level is created lazily, the first time a timer's deadline falls outside the
/// current level's interval, so a wheel that only ever schedules short-lived timers
/// never allocates a single overflow level.
pub struct Wheel {
    tick_ms: i64,
    wheel_size: i64,
    interval_ms: i64,
    current_time_ms: AtomicI64,
    buckets: Box<[Arc<Bucket>]>,
    overflow: ArcSwapOption<Wheel>,
    delay_queue: Arc<DelayQueue<Arc<Bucket>>>,
    clock: Arc<dyn Clock>,
}

impl Wheel {
    pub(crate) fn root(
        tick_ms: i64,
        wheel_size: i64,
        delay_queue: Arc<DelayQueue<Arc<Bucket>>>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let start_ms = clock.now_ms();
        Self::level(tick_ms, wheel_size, start_ms, delay_queue, clock)
    }

    fn level(
        tick_ms: i64,
        wheel_size: i64,
        start_ms: i64,
        delay_queue: Arc<DelayQueue<Arc<Bucket>>>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let buckets = (0..wheel_size)
            .map(|_| Bucket::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Arc::new(Self {
            tick_ms,
            wheel_size,
            interval_ms: tick_ms * wheel_size,
            current_time_ms: AtomicI64::new(truncate(start_ms, tick_ms)),
            buckets,
            overflow: ArcSwapOption::from(None),
            delay_queue,
            clock,
        })
    }

    pub(crate) fn current_time_ms(&self) -> i64 {
        self.current_time_ms.load(Ordering::Acquire)
    }

    /// Route `t` into the bucket for its deadline, at whichever level can represent it.
    /// Returns `false` if the deadline is already within one tick of now (or in the
    /// past), in which case the caller is responsible for running it directly instead.
    pub(crate) fn add(self: &Arc<Self>, t: Arc<Timer>) -> bool {
        let ct = self.current_time_ms.load(Ordering::Acquire);
        let exp = t.expiration_ms();

        if exp < ct + self.tick_ms {
            return false;
        }

        if exp < ct + self.interval_ms {
            let virtual_id = exp.div_euclid(self.tick_ms);
            let idx = virtual_id.rem_euclid(self.wheel_size) as usize;
            let bucket = &self.buckets[idx];
            bucket.add(t);
            if bucket.set_expiration(virtual_id * self.tick_ms) {
                self.delay_queue.push(bucket.clone(), bucket.expiration());
            }
            return true;
        }

        self.overflow(ct).add(t)
    }

    fn overflow(self: &Arc<Self>, current_time_ms: i64) -> Arc<Wheel> {
        if let Some(existing) = self.overflow.load_full() {
            return existing;
        }
        let candidate = Wheel::level(
            self.interval_ms,
            self.wheel_size,
            current_time_ms,
            self.delay_queue.clone(),
            self.clock.clone(),
        );
        let previous = self
            .overflow
            .compare_and_swap(&None::<Arc<Wheel>>, Some(candidate.clone()));
        match &*previous {
            Some(winner) => winner.clone(),
            None => candidate,
        }
    }

    /// Add `t`, or, if it is already due, spawn its callback immediately instead of
    /// bucketing it. This is the fast path for sub-tick delays and for timers a cascade
    /// discovers have already elapsed by the time they're re-added.
    pub(crate) fn add_or_run(self: &Arc<Self>, t: Arc<Timer>) {
        if self.add(t.clone()) {
            return;
        }
        let callback = t.callback.clone();
        tokio::spawn(async move {
            (*callback)();
        });
    }

    /// Advance this level's clock to `expiration_ms`'s tick boundary, and propagate the
    /// same expiration down the overflow chain if one exists. The driver loop always
    /// calls this on the root wheel for every bucket it flushes, regardless of which
    /// level that bucket actually lived at; a lower level's clock can otherwise fall
    /// behind if nothing at that level has fired in a while.
    pub(crate) fn advance_clock(self: &Arc<Self>, expiration_ms: i64) {
        let ct = self.current_time_ms.load(Ordering::Acquire);
        if expiration_ms >= ct + self.tick_ms {
            let new_ct = truncate(expiration_ms, self.tick_ms);
            self.current_time_ms.store(new_ct, Ordering::Release);
            trace!(tick_ms = self.tick_ms, current_time_ms = new_ct, "wheel clock advanced");
            if let Some(overflow) = self.overflow.load_full() {
                overflow.advance_clock(new_ct);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    fn new_root(tick_ms: i64, wheel_size: i64, start_ms: i64) -> Arc<Wheel> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(start_ms));
        let (dq, _rx) = DelayQueue::new(16);
        Wheel::root(tick_ms, wheel_size, dq, clock)
    }

    fn counting_timer(expiration_ms: i64, counter: Arc<AtomicUsize>) -> Arc<Timer> {
        Timer::one_shot(
            expiration_ms,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        )
    }

    #[test]
    fn timer_due_within_one_tick_is_reported_as_not_added() {
        let wheel = new_root(10, 8, 0);
        let t = Timer::one_shot(5, Arc::new(|| {}));
        assert!(!wheel.add(t));
    }

    #[test]
    fn timer_within_base_interval_lands_in_a_bucket() {
        let wheel = new_root(10, 8, 0);
        let t = Timer::one_shot(55, Arc::new(|| {}));
        assert!(wheel.add(t));
    }

    #[test]
    fn timer_beyond_base_interval_creates_an_overflow_level() {
        let wheel = new_root(10, 8, 0);
        // base interval is 10 * 8 = 80ms; this deadline needs a second level.
        let t = Timer::one_shot(500, Arc::new(|| {}));
        assert!(wheel.add(t));
        assert!(wheel.overflow.load_full().is_some());
    }

    #[tokio::test]
    async fn add_or_run_executes_immediately_when_already_due() {
        let wheel = new_root(10, 8, 1_000);
        let counter = Arc::new(AtomicUsize::new(0));
        let t = counting_timer(1_000, counter.clone());
        wheel.add_or_run(t);
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn advance_clock_propagates_down_the_overflow_chain() {
        let wheel = new_root(10, 4, 0);
        wheel.add(Timer::one_shot(1_000, Arc::new(|| {})));
        let overflow = wheel.overflow.load_full().unwrap();

        wheel.advance_clock(1_000);

        assert_eq!(wheel.current_time_ms(), 1_000);
        assert_eq!(overflow.current_time_ms(), 1_000);
    }
}
