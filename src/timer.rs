//! A single scheduled callback.

use crate::bucket::Bucket;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

fn next_timer_id() -> u64 {
    NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed)
}

/// A scheduled callback, owned jointly by whoever holds the returned handle and, while
/// pending, by the bucket it currently lives in.
///
/// `bucket_ref` is an atomically-swappable back-reference to the owning bucket, giving
/// [`Timer::stop`] a safe way to race against the driver loop moving this timer from one
/// bucket to the next during a cascade.
pub struct Timer {
    pub(crate) id: u64,
    expiration_ms: AtomicI64,
    pub(crate) callback: Arc<dyn Fn() + Send + Sync>,
    pub(crate) bucket_ref: ArcSwapOption<Bucket>,
    retain: ArcSwapOption<Timer>,
}

impl Timer {
    pub(crate) fn new_unchecked(expiration_ms: i64, callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            id: next_timer_id(),
            expiration_ms: AtomicI64::new(expiration_ms),
            callback,
            bucket_ref: ArcSwapOption::from(None),
            retain: ArcSwapOption::from(None),
        }
    }

    pub(crate) fn one_shot(expiration_ms: i64, callback: Arc<dyn Fn() + Send + Sync>) -> Arc<Self> {
        Arc::new(Self::new_unchecked(expiration_ms, callback))
    }

    /// Hold a strong reference to `self` inside `self`, keeping a recurring timer alive
    /// across firings even if the caller drops its own handle. Released by
    /// [`Timer::stop`] or [`Timer::release_self`].
    pub(crate) fn retain_self(self: &Arc<Self>) {
        self.retain.store(Some(self.clone()));
    }

    /// Drop the self-held strong reference set up by [`Timer::retain_self`], if any.
    pub(crate) fn release_self(&self) {
        self.retain.store(None);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The absolute millisecond deadline this timer is currently scheduled for.
    pub fn expiration_ms(&self) -> i64 {
        self.expiration_ms.load(Ordering::Acquire)
    }

    pub(crate) fn set_expiration_ms(&self, ms: i64) {
        self.expiration_ms.store(ms, Ordering::Release);
    }

    /// Cancel the timer.
    ///
    /// Returns `true` if this call removed it from a bucket, `false` if it had already
    /// fired, was already stopped, or never entered a bucket (it was due immediately on
    /// scheduling and ran directly). Loops because the timer may be mid-cascade: by the
    /// time we read `bucket_ref`, the driver loop may have already moved it to a
    /// different bucket, in which case our removal attempt fails and we retry against
    /// whichever bucket it landed in next.
    pub fn stop(&self) -> bool {
        let mut stopped = false;
        while let Some(bucket) = self.bucket_ref.load_full() {
            if bucket.remove(self) {
                stopped = true;
                break;
            }
        }
        self.release_self();
        stopped
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("expiration_ms", &self.expiration_ms())
            .finish()
    }
}
