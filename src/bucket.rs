//! A wheel slot holding every timer whose deadline currently maps to it.

use crate::timer::Timer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// One slot of a [`crate::wheel::Wheel`].
///
/// Timers keyed by id for O(1) removal.
pub struct Bucket {
    expiration: AtomicI64,
    timers: Mutex<HashMap<u64, Arc<Timer>>>,
}

impl Bucket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            expiration: AtomicI64::new(-1),
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// The virtual-tick expiration this bucket is currently assigned to, or `-1` if it
    /// does not currently represent a due time (just flushed, or never used).
    pub fn expiration(&self) -> i64 {
        self.expiration.load(Ordering::Acquire)
    }

    /// Swap in a new expiration, reporting whether it actually changed. Only the caller
    /// that observes a change is responsible for re-enqueuing this bucket into the delay
    /// queue, which keeps a bucket that multiple timers land on in the same tick from
    /// being pushed onto the queue more than once.
    pub fn set_expiration(&self, new: i64) -> bool {
        self.expiration.swap(new, Ordering::AcqRel) != new
    }

    pub fn add(self: &Arc<Self>, t: Arc<Timer>) {
        let mut timers = self.timers.lock();
        t.bucket_ref.store(Some(self.clone()));
        timers.insert(t.id, t);
    }

    /// Remove `t`, but only if it still believes it lives in this bucket. A concurrent
    /// cascade may have already moved `t` elsewhere, in which case this is a no-op and
    /// the caller (see [`Timer::stop`](crate::timer::Timer::stop)) retries against the
    /// bucket `t` now points to.
    pub fn remove(self: &Arc<Self>, t: &Timer) -> bool {
        let mut timers = self.timers.lock();
        match t.bucket_ref.load_full() {
            Some(owner) if Arc::ptr_eq(&owner, self) => {
                timers.remove(&t.id);
                t.bucket_ref.store(None);
                true
            }
            _ => false,
        }
    }

    /// Drain every timer, clearing each one's back-reference, and hand it to `reinsert`
    /// after this bucket's lock has been released.
    ///
    /// Reinsertion may route a timer straight back into this same bucket (a timer whose
    /// cascade lands it on the same slot it started on), and `timers`'s lock is not
    /// reentrant, so calling `reinsert` while still holding it would deadlock.
    pub fn flush(self: &Arc<Self>, mut reinsert: impl FnMut(Arc<Timer>)) {
        let drained: Vec<Arc<Timer>> = {
            let mut timers = self.timers.lock();
            timers.drain().map(|(_, t)| t).collect()
        };
        for t in drained {
            t.bucket_ref.store(None);
            reinsert(t);
        }
        self.set_expiration(-1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.timers.lock().len()
    }
}
