//! A single-consumer queue that only wakes its poller when something is actually due.

use crate::clock::Clock;
use crate::pqueue::PriorityQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Wraps a [`PriorityQueue`] with the wakeup protocol needed to let one task sleep
/// until the minimum-priority entry becomes due, while other tasks keep pushing new
/// entries, including entries that become the new minimum and so need to cut the
/// sleeper's wait short.
///
/// `sleeping` plus `wakeup` track whether the poller is parked: a push only needs to
/// notify it when the pushed entry becomes the new root AND the poller was actually
/// asleep, and [`Notify::notify_one`] stores one wakeup token even if nobody's waiting
/// yet. Shutdown is a separate, broadcastable signal (`CancellationToken`) since
/// `Notify` alone cannot guarantee delivery to a task that isn't inside
/// `.notified().await` at the moment of a stop request.
pub struct DelayQueue<T> {
    inner: Mutex<PriorityQueue<T>>,
    sleeping: AtomicBool,
    wakeup: Notify,
    tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> DelayQueue<T> {
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Arc::new(Self {
            inner: Mutex::new(PriorityQueue::new(capacity)),
            sleeping: AtomicBool::new(false),
            wakeup: Notify::new(),
            tx,
        });
        (queue, rx)
    }

    pub fn push(&self, value: T, priority: i64) {
        let index = {
            let mut heap = self.inner.lock();
            heap.push(value, priority)
        };
        if index == 0 && self.sleeping.swap(false, Ordering::AcqRel) {
            self.wakeup.notify_one();
        }
    }

    /// Drive this queue until `shutdown` is cancelled, pushing each due entry to the
    /// receiver half returned by [`DelayQueue::new`].
    pub async fn poll(&self, shutdown: &CancellationToken, clock: &dyn Clock) {
        loop {
            let now = clock.now_ms();
            let (item, delta_ms) = {
                let mut heap = self.inner.lock();
                let (item, delta_ms) = heap.peek_and_shift(now);
                if item.is_none() {
                    self.sleeping.store(true, Ordering::Release);
                }
                (item, delta_ms)
            };

            let Some((value, _priority)) = item else {
                if delta_ms == 0 {
                    tokio::select! {
                        _ = self.wakeup.notified() => {}
                        _ = shutdown.cancelled() => return,
                    }
                } else {
                    tokio::select! {
                        _ = self.wakeup.notified() => {}
                        _ = tokio::time::sleep(Duration::from_millis(delta_ms as u64)) => {
                            // A push may have already cleared `sleeping` and queued a
                            // wakeup between our timer firing and now; drain it so it
                            // doesn't fire spuriously on the next idle wait.
                            if !self.sleeping.swap(false, Ordering::AcqRel) {
                                self.wakeup.notified().await;
                            }
                        }
                        _ = shutdown.cancelled() => return,
                    }
                }
                continue;
            };

            tokio::select! {
                res = self.tx.send(value) => {
                    if res.is_err() {
                        return;
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    }
}
