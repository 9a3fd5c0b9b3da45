//! The public entry point: wires a [`Wheel`] and [`DelayQueue`] together with a poll
//! task and a worker task.

use crate::bucket::Bucket;
use crate::clock::{Clock, SystemClock};
use crate::config::WheelConfig;
use crate::delay_queue::DelayQueue;
use crate::error::WheelError;
use crate::scheduler::Scheduler;
use crate::timer::Timer;
use crate::util::duration_to_ms;
use crate::wheel::Wheel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A hierarchical timing wheel: the public entry point for scheduling one-shot and
/// recurring timers at millisecond resolution.
///
/// Construct with a [`WheelConfig`], call [`start`](Self::start) once to spawn its
/// driver tasks, and [`stop`](Self::stop) to unwind them. Scheduling methods
/// ([`after`](Self::after), [`schedule`](Self::schedule)) work before `start` is called
/// too; timers just won't fire until the driver loop is running.
pub struct TimingWheel {
    root: Arc<Wheel>,
    delay_queue: Arc<DelayQueue<Arc<Bucket>>>,
    receiver: Mutex<Option<mpsc::Receiver<Arc<Bucket>>>>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl TimingWheel {
    pub fn new(config: WheelConfig) -> Result<Self, WheelError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: WheelConfig, clock: Arc<dyn Clock>) -> Result<Self, WheelError> {
        config.validate()?;
        let (delay_queue, receiver) = DelayQueue::new(config.queue_capacity);
        let root = Wheel::root(config.tick_ms as i64, config.wheel_size as i64, delay_queue.clone(), clock.clone());
        Ok(Self {
            root,
            delay_queue,
            receiver: Mutex::new(Some(receiver)),
            clock,
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(None),
        })
    }

    /// Spawn the poll and worker tasks. A no-op if the wheel is already started.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("start() called on an already-started wheel; ignoring");
            return;
        }

        let dq_poll = self.delay_queue.clone();
        let clock_poll = self.clock.clone();
        let shutdown_poll = self.shutdown.clone();
        let poll_handle = tokio::spawn(async move {
            dq_poll.poll(&shutdown_poll, clock_poll.as_ref()).await;
        });

        let root_worker = self.root.clone();
        let shutdown_worker = self.shutdown.clone();
        let mut receiver = self
            .receiver
            .lock()
            .take()
            .unwrap_or_else(|| unreachable!("start() only spawns the worker once, guarded by `started`"));
        let worker_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    bucket = receiver.recv() => {
                        match bucket {
                            Some(bucket) => {
                                root_worker.advance_clock(bucket.expiration());
                                bucket.flush(|t| root_worker.add_or_run(t));
                            }
                            None => break,
                        }
                    }
                    _ = shutdown_worker.cancelled() => break,
                }
            }
        });

        *self.tasks.lock() = Some((poll_handle, worker_handle));
        info!("timing wheel started");
    }

    /// Signal shutdown and wait for both driver tasks to unwind. Already-bucketed
    /// timers are dropped without firing; callback tasks already spawned by a cascade
    /// are not awaited.
    pub async fn stop(&self) {
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();
        let tasks = self.tasks.lock().take();
        if let Some((poll_handle, worker_handle)) = tasks {
            let _ = poll_handle.await;
            let _ = worker_handle.await;
        }
        info!("timing wheel stopped");
    }

    /// Schedule `callback` to run once, approximately `d` after this call (rounded up to
    /// the wheel's tick). Returns a handle whose [`Timer::stop`] cancels it.
    pub fn after(&self, d: Duration, callback: impl Fn() + Send + Sync + 'static) -> Arc<Timer> {
        let expiration_ms = self.clock.now_ms() + duration_to_ms(d);
        let timer = Timer::one_shot(expiration_ms, Arc::new(callback));
        self.root.add_or_run(timer.clone());
        timer
    }

    /// Schedule `callback` to run every time `scheduler.next` produces another
    /// deadline, starting now. Returns `None` without scheduling anything if
    /// `scheduler.next` immediately ends the recurrence.
    pub fn schedule(
        &self,
        scheduler: Arc<dyn Scheduler>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Option<Arc<Timer>> {
        let now = self.clock.now_ms();
        let first_expiration_ms = scheduler.next(now)?;
        let root = self.root.clone();
        let user_callback: Arc<dyn Fn() + Send + Sync> = Arc::new(callback);

        let timer = Arc::new_cyclic(move |weak: &Weak<Timer>| {
            let weak = weak.clone();
            let recurring_callback: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                if let Some(timer) = weak.upgrade() {
                    let prev_ms = timer.expiration_ms();
                    match scheduler.next(prev_ms) {
                        Some(next_ms) => {
                            timer.set_expiration_ms(next_ms);
                            root.add_or_run(timer.clone());
                        }
                        None => timer.release_self(),
                    }
                }
                (*user_callback)();
            });
            Timer::new_unchecked(first_expiration_ms, recurring_callback)
        });

        // Recurring timers are scheduled by weak reference from their own callback, so the
        // timer retains a strong reference to itself for as long as it keeps recurring;
        // otherwise a caller who discards the returned handle would see it fire once and stop.
        timer.retain_self();
        self.root.add_or_run(timer.clone());
        Some(timer)
    }
}
