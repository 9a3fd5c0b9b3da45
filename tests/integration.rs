//! Black-box scenarios driven entirely through the public API.

use hwheel::{EveryScheduler, Scheduler, TimingWheel, WheelConfig};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn config() -> WheelConfig {
    #[allow(clippy::unwrap_used)]
    WheelConfig::new(Duration::from_millis(10), 64).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// All of these pause the tokio clock; run them serially so one test's paused timeline
// can't be advanced by another's concurrently running driver tasks.
#[tokio::test(start_paused = true)]
#[serial]
async fn one_shot_timer_fires_after_its_delay() {
    init_tracing();
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    wheel.after(Duration::from_millis(100), move || {
        f.fetch_add(1, Ordering::Relaxed);
    });

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 1);

    wheel.stop().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn many_timers_at_the_same_deadline_all_fire() {
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let f = fired.clone();
        wheel.after(Duration::from_millis(30), move || {
            f.fetch_add(1, Ordering::Relaxed);
        });
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 50);

    wheel.stop().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn a_timer_that_crosses_a_wheel_boundary_cascades_correctly() {
    // tick=10ms, wheel_size=8 -> base interval is 80ms; a deadline well past that
    // forces at least one overflow level and a cascade back down on expiry.
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    wheel.after(Duration::from_millis(900), move || {
        f.fetch_add(1, Ordering::Relaxed);
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 1);

    wheel.stop().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn cancelling_a_timer_before_it_fires_prevents_its_callback() {
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let timer = wheel.after(Duration::from_millis(200), move || {
        f.fetch_add(1, Ordering::Relaxed);
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(timer.stop());
    assert!(!timer.stop(), "a second stop() on an already-stopped timer reports false");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 0);

    wheel.stop().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn recurring_schedule_keeps_firing_until_stopped() {
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let scheduler: Arc<dyn Scheduler> = Arc::new(EveryScheduler::new(Duration::from_millis(40)));
    let timer = wheel
        .schedule(scheduler, move || {
            f.fetch_add(1, Ordering::Relaxed);
        })
        .expect("scheduler produces a first deadline");

    tokio::time::sleep(Duration::from_millis(210)).await;
    let before_stop = fired.load(Ordering::Relaxed);
    assert!(before_stop >= 4);

    timer.stop();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::Relaxed), before_stop);

    wheel.stop().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn stopping_the_wheel_leaves_pending_timers_unfired() {
    let wheel = TimingWheel::new(config()).expect("valid config");
    wheel.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    wheel.after(Duration::from_millis(500), move || {
        f.fetch_add(1, Ordering::Relaxed);
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    wheel.stop().await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(fired.load(Ordering::Relaxed), 0);
}
