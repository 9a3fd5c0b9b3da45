//! Hierarchical timing wheel for millisecond-resolution one-shot and recurring timers.
//!
//! Three coupled subsystems make this work: an indexable priority queue of *buckets*
//! (not timers), a single-consumer delay queue that only wakes when a bucket is
//! actually due, and a chain of wheels at geometrically increasing resolutions that
//! cascade timers toward the base wheel as their deadline approaches. See
//! `SPEC_FULL.md` in the repository root for the full design and its testable
//! properties.
//!
//! ```no_run
//! use hwheel::{TimingWheel, WheelConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(10), 256).unwrap()).unwrap();
//! wheel.start();
//! wheel.after(Duration::from_secs(1), || println!("fired"));
//! # wheel.stop().await;
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod bucket;
pub mod clock;
pub mod config;
pub mod delay_queue;
pub mod driver;
pub mod error;
pub mod pqueue;
pub mod scheduler;
pub mod timer;
pub mod util;
pub mod wheel;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::ManualClock;
pub use config::WheelConfig;
pub use driver::TimingWheel;
pub use error::{WheelError, WheelResult};
pub use scheduler::{CountedScheduler, EveryScheduler, Scheduler};
pub use timer::Timer;
