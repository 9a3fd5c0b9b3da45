//! Wheel configuration, loadable from TOML or built programmatically.

use crate::error::{WheelError, WheelResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_queue_capacity() -> usize {
    16
}

/// Parameters for a single [`crate::TimingWheel`] instance.
///
/// `tick_ms` is the base wheel's resolution; `wheel_size` is the number of slots per
/// level. Higher levels are derived automatically (tick = `tick_ms * wheel_size^level`)
/// and are never configured directly; as many levels as needed are created lazily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WheelConfig {
    pub tick_ms: u64,
    pub wheel_size: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl WheelConfig {
    pub fn new(tick: Duration, wheel_size: usize) -> WheelResult<Self> {
        let cfg = Self {
            tick_ms: tick.as_millis() as u64,
            wheel_size,
            queue_capacity: default_queue_capacity(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn from_toml_str(input: &str) -> WheelResult<Self> {
        let cfg: Self = toml::from_str(input).map_err(|e| WheelError::InvalidArgument(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> WheelResult<()> {
        if self.tick_ms == 0 {
            return Err(WheelError::InvalidArgument("tick_ms must be >= 1".into()));
        }
        if self.wheel_size == 0 {
            return Err(WheelError::InvalidArgument("wheel_size must be >= 1".into()));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
