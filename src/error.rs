//! Error types for the timing wheel.

use thiserror::Error;

/// Result type for wheel construction and configuration operations.
pub type WheelResult<T> = Result<T, WheelError>;

/// Errors surfaced synchronously at construction time.
///
/// Internal invariant violations (a bucket back-reference pointing at the wrong
/// bucket, a heap index out of range) are not represented here: per the design,
/// those are bugs, not recoverable conditions, and are caught with `debug_assert!`
/// rather than propagated as a `Result`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WheelError {
    /// `tick <= 0` or `wheel_size == 0` was supplied to [`crate::WheelConfig`].
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The wheel was already stopped; the caller's operation is a no-op.
    #[error("the wheel has already been stopped")]
    AlreadyStopped,
}
