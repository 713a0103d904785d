//! Time source for throttle windows and session cache ages

use std::fmt::Debug;
use std::time::Instant;

/// Monotonic clock used by the gate.
///
/// Production code uses [`SystemClock`]; tests drive time explicitly with
/// [`crate::testing::ManualClock`].
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
