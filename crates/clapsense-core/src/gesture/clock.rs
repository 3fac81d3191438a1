//! Time sources for the clap sequence timer
//!
//! The state machine works on plain microsecond timestamps. A [`Clock`] is
//! read once per processing cycle by whoever drives the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic microsecond clock
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin
    fn now_us(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Wall clock backed by [`Instant`], starting at zero on creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Manually driven clock for tests and replay
///
/// # Example
/// ```
/// use clapsense_core::gesture::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0);
/// clock.advance(250_000);
/// assert_eq!(clock.now_us(), 250_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now: AtomicU64::new(start_us),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::Release);
    }

    /// Move forward by `delta_us`
    pub fn advance(&self, delta_us: u64) {
        self.now.fetch_add(delta_us, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
