//! # Clock
//!
//! Source of enqueue timestamps. Threads of equal effective priority leave a
//! resource queue in the order they started waiting on it.

use core::sync::atomic::{AtomicU64, Ordering};

/// Monotonic time source
pub trait Clock {
    /// Current time in ticks
    fn now(&self) -> u64;
}

/// Logical clock advancing by one tick per reading
#[derive(Debug, Default)]
pub struct TickClock {
    ticks: AtomicU64,
}

impl TickClock {
    /// Create a clock starting at tick 0
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock stopped at `start`
    pub const fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `ticks`
    pub fn advance(&self, ticks: u64) {
        self.now.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Jump to `now`
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_clock_monotonic() {
        let clock = TickClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b > a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.now(), 100);

        clock.advance(5);
        assert_eq!(clock.now(), 105);

        clock.set(7);
        assert_eq!(clock.now(), 7);
    }
}
