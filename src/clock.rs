use std::cell::Cell;

use chrono::Utc;

/// Source of decision timestamps
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Production clock using the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Test clock; returns the stored instant and advances by `step` per read
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<i64>,
    step: i64,
}

impl FixedClock {
    pub fn new(start_ms: i64) -> Self {
        Self::stepping(start_ms, 0)
    }

    pub fn stepping(start_ms: i64, step: i64) -> Self {
        Self {
            now: Cell::new(start_ms),
            step,
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn fixed_clock_steps() {
        let clock = FixedClock::stepping(100, 10);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.now_ms(), 110);
        clock.set(5);
        assert_eq!((&clock).now_ms(), 5);
    }
}
