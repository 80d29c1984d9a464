//! Virtual clock for the tick-driven simulation.
//!
//! Time is an integer tick counter, advanced once per simulated tick; a
//! configurable number of ticks makes up one simulated second. The clock has
//! no relation to wall-clock time, which keeps runs deterministic regardless
//! of host speed.

use serde::{Deserialize, Serialize};

/// Integer tick clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickClock {
    tick: i64,
    ticks_per_second: i64,
}

impl TickClock {
    /// Create a clock at tick zero.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_second` is not positive.
    pub fn new(ticks_per_second: i64) -> Self {
        assert!(ticks_per_second > 0, "ticks_per_second must be positive");
        Self {
            tick: 0,
            ticks_per_second,
        }
    }

    /// The current tick.
    pub fn now(&self) -> i64 {
        self.tick
    }

    pub fn ticks_per_second(&self) -> i64 {
        self.ticks_per_second
    }

    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Whether the clock sits exactly on a second boundary (and is past
    /// tick zero), i.e. a full second of ticks has just completed.
    pub fn at_second_boundary(&self) -> bool {
        self.tick > 0 && self.tick % self.ticks_per_second == 0
    }

    /// Number of fully completed simulated seconds.
    pub fn completed_seconds(&self) -> i64 {
        self.tick / self.ticks_per_second
    }
}
