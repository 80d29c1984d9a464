//! Flat delay schedules: the budget is split evenly across coalescing levels.
//!
//! [`FlatAll`] places GC on every hub level; [`FlatTop`] restricts it to the
//! `k` levels closest to the root, where most of the fan-in converges.

use crate::traits::{split_budget, DelayPolicy};

/// Every hub coalesces; each level gets `budget / levels` ticks of delay.
pub struct FlatAll {
    budget: i64,
}

impl FlatAll {
    pub fn new(budget: i64) -> Self {
        Self { budget }
    }
}

impl DelayPolicy for FlatAll {
    fn delay_at(&self, _level: u32, levels: u32) -> Option<i64> {
        if levels == 0 {
            return None;
        }
        Some(split_budget(self.budget, 1, levels))
    }

    fn name(&self) -> &str {
        "flat_all"
    }
}

/// Only the top `k = min(levels, top_levels)` levels coalesce, each with
/// `budget / k` ticks of delay.
pub struct FlatTop {
    budget: i64,
    top_levels: u32,
}

impl FlatTop {
    pub fn new(budget: i64, top_levels: u32) -> Self {
        Self { budget, top_levels }
    }
}

impl DelayPolicy for FlatTop {
    fn delay_at(&self, level: u32, levels: u32) -> Option<i64> {
        let k = levels.min(self.top_levels);
        if k == 0 || level >= k {
            return None;
        }
        Some(split_budget(self.budget, 1, k))
    }

    fn name(&self) -> &str {
        "flat_top"
    }
}
