//! Root-heavy delay schedules: delay decreases linearly with depth.
//!
//! Hubs near the root see the widest fan-in, so they get the largest share
//! of the delay budget. With `L` coalescing levels a hub at level `l`
//! receives the fraction `(L - l) / (1 + 2 + … + L)` of the budget; the
//! per-path sum of delays equals the budget (up to rounding).

use crate::traits::{split_budget, triangular, DelayPolicy};

/// Every hub coalesces; delay shrinks toward the leaves.
pub struct RootHeavyAll {
    budget: i64,
}

impl RootHeavyAll {
    pub fn new(budget: i64) -> Self {
        Self { budget }
    }
}

impl DelayPolicy for RootHeavyAll {
    fn delay_at(&self, level: u32, levels: u32) -> Option<i64> {
        if levels == 0 {
            return None;
        }
        Some(split_budget(self.budget, levels - level, triangular(levels)))
    }

    fn name(&self) -> &str {
        "root_heavy_all"
    }
}

/// Only the top `k = min(levels, top_levels)` levels coalesce; delay shrinks
/// with distance from the root within that band.
pub struct RootHeavyTop {
    budget: i64,
    top_levels: u32,
}

impl RootHeavyTop {
    pub fn new(budget: i64, top_levels: u32) -> Self {
        Self { budget, top_levels }
    }
}

impl DelayPolicy for RootHeavyTop {
    fn delay_at(&self, level: u32, levels: u32) -> Option<i64> {
        let k = levels.min(self.top_levels);
        if k == 0 || level >= k {
            return None;
        }
        Some(split_budget(self.budget, k - level, triangular(k)))
    }

    fn name(&self) -> &str {
        "root_heavy_top"
    }
}
