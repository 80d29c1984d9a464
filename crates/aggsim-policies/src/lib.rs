//! GC placement policies for aggsim.
//!
//! This crate provides the [`DelayPolicy`] trait and the built-in placement
//! schedules for in-network coalescing:
//!
//! | Code | Policy | Scope | Delay at level `l` |
//! |------|--------|-------|--------------------|
//! | 0 | [`Passthrough`] | nowhere | - |
//! | 1 | [`FlatAll`] | all hubs | `D / L` |
//! | 2 | [`RootHeavyAll`] | all hubs | `D · (L-l) / tri(L)` |
//! | 3 | [`LeafHeavyAll`] | all hubs | `D · (l+1) / tri(L)` |
//! | 4 | [`FlatTop`] | top `k` levels | `D / k` |
//! | 5 | [`RootHeavyTop`] | top `k` levels | `D · (k-l) / tri(k)` |
//! | 6 | [`LeafHeavyTop`] | top `k` levels | `D · (l+1) / tri(k)` |
//!
//! `D` is the total delay budget in ticks, `L` the number of hub levels of
//! the tree, `k = min(L, top_levels)`, and `tri(n) = n(n+1)/2`. All delays
//! are rounded to whole ticks when the policy is applied.

pub mod flat;
pub mod leaf_heavy;
pub mod passthrough;
pub mod root_heavy;
pub mod traits;

pub use flat::{FlatAll, FlatTop};
pub use leaf_heavy::{LeafHeavyAll, LeafHeavyTop};
pub use passthrough::Passthrough;
pub use root_heavy::{RootHeavyAll, RootHeavyTop};
pub use traits::*;

/// Create a delay policy from its numeric selector.
///
/// `budget` is the total delay budget `D` in ticks; `top_levels` bounds the
/// coalescing band for the top-`k` policies and is ignored by the others.
pub fn policy_by_code(code: u32, budget: i64, top_levels: u32) -> Option<Box<dyn DelayPolicy>> {
    match code {
        0 => Some(Box::new(Passthrough)),
        1 => Some(Box::new(FlatAll::new(budget))),
        2 => Some(Box::new(RootHeavyAll::new(budget))),
        3 => Some(Box::new(LeafHeavyAll::new(budget))),
        4 => Some(Box::new(FlatTop::new(budget, top_levels))),
        5 => Some(Box::new(RootHeavyTop::new(budget, top_levels))),
        6 => Some(Box::new(LeafHeavyTop::new(budget, top_levels))),
        _ => None,
    }
}

/// List all built-in policy selectors with their names.
pub fn available_policies() -> Vec<(u32, &'static str)> {
    vec![
        (0, "passthrough"),
        (1, "flat_all"),
        (2, "root_heavy_all"),
        (3, "leaf_heavy_all"),
        (4, "flat_top"),
        (5, "root_heavy_top"),
        (6, "leaf_heavy_top"),
    ]
}
