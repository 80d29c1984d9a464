//! Aggregation tree construction.
//!
//! Racks are laid out in level order and linked with the configured fanout;
//! every non-hub node parents to its rack hub in every tree. In multi-tree
//! mode the layout of tree `t > 0` swaps its first `ninternals` entries with
//! the block starting at `t * ninternals`, which makes the internal hubs of
//! different trees disjoint as long as `K * ninternals <= nracks`; the
//! builder rejects layouts where that does not hold.

use crate::config::{ConfigError, SimConfig};
use aggsim_policies::DelayPolicy;

/// Per-node, per-tree linkage produced by the builder.
#[derive(Debug, Clone, Default)]
pub struct TreeLink {
    /// Parent node id; `None` marks the tree root.
    pub parent: Option<usize>,
    /// Hub level in this tree (root is 0); `None` for non-hub rack members.
    pub level: Option<u32>,
    /// Whether this node coalesces on this tree.
    pub gc: bool,
    /// Extra forwarding delay in ticks applied on admission when `gc` holds.
    pub gc_delay: i64,
}

/// The complete aggregation plan: `K` trees over the rack layout.
#[derive(Debug, Clone)]
pub struct TreePlan {
    pub ntrees: usize,
    /// Hub levels per tree.
    pub levels: u32,
    /// `links[node][tree]`.
    pub links: Vec<Vec<TreeLink>>,
    /// Level-order hub layout per tree.
    pub layouts: Vec<Vec<usize>>,
}

impl TreePlan {
    /// Root node of a tree.
    pub fn root(&self, tree: usize) -> usize {
        self.layouts[tree][0]
    }

    /// Whether a node is the root of at least one tree.
    pub fn is_root(&self, node: usize) -> bool {
        (0..self.ntrees).any(|t| self.root(t) == node)
    }

    /// Hubs with at least one child hub in the given tree.
    pub fn internal_nodes(&self, tree: usize) -> Vec<usize> {
        let mut internal: Vec<usize> = self
            .layouts[tree]
            .iter()
            .filter(|&&hub| {
                self.layouts[tree]
                    .iter()
                    .any(|&other| self.links[other][tree].parent == Some(hub))
            })
            .copied()
            .collect();
        internal.sort_unstable();
        internal
    }
}

/// Number of racks with at least one child in a level-order tree of
/// `racks` racks with the given fanout.
pub fn internal_count(fanout: usize, racks: usize) -> usize {
    let mut sum = 0usize;
    let mut width = 1usize;
    while sum + width < racks {
        sum += width;
        width *= fanout;
    }
    let remainder = racks - sum;
    racks - (remainder + width / fanout - remainder.div_ceil(fanout))
}

/// Number of hub levels in a level-order tree of `racks` racks.
///
/// Computed by coverage rather than the closed-form logarithm, which is
/// undefined for fanout 1 (chains).
pub fn levels(fanout: usize, racks: usize) -> u32 {
    let mut covered = 0usize;
    let mut width = 1usize;
    let mut count = 0u32;
    while covered < racks {
        covered += width;
        width *= fanout;
        count += 1;
    }
    count
}

/// Build the aggregation plan for a configuration, assigning GC placement
/// from the policy.
pub fn build(config: &SimConfig, policy: &dyn DelayPolicy) -> Result<TreePlan, ConfigError> {
    let racks = config.nracks;
    let per_rack = config.nodes_per_rack;
    let fanout = config.fanout;
    let ntrees = config.ntrees();
    let total = config.total_nodes();

    let ninternals = internal_count(fanout, racks);
    if ntrees > 1 && ntrees * ninternals > racks {
        return Err(ConfigError::Validation(format!(
            "multi-tree layout needs {} trees x {} internal racks but only {} racks exist",
            ntrees, ninternals, racks
        )));
    }

    let nlevels = levels(fanout, racks);
    let mut links = vec![vec![TreeLink::default(); ntrees]; total];
    let mut layouts = Vec::with_capacity(ntrees);

    for t in 0..ntrees {
        let mut layout: Vec<usize> = (0..racks).map(|j| j * per_rack).collect();
        if t > 0 {
            for j in 0..ninternals {
                layout.swap(j, j + t * ninternals);
            }
        }

        links[layout[0]][t].parent = None;
        links[layout[0]][t].level = Some(0);

        // Two-pointer level-order linking of rack hubs.
        let mut lo = 0;
        let mut hi = 1;
        let mut cnt = 0;
        while hi < racks {
            let parent = layout[lo];
            let child = layout[hi];
            let parent_level = links[parent][t].level;
            links[child][t].parent = Some(parent);
            links[child][t].level = parent_level.map(|l| l + 1);
            hi += 1;
            cnt += 1;
            if cnt == fanout {
                cnt = 0;
                lo += 1;
            }
        }

        // Non-hub rack members parent to their hub and stay off the
        // inter-rack topology.
        for rack in 0..racks {
            let hub = rack * per_rack;
            for member in 1..per_rack {
                links[hub + member][t].parent = Some(hub);
            }
        }

        // GC placement: hubs only, by level.
        for rack in 0..racks {
            let hub = rack * per_rack;
            if let Some(level) = links[hub][t].level {
                if let Some(delay) = policy.delay_at(level, nlevels) {
                    links[hub][t].gc = true;
                    links[hub][t].gc_delay = delay;
                }
            }
        }

        layouts.push(layout);
    }

    Ok(TreePlan {
        ntrees,
        levels: nlevels,
        links,
        layouts,
    })
}
