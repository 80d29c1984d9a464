//! Simulation configuration and validation.
//!
//! [`SimConfig`] collects every experiment and system parameter of a run.
//! Bandwidth limits are given per second and divided by the tick rate into
//! per-tick budgets; root-specific limits are optional and fall back to the
//! common ones.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Validation(String),
    #[error("unknown GC policy code {0} (expected 0..=6)")]
    UnknownPolicy(u32),
}

/// Complete configuration of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of racks.
    pub nracks: usize,
    /// Nodes per rack; the first node of each rack is its hub.
    pub nodes_per_rack: usize,
    /// Fanout of the rack-level trees.
    pub fanout: usize,
    /// Build `max(2, fanout-1)` trees with disjoint internal hubs instead of one.
    pub multitree: bool,
    /// Messages generated per second per node.
    pub msg_rate: i64,
    /// Message size in bytes (bandwidth accounting only).
    pub msg_size: i64,
    /// GC placement policy selector (0..=6).
    pub gc_policy: u32,
    /// Ticks between coalescing passes.
    pub gc_period: i64,
    /// Coalescing band depth `k` for the top-k policies.
    pub gc_levels: u32,
    /// Total delay budget `D` in ticks.
    pub gc_acc_delay: i64,
    /// Inbound bandwidth limit per node, bytes per second.
    pub in_limit: i64,
    /// Outbound bandwidth limit per node, bytes per second.
    pub out_limit: i64,
    /// Root inbound limit; defaults to `in_limit` when absent.
    pub in_limit_root: Option<i64>,
    /// Root outbound limit; defaults to `out_limit` when absent.
    pub out_limit_root: Option<i64>,
    /// Simulated duration in seconds.
    pub duration: i64,
    /// Ticks per simulated second.
    pub ticks: i64,
    /// Worker threads for the per-tick node sweep.
    pub nthreads: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nracks: 1,
            nodes_per_rack: 1,
            fanout: 2,
            multitree: false,
            msg_rate: 4000,
            msg_size: 32,
            gc_policy: 0,
            gc_period: 10,
            gc_levels: 10,
            gc_acc_delay: 100,
            in_limit: 125_000_000,
            out_limit: 125_000_000,
            in_limit_root: None,
            out_limit_root: None,
            duration: 60,
            ticks: 1000,
            nthreads: 1,
        }
    }
}

impl SimConfig {
    /// Validate configuration consistency.
    ///
    /// Topology constraints that depend on the tree shape (multi-tree
    /// internal disjointness) are checked by the tree builder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nracks == 0 {
            return Err(ConfigError::Validation("nracks must be > 0".to_string()));
        }
        if self.nodes_per_rack == 0 {
            return Err(ConfigError::Validation(
                "nodes_per_rack must be > 0".to_string(),
            ));
        }
        if self.fanout == 0 {
            return Err(ConfigError::Validation("fanout must be > 0".to_string()));
        }
        if self.msg_rate < 0 {
            return Err(ConfigError::Validation("msg_rate must be >= 0".to_string()));
        }
        if self.msg_size <= 0 {
            return Err(ConfigError::Validation("msg_size must be > 0".to_string()));
        }
        if self.gc_policy > 6 {
            return Err(ConfigError::UnknownPolicy(self.gc_policy));
        }
        if self.gc_period <= 0 {
            return Err(ConfigError::Validation("gc_period must be > 0".to_string()));
        }
        if self.gc_acc_delay < 0 {
            return Err(ConfigError::Validation(
                "gc_acc_delay must be >= 0".to_string(),
            ));
        }
        if self.in_limit <= 0 || self.out_limit <= 0 {
            return Err(ConfigError::Validation(
                "bandwidth limits must be > 0".to_string(),
            ));
        }
        if self.duration <= 0 {
            return Err(ConfigError::Validation("duration must be > 0".to_string()));
        }
        if self.ticks <= 0 {
            return Err(ConfigError::Validation("ticks must be > 0".to_string()));
        }
        if self.nthreads == 0 {
            return Err(ConfigError::Validation("nthreads must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn total_nodes(&self) -> usize {
        self.nracks * self.nodes_per_rack
    }

    /// Number of aggregation trees.
    pub fn ntrees(&self) -> usize {
        if self.multitree {
            self.fanout.saturating_sub(1).max(2)
        } else {
            1
        }
    }

    /// Messages each node generates per tick (integer division; a rate
    /// below the tick rate yields zero generation).
    pub fn msgs_per_tick(&self) -> i64 {
        self.msg_rate / self.ticks
    }

    /// Per-tick inbound byte budget of a non-root node.
    pub fn in_cap(&self) -> i64 {
        self.in_limit / self.ticks
    }

    /// Per-tick outbound byte budget of a non-root node.
    pub fn out_cap(&self) -> i64 {
        self.out_limit / self.ticks
    }

    /// Per-tick inbound byte budget of a tree root.
    pub fn root_in_cap(&self) -> i64 {
        self.in_limit_root.unwrap_or(self.in_limit) / self.ticks
    }

    /// Per-tick outbound byte budget of a tree root.
    pub fn root_out_cap(&self) -> i64 {
        self.out_limit_root.unwrap_or(self.out_limit) / self.ticks
    }

    /// Total number of ticks in the run.
    pub fn ticks_total(&self) -> i64 {
        self.duration * self.ticks
    }
}
