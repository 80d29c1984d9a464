//! The tick driver.
//!
//! Ticks execute strictly sequentially. Within a tick the driver first
//! stages generation keys for every node in node-index order (the single
//! place the shared key source is touched, which keeps key consumption in
//! file order and independent of the worker count), then fans the
//! admit/generate/coalesce sweep over contiguous node ranges on a worker
//! pool, and finally runs the emit sweep single-threaded because it writes
//! into other nodes' inboxes. At each second boundary a summary is pushed
//! through the caller's sink and the rolling counters are cleared.

use crate::clock::TickClock;
use crate::config::{ConfigError, SimConfig};
use crate::keysource::{KeySource, KeySourceError};
use crate::node::Node;
use crate::stats::{HubSample, RunTotals, SecondSummary};
use crate::tree::{self, TreePlan};
use aggsim_policies::policy_by_code;
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Keys(#[from] KeySourceError),
}

/// The simulation engine: all nodes, the tree plan, and the clock.
pub struct SimEngine {
    config: SimConfig,
    clock: TickClock,
    nodes: Vec<Node>,
    plan: TreePlan,
    keys: Arc<dyn KeySource>,
    pool: rayon::ThreadPool,
    generated_bytes: i64,
    saved_bytes: i64,
}

impl SimEngine {
    /// Validate the configuration, build the trees, and lay out the nodes.
    pub fn new(config: SimConfig, keys: Arc<dyn KeySource>) -> Result<Self, ConfigError> {
        config.validate()?;

        let policy = policy_by_code(config.gc_policy, config.gc_acc_delay, config.gc_levels)
            .ok_or(ConfigError::UnknownPolicy(config.gc_policy))?;
        let plan = tree::build(&config, policy.as_ref())?;

        let msgs_per_tick = config.msgs_per_tick();
        let ntrees = config.ntrees();
        let nodes = (0..config.total_nodes())
            .map(|id| {
                let (in_cap, out_cap) = if plan.is_root(id) {
                    (config.root_in_cap(), config.root_out_cap())
                } else {
                    (config.in_cap(), config.out_cap())
                };
                let mut node = Node::new(id, ntrees, in_cap, out_cap, msgs_per_tick);
                node.apply_links(&plan.links[id]);
                node
            })
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.nthreads)
            .build()
            .map_err(|e| ConfigError::Validation(format!("failed to build worker pool: {e}")))?;

        Ok(Self {
            clock: TickClock::new(config.ticks),
            nodes,
            plan,
            keys,
            pool,
            generated_bytes: 0,
            saved_bytes: 0,
            config,
        })
    }

    /// Run to completion, pushing each per-second summary through `sink`.
    pub fn run_with<F>(&mut self, mut sink: F) -> Result<RunTotals, KeySourceError>
    where
        F: FnMut(&SecondSummary),
    {
        let total_ticks = self.config.ticks_total();
        let msg_size = self.config.msg_size;
        let gc_period = self.config.gc_period;

        while self.clock.now() < total_ticks {
            let tick = self.clock.now();
            self.stage_keys()?;
            self.first_sweep_parallel(tick, msg_size, gc_period);
            self.emit_sweep(tick, msg_size);
            self.clock.advance();

            if self.clock.at_second_boundary() {
                let summary = self.collect_summary();
                sink(&summary);
                for node in &mut self.nodes {
                    node.counters.reset();
                }
            }
        }

        let totals = self.totals();
        debug_assert!(totals.conserved(), "weight not conserved: {:?}", totals);
        Ok(totals)
    }

    /// Run to completion, collecting summaries in memory.
    pub fn run(&mut self) -> Result<(RunTotals, Vec<SecondSummary>), KeySourceError> {
        let mut summaries = Vec::with_capacity(self.config.duration as usize);
        let totals = self.run_with(|s| summaries.push(s.clone()))?;
        Ok((totals, summaries))
    }

    /// Stage every node's generation keys for this tick, in node-index
    /// order so the stream is consumed deterministically.
    fn stage_keys(&mut self) -> Result<(), KeySourceError> {
        let per_node = self.config.msgs_per_tick();
        for node in &mut self.nodes {
            for _ in 0..per_node {
                node.stage_key(self.keys.next_key()?);
            }
        }
        Ok(())
    }

    /// Steps 1-3 across all nodes, partitioned into contiguous ranges on
    /// the worker pool. Each node is touched by exactly one worker.
    fn first_sweep_parallel(&mut self, tick: i64, msg_size: i64, gc_period: i64) {
        let chunk = self
            .nodes
            .len()
            .div_ceil(self.config.nthreads)
            .max(1);
        self.pool.install(|| {
            self.nodes.par_chunks_mut(chunk).for_each(|range| {
                for node in range {
                    node.first_sweep(tick, msg_size, gc_period);
                }
            });
        });
    }

    /// Step 4 across all nodes, single-threaded; deliveries land in parent
    /// inboxes, which are not drained before the next tick.
    fn emit_sweep(&mut self, tick: i64, msg_size: i64) {
        for i in 0..self.nodes.len() {
            let outgoing = self.nodes[i].emit(tick, msg_size);
            for (parent, msg) in outgoing {
                self.nodes[parent].push_inbound(msg);
            }
        }
    }

    fn collect_summary(&mut self) -> SecondSummary {
        let tps = self.clock.ticks_per_second();
        for node in &self.nodes {
            self.generated_bytes += node.counters.self_bytes;
            self.saved_bytes += node.counters.saved_bytes;
        }
        let hubs = self
            .nodes
            .iter()
            .step_by(self.config.nodes_per_rack)
            .map(|node| {
                HubSample::from_counters(
                    node.id,
                    &node.counters,
                    node.in_cap * tps,
                    node.out_cap * tps,
                )
            })
            .collect();
        SecondSummary {
            second: self.clock.completed_seconds(),
            hubs,
            generated_bytes: self.generated_bytes,
            saved_bytes: self.saved_bytes,
        }
    }

    fn totals(&self) -> RunTotals {
        let msg_size = self.config.msg_size;
        let absorbed: i64 = self.nodes.iter().map(|n| n.absorbed_weight).sum();
        let residual: i64 = self.nodes.iter().map(|n| n.resident_weight()).sum();
        RunTotals {
            ticks_run: self.clock.now(),
            generated_bytes: self.generated_bytes,
            saved_bytes: self.saved_bytes,
            root_eff_out_bytes: absorbed * msg_size,
            residual_bytes: residual * msg_size,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn plan(&self) -> &TreePlan {
        &self.plan
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
