//! aggsim: discrete-tick simulator for in-network aggregation GC.
//!
//! A population of nodes, grouped into racks, forms one or more fan-in
//! trees rooted at a designated hub. Every node steadily generates keyed
//! messages that are relayed upward under per-tick bandwidth caps; selected
//! hubs opportunistically coalesce duplicate keys in their staging buffers,
//! trading forwarding delay for uplink bandwidth. Placement and delay
//! schedules come from `aggsim-policies`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │   Key    │────▶│   Tick    │────▶│  Per-second  │
//! │  Source  │     │  Driver   │     │  Summaries   │
//! └──────────┘     └─────┬─────┘     └──────────────┘
//!                        │
//!                ┌───────┴───────┐
//!                │  Delay Policy │
//!                │  (placement)  │
//!                └───────┬───────┘
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │  Node 0  │  │  Node 1  │  │  Node N  │
//!    │  inbox   │  │  inbox   │  │  inbox   │
//!    │  bufs    │  │  bufs    │  │  bufs    │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod keysource;
pub mod message;
pub mod node;
pub mod stats;
pub mod tree;

// Re-export key types for convenience.
pub use clock::TickClock;
pub use config::{ConfigError, SimConfig};
pub use engine::{EngineError, SimEngine};
pub use keysource::{FileKeySource, KeySource, KeySourceError, SyntheticKeySource};
pub use message::{Message, MessageKind};
pub use node::Node;
pub use stats::{RunTotals, SecondSummary};
pub use tree::TreePlan;

use std::sync::Arc;

/// Run a complete simulation, collecting per-second summaries in memory.
pub fn run_simulation(
    config: SimConfig,
    keys: Arc<dyn KeySource>,
) -> Result<(RunTotals, Vec<SecondSummary>), EngineError> {
    let mut engine = SimEngine::new(config, keys)?;
    let (totals, summaries) = engine.run()?;
    Ok((totals, summaries))
}
