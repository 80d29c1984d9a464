//! Per-second statistics and run totals.
//!
//! Every node carries a set of rolling byte counters that accumulate within
//! the current simulated second and are cleared after each summary. The
//! driver folds them into a [`SecondSummary`] per second and a [`RunTotals`]
//! at the end of the run; the latter carries the weight-conservation check.

use serde::{Deserialize, Serialize};

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Rolling per-second byte counters of one node.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingCounters {
    /// Bytes admitted from the inbox.
    pub in_bytes: i64,
    /// Bytes emitted over the uplink (root absorption included).
    pub out_bytes: i64,
    /// Emitted bytes weighted by effective size.
    pub eff_out_bytes: i64,
    /// Bytes generated by this node itself.
    pub self_bytes: i64,
    /// Bytes suppressed by coalescing.
    pub saved_bytes: i64,
}

impl RollingCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One hub's numbers within a per-second summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSample {
    pub node: usize,
    /// Subtree plus self input, MB.
    pub in_mb: f64,
    /// Uplink output, MB.
    pub out_mb: f64,
    /// Effective (weight-expanded) output, MB.
    pub eff_out_mb: f64,
    /// Inbound cap usage, percent.
    pub in_pct: f64,
    /// Outbound cap usage, percent.
    pub out_pct: f64,
}

impl HubSample {
    /// Build a sample from a node's rolling counters and its per-second
    /// byte capacities.
    pub fn from_counters(
        node: usize,
        counters: &RollingCounters,
        in_cap_per_sec: i64,
        out_cap_per_sec: i64,
    ) -> Self {
        Self {
            node,
            in_mb: (counters.in_bytes + counters.self_bytes) as f64 / BYTES_PER_MB,
            out_mb: counters.out_bytes as f64 / BYTES_PER_MB,
            eff_out_mb: counters.eff_out_bytes as f64 / BYTES_PER_MB,
            in_pct: percentage(counters.in_bytes, in_cap_per_sec),
            out_pct: percentage(counters.out_bytes, out_cap_per_sec),
        }
    }
}

fn percentage(used: i64, cap: i64) -> f64 {
    if cap <= 0 {
        return 0.0;
    }
    used as f64 / cap as f64 * 100.0
}

/// Summary emitted at each second boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondSummary {
    /// Completed simulated seconds.
    pub second: i64,
    pub hubs: Vec<HubSample>,
    /// Run-to-date generated bytes.
    pub generated_bytes: i64,
    /// Run-to-date saved bytes.
    pub saved_bytes: i64,
}

/// Final totals of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTotals {
    pub ticks_run: i64,
    /// Bytes generated across all nodes.
    pub generated_bytes: i64,
    /// Bytes suppressed by coalescing.
    pub saved_bytes: i64,
    /// Effective bytes absorbed at tree roots.
    pub root_eff_out_bytes: i64,
    /// Effective bytes still resident in buffers and inboxes.
    pub residual_bytes: i64,
}

impl RunTotals {
    /// Weight conservation: every generated original is accounted for by
    /// the effective weight absorbed at roots or still in flight. Folded
    /// duplicates are not a separate term; their weight travels inside the
    /// surviving message's effective size, so `saved_bytes` measures link
    /// bytes avoided, not weight removed.
    pub fn conserved(&self) -> bool {
        self.generated_bytes == self.root_eff_out_bytes + self.residual_bytes
    }
}

/// Format a per-second summary as a single log line.
pub fn format_summary(summary: &SecondSummary) -> String {
    let mut line = format!("t={}s", summary.second);
    for hub in &summary.hubs {
        line.push_str(&format!(
            " | hub {}: in={:.2}MB out={:.2}MB eff={:.2}MB in%={:.1} out%={:.1}",
            hub.node, hub.in_mb, hub.out_mb, hub.eff_out_mb, hub.in_pct, hub.out_pct
        ));
    }
    line.push_str(&format!(
        " | generated={}B saved={}B",
        summary.generated_bytes, summary.saved_bytes
    ));
    line
}

/// Format run totals as a closing table.
pub fn format_totals(totals: &RunTotals) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{:=<60}\n", "  Run Totals  "));
    out.push_str(&format!("  Ticks run:          {}\n", totals.ticks_run));
    out.push_str(&format!(
        "  Generated:          {:.2} MB\n",
        totals.generated_bytes as f64 / BYTES_PER_MB
    ));
    out.push_str(&format!(
        "  Saved by GC:        {:.2} MB ({:.1}%)\n",
        totals.saved_bytes as f64 / BYTES_PER_MB,
        percentage(totals.saved_bytes, totals.generated_bytes)
    ));
    out.push_str(&format!(
        "  Absorbed at roots:  {:.2} MB\n",
        totals.root_eff_out_bytes as f64 / BYTES_PER_MB
    ));
    out.push_str(&format!(
        "  Still in flight:    {:.2} MB\n",
        totals.residual_bytes as f64 / BYTES_PER_MB
    ));
    out.push_str(&format!("{:=<60}\n", ""));
    out
}
