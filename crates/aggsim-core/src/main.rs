//! aggsim CLI: measure bandwidth saved by in-network aggregation GC.

use aggsim_core::config::SimConfig;
use aggsim_core::engine::SimEngine;
use aggsim_core::keysource::{self, FileKeySource, KeySource, SyntheticKeySource};
use aggsim_core::stats;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "aggsim",
    about = "Simulate in-network aggregation GC over a rack fabric",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeySourceKind {
    /// Read keys from data-0, data-1, ... under --key-dir.
    File,
    /// Seeded uniform key stream.
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation.
    Run {
        /// Number of racks.
        #[arg(long, default_value_t = 1)]
        nracks: usize,
        /// Nodes per rack.
        #[arg(long, default_value_t = 1)]
        nodes_per_rack: usize,
        /// Fanout of the rack-level trees.
        #[arg(long, default_value_t = 2)]
        fanout: usize,
        /// Build multiple trees with disjoint internal hubs.
        #[arg(long)]
        multitree: bool,
        /// Messages per second per node.
        #[arg(long, default_value_t = 4000)]
        msg_rate: i64,
        /// Message size in bytes.
        #[arg(long, default_value_t = 32)]
        msg_size: i64,
        /// GC placement policy (see list-policies).
        #[arg(long, default_value_t = 0)]
        gc_policy: u32,
        /// Ticks between coalescing passes.
        #[arg(long, default_value_t = 10)]
        gc_period: i64,
        /// Coalescing band depth for the top-k policies.
        #[arg(long, default_value_t = 10)]
        gc_levels: u32,
        /// Total delay budget in ticks.
        #[arg(long, default_value_t = 100)]
        gc_acc_delay: i64,
        /// Inbound bandwidth limit, bytes/sec per node.
        #[arg(long, default_value_t = 125_000_000)]
        in_limit: i64,
        /// Outbound bandwidth limit, bytes/sec per node.
        #[arg(long, default_value_t = 125_000_000)]
        out_limit: i64,
        /// Root inbound limit; defaults to --in-limit.
        #[arg(long)]
        in_limit_root: Option<i64>,
        /// Root outbound limit; defaults to --out-limit.
        #[arg(long)]
        out_limit_root: Option<i64>,
        /// Simulated seconds.
        #[arg(long, default_value_t = 60)]
        duration: i64,
        /// Ticks per simulated second.
        #[arg(long, default_value_t = 1000)]
        ticks: i64,
        /// Worker threads for the node sweep.
        #[arg(long, default_value_t = 1)]
        nthreads: usize,
        /// Directory holding the key files.
        #[arg(long, default_value = ".")]
        key_dir: PathBuf,
        /// Where generation keys come from.
        #[arg(long, value_enum, default_value = "file")]
        key_source: KeySourceKind,
        /// Seed for the synthetic key source.
        #[arg(long, default_value_t = 42)]
        key_seed: u64,
        /// Distinct keys of the synthetic source.
        #[arg(long, default_value_t = 1_000_000)]
        key_space: i64,
        /// Write final run totals as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate synthetic key files (data-0, data-1, ...).
    GenKeys {
        /// Total keys to write.
        #[arg(long, default_value_t = 10_000_000)]
        count: u64,
        /// Distinct key values.
        #[arg(long, default_value_t = 1_000_000)]
        key_space: i64,
        /// Number of files to spread the keys over.
        #[arg(long, default_value_t = 1)]
        files: usize,
        /// Output directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// List GC placement policies.
    ListPolicies,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            nracks,
            nodes_per_rack,
            fanout,
            multitree,
            msg_rate,
            msg_size,
            gc_policy,
            gc_period,
            gc_levels,
            gc_acc_delay,
            in_limit,
            out_limit,
            in_limit_root,
            out_limit_root,
            duration,
            ticks,
            nthreads,
            key_dir,
            key_source,
            key_seed,
            key_space,
            output,
        } => {
            let config = SimConfig {
                nracks,
                nodes_per_rack,
                fanout,
                multitree,
                msg_rate,
                msg_size,
                gc_policy,
                gc_period,
                gc_levels,
                gc_acc_delay,
                in_limit,
                out_limit,
                in_limit_root,
                out_limit_root,
                duration,
                ticks,
                nthreads,
            };

            let keys: Arc<dyn KeySource> = match key_source {
                KeySourceKind::File => {
                    Arc::new(FileKeySource::open(&key_dir).unwrap_or_else(|e| {
                        eprintln!("Error opening key source: {}", e);
                        std::process::exit(1);
                    }))
                }
                KeySourceKind::Synthetic => Arc::new(SyntheticKeySource::new(key_seed, key_space)),
            };

            let mut engine = SimEngine::new(config, keys).unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            log::info!(
                "simulating {} nodes in {} racks, {} tree(s), policy {}, {} thread(s)",
                engine.config().total_nodes(),
                engine.config().nracks,
                engine.plan().ntrees,
                engine.config().gc_policy,
                engine.config().nthreads,
            );

            let totals = engine
                .run_with(|summary| println!("{}", stats::format_summary(summary)))
                .unwrap_or_else(|e| {
                    eprintln!("Error reading keys: {}", e);
                    std::process::exit(1);
                });
            println!("{}", stats::format_totals(&totals));

            if let Some(output_path) = output {
                let json = serde_json::to_string_pretty(&totals).unwrap();
                std::fs::write(&output_path, json).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {}", e);
                    std::process::exit(1);
                });
                println!("Totals written to {}", output_path.display());
            }
        }
        Commands::GenKeys {
            count,
            key_space,
            files,
            dir,
            seed,
        } => {
            let written = keysource::write_key_files(&dir, count, key_space, files, seed)
                .unwrap_or_else(|e| {
                    eprintln!("Error writing key files: {}", e);
                    std::process::exit(1);
                });
            println!(
                "Wrote {} keys across {} file(s) in {}",
                written,
                files.max(1),
                dir.display()
            );
        }
        Commands::ListPolicies => {
            println!("Available GC placement policies:");
            for (code, name) in aggsim_policies::available_policies() {
                println!("  {} - {}", code, name);
            }
        }
    }
}
