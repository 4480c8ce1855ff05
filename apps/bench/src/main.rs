//! tessera-bench: probe the host, resolve the add kernel and report.
//!
//! Subcommands:
//! - profile: hardware report (or JSON)
//! - bandwidth: memory read bandwidth estimate
//! - bench: dispatched array-add benchmark
//! - advise: blocking and threading advice
//!
//! With no subcommand all four run in that order.

mod logging;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tessera_hwprof::{
    advise, estimate_with, Bandwidth, BandwidthConfig, BlockingAdvice, HardwareProfile,
    ProfileReport, Shortfall, ThreadAdvice,
};
use tracing::info;

const RULE: &str = "====================================================";

#[derive(Parser)]
#[command(name = "tessera-bench")]
#[command(about = "Hardware-driven kernel dispatch: probe, bandwidth, benchmark, advice", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hardware profile
    Profile {
        /// Emit JSON (profile plus fingerprint) instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Estimate sustained memory read bandwidth
    Bandwidth {
        /// Buffer size in MB
        #[arg(long, default_value = "128")]
        buffer_mb: usize,

        /// Read passes over the buffer
        #[arg(long, default_value = "10")]
        passes: u32,
    },

    /// Benchmark the dispatched array-add kernel
    Bench {
        /// Elements per array
        #[arg(short, long, default_value = "10000000")]
        size: usize,

        /// Timed runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Cache blocking and threading advice for matrix work
    Advise,
}

#[derive(Serialize)]
struct ProfileJson<'a> {
    fingerprint: String,
    profile: &'a HardwareProfile,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let profile = tessera_hwprof::detect();

    match cli.command {
        Some(Commands::Profile { json }) => cmd_profile(&profile, json),
        Some(Commands::Bandwidth { buffer_mb, passes }) => {
            cmd_bandwidth(&profile, buffer_mb, passes);
            Ok(())
        }
        Some(Commands::Bench { size, runs }) => cmd_bench(&profile, size, runs),
        Some(Commands::Advise) => {
            cmd_advise(&advise(&profile));
            Ok(())
        }
        None => {
            println!("{RULE}");
            println!("     HARDWARE DETECTION FOR ARRAY OPTIMIZATION");
            println!("{RULE}\n");
            cmd_profile(&profile, false)?;
            let defaults = BandwidthConfig::default();
            cmd_bandwidth(
                &profile,
                defaults.buffer_bytes / (1024 * 1024),
                defaults.passes,
            );
            cmd_bench(&profile, 10_000_000, 5)?;
            cmd_advise(&advise(&profile));
            println!("\n{RULE}");
            println!("Hardware detection completed successfully!");
            println!("{RULE}");
            Ok(())
        }
    }
}

fn cmd_profile(profile: &HardwareProfile, json: bool) -> Result<()> {
    if json {
        let out = ProfileJson {
            fingerprint: profile.fingerprint(),
            profile,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("serialize profile")?
        );
    } else {
        println!("{}", ProfileReport::new(profile));
    }
    Ok(())
}

fn cmd_bandwidth(profile: &HardwareProfile, buffer_mb: usize, passes: u32) {
    println!("\n=== MEMORY BANDWIDTH TEST ===");
    let cfg = BandwidthConfig {
        buffer_bytes: buffer_mb.saturating_mul(1024 * 1024),
        passes,
        ..Default::default()
    };
    match estimate_with(profile, &cfg) {
        Bandwidth::MbPerSec(mbps) => println!(
            "Estimated memory bandwidth: {mbps:.2} MB/s ({:.2} GB/s)",
            mbps / 1024.0
        ),
        Bandwidth::Insufficient(why) => {
            let reason = match why {
                Shortfall::LowMemory { total_ram_mb } => {
                    format!("only {total_ram_mb} MB of RAM")
                }
                Shortfall::AllocationFailed => "buffer allocation failed".into(),
                Shortfall::ZeroElapsed => "timer resolution too coarse".into(),
            };
            println!("Could not estimate memory bandwidth ({reason})");
        }
    }
}

fn cmd_bench(profile: &HardwareProfile, size: usize, runs: u32) -> Result<()> {
    let dispatcher = tessera_dispatch::init(profile);
    let kernel = dispatcher.kernel()?;

    println!("\n=== SELECTED IMPLEMENTATIONS ===");
    println!("Array addition: {} implementation", kernel.name());

    println!("\n=== BENCHMARK: ARRAY ADDITION ===");
    let a: Vec<f32> = (0..size).map(|i| i as f32).collect();
    let b: Vec<f32> = (0..size).map(|i| (i * 2) as f32).collect();
    let mut c = vec![0.0f32; size];

    println!("Running array addition benchmark ({size} elements, {runs} runs)...");
    // equal lengths by construction; time the raw entry point
    let add = kernel.entry();
    let start = Instant::now();
    for _ in 0..runs {
        add(&a, &b, &mut c);
    }
    let secs = start.elapsed().as_secs_f64();

    println!("Time: {secs:.4} seconds");
    if secs > 0.0 {
        let rate = (size as f64 * f64::from(runs)) / (secs * 1_000_000.0);
        println!("Performance: {rate:.2} million elements/second");
    }
    info!(kernel = kernel.name(), size, runs, secs, "array add benchmark");

    match verify(&a, &b, &c) {
        None => println!("Verification: PASSED"),
        Some((idx, want, got)) => {
            println!("Verification: Error at index {idx}: expected {want:.2}, got {got:.2}")
        }
    }
    Ok(())
}

/// Checks 100 evenly spaced samples; returns the first mismatch.
fn verify(a: &[f32], b: &[f32], c: &[f32]) -> Option<(usize, f32, f32)> {
    if c.is_empty() {
        return None;
    }
    let step = (c.len() / 100).max(1);
    (0..100)
        .map(|i| i * step)
        .take_while(|&idx| idx < c.len())
        .find(|&idx| c[idx] != a[idx] + b[idx])
        .map(|idx| (idx, a[idx] + b[idx], c[idx]))
}

fn cmd_advise(advice: &BlockingAdvice) {
    println!("\n=== MATRIX OPERATION RECOMMENDATIONS ===");
    match advice.blocks {
        Some(blocks) => {
            println!("For matrix operations (multiplication, etc.):");
            println!("- L1 optimal block size: {0} x {0}", blocks.l1);
            println!("- L2 optimal block size: {0} x {0}", blocks.l2);
            if !blocks.aligned {
                println!("  (not aligned to cache lines)");
            }
        }
        None => println!("Cache information not available for optimal blocking."),
    }

    println!("\nFor parallelizing matrix operations:");
    match advice.threads {
        ThreadAdvice::Split {
            compute_bound,
            memory_bound,
        } => {
            println!("- Use {compute_bound} threads for compute-bound work");
            println!("- Use {memory_bound} threads (physical cores) for memory-bound work");
        }
        ThreadAdvice::Pooled(n) => println!("- Use a pool of {n} threads"),
        ThreadAdvice::Serial { logical } => {
            println!("- Limited thread parallelism available ({logical} cores)")
        }
    }

    if advice.gpu_offload {
        println!(
            "- For large matrices (>{0}x{0}), consider using GPU acceleration",
            tessera_hwprof::advice::GPU_OFFLOAD_MIN_EDGE
        );
    }
}
