//! Runs the fully-connected layer accelerator against its fixed-point reference.
//!
//! ```bash
//! # Built-in 3x2 integer layer, then a random layer with the default config
//! cargo run -p fcxcel-examples
//!
//! # MNIST hidden layer with backpressure, logging every cycle
//! RUST_LOG=trace cargo run -p fcxcel-examples -- \
//!   --config fcxcel-examples/configs/mnist_fc.toml --batches 16 --sink-delay 2
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fcxcel::*;
use fcxcel_std::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Parser)]
#[command(name = "fcxcel", version, about = "Simulates the fully-connected layer accelerator")]
struct Cli {
    /// Layer config (TOML). Defaults to 4 batch slots, 3 inputs, 2 outputs and Q4.7.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of random batches
    #[arg(short, long, default_value_t = 4)]
    batches: usize,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Random values are drawn from `-magnitude..=magnitude`
    #[arg(long, default_value_t = 256)]
    magnitude: u16,

    /// Source delay in cycles
    #[arg(long, default_value_t = 0)]
    src_delay: usize,

    /// Sink delay in cycles
    #[arg(long, default_value_t = 0)]
    sink_delay: usize,

    /// Cycle limit per simulation
    #[arg(long, default_value_t = 1_000_000)]
    max_cycles: usize,

    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(short, long)]
    verbose: bool,
}

/// Integer 3x2 layer with two batches: `[1, 2, 3] -> [32, 48]` and `[4, 5, 6] -> [59, 84]`.
fn small_fc() -> Result<TestVector, TestVectorError> {
    TestVector::from_raw(
        FcLayerConfig::new(2, 3, 2).with_frac_bits(0),
        vec![vec![1, 2], vec![3, 4], vec![5, 6]],
        vec![10, 20],
        vec![vec![1, 2, 3], vec![4, 5, 6]],
    )
}

fn simulate(name: &str, tv: &TestVector, cli: &Cli) -> Result<SimStats> {
    let mut dut = FcLayer::new(tv.config)?;
    let mut src = StreamSource::new(tv.input_msgs(), cli.src_delay + 3, cli.src_delay);
    let mut sink = StreamSink::new(tv.output_msgs(), cli.sink_delay + 3, cli.sink_delay);
    let stats = run_sim(&mut dut, &mut src, &mut sink, cli.max_cycles).with_context(|| format!("{} failed", name))?;
    log::info!("{}: passed, {}", name, stats);
    Ok(stats)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level)).init();

    let _ = simulate("small_fc", &small_fc()?, &cli)?;

    let config = match &cli.config {
        Some(path) => FcLayerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FcLayerConfig::default(),
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!(
        "random layer: {} batch slots, {} -> {} channels, {} fraction bits ({:?}), seed {}",
        config.batch_size,
        config.input_channel,
        config.output_channel,
        config.frac_bits,
        config.rounding,
        seed
    );

    let magnitude = i64::from(cli.magnitude);
    let tv = TestVector::random(config, cli.batches, -magnitude..=magnitude, &mut StdRng::seed_from_u64(seed))?;
    let stats = simulate("random", &tv, &cli)?;

    let outputs = tv.expected();
    if let Some(first) = outputs.first() {
        let values = first.iter().map(|&y| OutputValue::new(y).to_f32(config.frac_bits)).collect::<Vec<_>>();
        log::info!("batch 0 outputs: {:?}", values);
    }
    log::info!(
        "throughput: {:.3} inputs/cycle, {:.3} outputs/cycle",
        stats.transfers_in as f64 / stats.cycles.max(1) as f64,
        stats.transfers_out as f64 / stats.cycles.max(1) as f64
    );
    Ok(())
}
