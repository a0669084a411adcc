//! warehouse: run the vehicle producer/consumer workload.
//!
//! # Usage
//!
//! ```bash
//! warehouse 3 --capacity 16 --duration-secs 10
//! ```
//!
//! Consumer reports go to stdout, logs to stderr (`RUST_LOG`, default `warn`).
//! The run summary is printed at the end, as JSON with `--json`.

use std::process;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wh_queue::CapacityPolicy;
use wh_warehouse::{DriverConfig, RunSummary, Warehouse};

/// Default queue capacity.
const CAPACITY_DEFAULT: i64 = wh_queue::CAPACITY_DEFAULT as i64;

/// Default pause between pushes of one producer (milliseconds).
const PRODUCE_INTERVAL_MS_DEFAULT: u64 = 500;

/// Default pause after each consumed item (milliseconds).
const CONSUME_INTERVAL_MS_DEFAULT: u64 = 1000;

/// Stock and ship vehicles through a bounded warehouse.
#[derive(Parser, Debug)]
#[command(name = "warehouse")]
#[command(about = "Vehicle warehouse producer/consumer driver")]
struct Cli {
    /// Number of consumer threads (at least 2).
    #[arg(env = "WAREHOUSE_CONSUMERS")]
    consumers: usize,

    /// Queue capacity.
    #[arg(long, env = "WAREHOUSE_CAPACITY", default_value_t = CAPACITY_DEFAULT, allow_negative_numbers = true)]
    capacity: i64,

    /// Reject capacities above this limit (no upper limit if not set).
    #[arg(long, env = "WAREHOUSE_MAX_CAPACITY")]
    max_capacity: Option<usize>,

    /// Number of producer threads.
    #[arg(long, env = "WAREHOUSE_PRODUCERS", default_value_t = 1)]
    producers: usize,

    /// Pause between pushes of one producer, in milliseconds.
    #[arg(long, env = "WAREHOUSE_PRODUCE_INTERVAL_MS", default_value_t = PRODUCE_INTERVAL_MS_DEFAULT)]
    produce_interval_ms: u64,

    /// Pause after each consumed item, in milliseconds.
    #[arg(long, env = "WAREHOUSE_CONSUME_INTERVAL_MS", default_value_t = CONSUME_INTERVAL_MS_DEFAULT)]
    consume_interval_ms: u64,

    /// Stop after this many seconds (runs until interrupted if neither this
    /// nor --max-items is set).
    #[arg(long, env = "WAREHOUSE_DURATION_SECS")]
    duration_secs: Option<u64>,

    /// Stop once this many vehicles have been consumed.
    #[arg(long, env = "WAREHOUSE_MAX_ITEMS")]
    max_items: Option<u64>,

    /// Seed for the car/truck choice (random if not set).
    #[arg(long, env = "WAREHOUSE_SEED")]
    seed: Option<u64>,

    /// Print the run summary as JSON.
    #[arg(long, env = "WAREHOUSE_JSON")]
    json: bool,
}

impl Cli {
    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            capacity: self.capacity,
            policy: self
                .max_capacity
                .map_or_else(CapacityPolicy::default, |maximum| {
                    CapacityPolicy::default().with_maximum(maximum)
                }),
            producers: self.producers,
            consumers: self.consumers,
            produce_interval: Duration::from_millis(self.produce_interval_ms),
            consume_interval: Duration::from_millis(self.consume_interval_ms),
            duration: self.duration_secs.map(Duration::from_secs),
            max_items: self.max_items,
            seed: self.seed,
            ..DriverConfig::default()
        }
    }
}

fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: failed to encode summary: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!("seed:             {}", summary.seed);
    println!("capacity:         {}", summary.capacity);
    println!("produced:         {}", summary.produced);
    println!("consumed:         {}", summary.consumed);
    println!("drained:          {}", summary.drained);
    println!("cancelled pushes: {}", summary.cancelled_pushes);
    for (i, taken) in summary.per_consumer.iter().enumerate() {
        println!("  consumer {}: {}", i + 1, taken);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let summary = match Warehouse::run(&cli.driver_config()) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    print_summary(&summary, cli.json);
}
