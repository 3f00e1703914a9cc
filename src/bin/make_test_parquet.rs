//! Synthetic Tick Parquet Generator
//!
//! Writes `test_%09d.parquet` files of deterministic ticks, 1ms apart. Each
//! file continues the previous file's timeline so the whole set reads back as
//! one time-ordered stream.
//!
//! Usage:
//!   cargo run --release --bin make_test_parquet -- ./data 4
//!   cargo run --release --bin make_test_parquet -- ./data 1 --rows-per-file 100000 --symbols 10

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tick_twap::parquet_io::write_parquet_ticks;
use tick_twap::twap::{Dictionary, InputRow, SyntheticTicks, NANOS_PER_MILLI};
use tracing::info;
use tracing_subscriber::EnvFilter;

const START_NANOS: i64 = 1_000_000_000_000;

#[derive(Parser, Debug)]
#[command(name = "make_test_parquet")]
#[command(about = "Write synthetic provider/symbol price ticks as Parquet")]
struct Args {
    /// Directory to write into (created if missing)
    output_dir: PathBuf,

    /// Number of files to write
    num_files: u32,

    /// Rows per file
    #[arg(long, default_value = "3000000")]
    rows_per_file: u64,

    /// Distinct providers, named provider0..
    #[arg(long, default_value = "3")]
    providers: u32,

    /// Distinct symbols, named symbol0..
    #[arg(long, default_value = "103")]
    symbols: u32,

    /// Prices cycle through 1..=price_levels
    #[arg(long, default_value = "17")]
    price_levels: u32,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("make_test_parquet=info".parse()?))
        .init();

    let args = Args::parse();
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let providers = Dictionary::from_names((0..args.providers.max(1)).map(|i| format!("provider{}", i)));
    let symbols = Dictionary::from_names((0..args.symbols.max(1)).map(|i| format!("symbol{}", i)));

    let started = Instant::now();
    let mut start_nanos = START_NANOS;
    for file_idx in 0..args.num_files {
        let ticks = SyntheticTicks::new(start_nanos, NANOS_PER_MILLI, args.rows_per_file)
            .providers(args.providers)
            .symbols(args.symbols)
            .prices(1.0, args.price_levels);
        start_nanos = ticks.end_nanos();
        let rows: Vec<InputRow> = ticks.collect();

        let path = args.output_dir.join(format!("test_{:09}.parquet", file_idx));
        write_parquet_ticks(&path, &rows, &providers, &symbols)?;
        println!("Created test file: {}", path.display());
    }

    info!(
        files = args.num_files,
        rows = args.num_files as u64 * args.rows_per_file,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Test data written"
    );
    Ok(())
}
