//! Chunked File Inspection Tool
//!
//! Decodes a chunked tick file and prints a summary to stderr. With `--twap`,
//! also computes the window reports in the same pass and prints them to
//! stdout as CSV.
//!
//! Usage:
//!   cargo run --release --bin chunked_inspect -- ./ticks.chunked
//!   cargo run --release --bin chunked_inspect -- ./ticks.chunked --twap --window-secs 60 > twap.csv

use anyhow::{ensure, Result};
use clap::Parser;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tick_twap::chunked::{read_chunked_file, CodecKind};
use tick_twap::twap::types::format_nanos;
use tick_twap::twap::{FnSink, Nanos, OutputRow, WindowedAggregator, NANOS_PER_SEC};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chunked_inspect")]
#[command(about = "Summarize a chunked tick file and optionally print TWAP reports")]
struct Args {
    /// Chunked file to read
    chunked_file: PathBuf,

    /// Integer codec the file was written with
    #[arg(long, value_enum, default_value = "bitpack")]
    codec: CodecKind,

    /// Print TWAP reports as CSV
    #[arg(long)]
    twap: bool,

    /// Report window in seconds
    #[arg(long, default_value = "15")]
    window_secs: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("chunked_inspect=info".parse()?))
        .init();

    let args = Args::parse();
    let codec = args.codec.build();
    let window_nanos = (args.window_secs * NANOS_PER_SEC as f64).round() as Nanos;
    ensure!(window_nanos > 0, "--window-secs must be positive");

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.twap {
        writeln!(out, "report_time_nanos,provider_id,symbol_id,twap")?;
    }
    let mut aggregator = args.twap.then(|| WindowedAggregator::new(window_nanos));
    let mut sink = FnSink(|row: OutputRow| -> Result<()> {
        writeln!(
            out,
            "{},{},{},{}",
            row.report_time_nanos, row.provider_id, row.symbol_id, row.twap
        )?;
        Ok(())
    });

    let mut first: Option<Nanos> = None;
    let mut last: Option<Nanos> = None;
    let mut pairs: HashSet<(u32, u32)> = HashSet::new();
    let stats = read_chunked_file(&args.chunked_file, codec.as_ref(), |row| {
        first.get_or_insert(row.time_nanos);
        last = Some(row.time_nanos);
        pairs.insert((row.provider_id, row.symbol_id));
        if let Some(aggregator) = aggregator.as_mut() {
            aggregator.push(row, &mut sink)?;
        }
        Ok(())
    })?;

    if let Some(aggregator) = aggregator.take() {
        aggregator.finish(&mut sink)?;
    }
    drop(sink);
    out.flush()?;

    eprintln!("file:     {}", args.chunked_file.display());
    eprintln!("rows:     {}", stats.rows);
    eprintln!("chunks:   {}", stats.chunks);
    eprintln!("bytes:    {}", stats.bytes);
    if let (Some(first), Some(last)) = (first, last) {
        eprintln!("first:    {}", format_nanos(first));
        eprintln!("last:     {}", format_nanos(last));
    }
    eprintln!("pairs:    {}", pairs.len());
    Ok(())
}
