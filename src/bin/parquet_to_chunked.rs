//! Parquet -> Chunked -> TWAP Pipeline
//!
//! Reads a directory of time-ordered tick Parquet files, persists them in the
//! chunked format (skipped when the chunked file already exists and is
//! non-empty), decodes that file back, and writes per provider/symbol TWAP
//! reports as Parquet.
//!
//! Usage:
//!   cargo run --release --bin parquet_to_chunked -- ./data ./ticks.chunked ./twap.parquet
//!   cargo run --release --bin parquet_to_chunked -- ./data ./ticks.chunked ./twap.parquet --window-secs 60 --codec plain
//!   cargo run --release --bin parquet_to_chunked -- ./data ./ticks.chunked ./twap.parquet --repeat-decode-secs 30
//!
//! Environment:
//!   TWAP_CONFIG_PATH - TOML config used when --config is absent (default: twap.toml)
//!   RUST_LOG - log filter (default: parquet_to_chunked=info)

use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tick_twap::chunked::{read_chunked_file, write_chunked_file, ChunkedFileSource, CodecKind};
use tick_twap::parquet_io::{find_parquet_files, read_many_parquet_files, TwapParquetWriter};
use tick_twap::twap::{compute_twap, Dictionary, FnSink, InputRow, OutputRow, TwapConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "parquet_to_chunked")]
#[command(about = "Convert tick Parquet files to the chunked format and compute TWAP reports")]
struct Args {
    /// Directory of input *.parquet tick files
    input_dir: PathBuf,

    /// Chunked file to write (reused if present and non-empty)
    chunked_file: PathBuf,

    /// TWAP report Parquet file to write
    twap_parquet: PathBuf,

    /// Report window in seconds
    #[arg(long, env = "TWAP_WINDOW_SECS")]
    window_secs: Option<f64>,

    /// Rows per chunk
    #[arg(long, env = "TWAP_CHUNK_ROWS")]
    chunk_rows: Option<usize>,

    /// Integer codec for chunk columns
    #[arg(long, value_enum)]
    codec: Option<CodecKind>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decode the whole chunked file into memory before aggregating
    #[arg(long)]
    buffer_in_memory: bool,

    /// Repeat decode + aggregate for this many seconds after the run
    #[arg(long)]
    repeat_decode_secs: Option<f64>,
}

fn log_throughput(stage: &str, rows: u64, elapsed: Duration) {
    let per_row_ns = if rows == 0 {
        0.0
    } else {
        elapsed.as_nanos() as f64 / rows as f64
    };
    info!(
        stage,
        rows,
        elapsed_ms = elapsed.as_millis() as u64,
        per_row_ns,
        "Stage complete"
    );
}

fn chunked_file_present(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

fn load_config(args: &Args) -> Result<TwapConfig> {
    let mut config = match &args.config {
        Some(path) => TwapConfig::load(path)?,
        None => TwapConfig::from_env(),
    };
    if let Some(secs) = args.window_secs {
        config = config.with_window_secs(secs);
    }
    if let Some(chunk_rows) = args.chunk_rows {
        config.chunk_rows = chunk_rows;
    }
    if let Some(codec) = args.codec {
        config.codec = codec;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("parquet_to_chunked=info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        window_secs = config.window_secs(),
        chunk_rows = config.chunk_rows,
        codec = ?config.codec,
        "Starting pipeline"
    );

    let files = find_parquet_files(&args.input_dir)?;
    if files.is_empty() {
        bail!("No parquet files found in {}", args.input_dir.display());
    }

    let reuse_chunked = chunked_file_present(&args.chunked_file);
    let mut providers = Dictionary::new();
    let mut symbols = Dictionary::new();
    let mut rows: Vec<InputRow> = Vec::new();

    let started = Instant::now();
    let read = read_many_parquet_files(
        &files,
        &mut providers,
        &mut symbols,
        config.parquet_batch_rows,
        |row| {
            if !reuse_chunked {
                rows.push(row);
            }
            Ok(())
        },
    )?;
    log_throughput("read_parquet", read, started.elapsed());

    let codec = config.codec.build();
    if reuse_chunked {
        warn!(path = %args.chunked_file.display(), "Chunked file exists, skipping write");
    } else {
        let started = Instant::now();
        let stats = write_chunked_file(&args.chunked_file, &rows, config.chunk_rows, codec.as_ref())?;
        log_throughput("write_chunked", stats.rows, started.elapsed());
        rows = Vec::new();
    }

    let started = Instant::now();
    let mut writer = TwapParquetWriter::create(&args.twap_parquet, &providers, &symbols, config.output_batch_rows)?;
    let stats = if args.buffer_in_memory {
        read_chunked_file(&args.chunked_file, codec.as_ref(), |row| {
            rows.push(row);
            Ok(())
        })?;
        log_throughput("decode_chunked", rows.len() as u64, started.elapsed());
        compute_twap(&mut rows, &mut writer, config.window_nanos)?
    } else {
        let mut source = ChunkedFileSource::new(&args.chunked_file, config.codec.build());
        compute_twap(&mut source, &mut writer, config.window_nanos)?
    };
    let written = writer.close()?;
    log_throughput("twap", stats.rows_in, started.elapsed());
    info!(
        reports = written,
        windows = stats.windows_flushed,
        pairs = stats.active_pairs,
        path = %args.twap_parquet.display(),
        "TWAP reports written"
    );

    if let Some(secs) = args.repeat_decode_secs {
        let budget = Duration::from_secs_f64(secs.max(0.0));
        let started = Instant::now();
        let mut passes = 0u64;
        let mut rows_seen = 0u64;
        while started.elapsed() < budget {
            let mut source = ChunkedFileSource::new(&args.chunked_file, config.codec.build());
            let mut discard = FnSink(|_: OutputRow| -> Result<()> { Ok(()) });
            let stats = compute_twap(&mut source, &mut discard, config.window_nanos)?;
            rows_seen += stats.rows_in;
            passes += 1;
        }
        info!(passes, "Repeat decode finished");
        log_throughput("repeat_decode_twap", rows_seen, started.elapsed());
    }

    Ok(())
}
