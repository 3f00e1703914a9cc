//! TWAP Pipeline Configuration
//!
//! Loaded from TOML (`TWAP_CONFIG_PATH`, default `twap.toml`), falling back to
//! defaults. Front-end flags override individual fields.

use super::types::{Nanos, DEFAULT_WINDOW_NANOS, NANOS_PER_SEC};
use crate::chunked::codec::CodecKind;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows per chunk in the chunked codec.
pub const DEFAULT_CHUNK_ROWS: usize = 1024 * 1024;

/// Rows buffered by the Parquet report writer before a batch is written.
pub const DEFAULT_OUTPUT_BATCH_ROWS: usize = 1024 * 1024;

/// Record batch size used when reading Parquet ticks.
pub const DEFAULT_PARQUET_BATCH_ROWS: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapConfig {
    /// Report window in nanoseconds
    #[serde(default = "default_window_nanos")]
    pub window_nanos: Nanos,

    /// Rows per chunk when writing the chunked format
    #[serde(default = "default_chunk_rows")]
    pub chunk_rows: usize,

    /// Buffered rows per Parquet report batch
    #[serde(default = "default_output_batch_rows")]
    pub output_batch_rows: usize,

    /// Record batch size for Parquet tick reads
    #[serde(default = "default_parquet_batch_rows")]
    pub parquet_batch_rows: usize,

    /// Integer codec for chunk columns
    #[serde(default)]
    pub codec: CodecKind,
}

fn default_window_nanos() -> Nanos {
    DEFAULT_WINDOW_NANOS
}

fn default_chunk_rows() -> usize {
    DEFAULT_CHUNK_ROWS
}

fn default_output_batch_rows() -> usize {
    DEFAULT_OUTPUT_BATCH_ROWS
}

fn default_parquet_batch_rows() -> usize {
    DEFAULT_PARQUET_BATCH_ROWS
}

impl Default for TwapConfig {
    fn default() -> Self {
        Self {
            window_nanos: DEFAULT_WINDOW_NANOS,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            output_batch_rows: DEFAULT_OUTPUT_BATCH_ROWS,
            parquet_batch_rows: DEFAULT_PARQUET_BATCH_ROWS,
            codec: CodecKind::default(),
        }
    }
}

impl TwapConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `TWAP_CONFIG_PATH` or `twap.toml`, else defaults
    pub fn from_env() -> Self {
        let path = std::env::var("TWAP_CONFIG_PATH").unwrap_or_else(|_| "twap.toml".to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default TWAP config ({}): {:#}", path, e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.window_nanos > 0, "window_nanos must be positive, got {}", self.window_nanos);
        ensure!(self.chunk_rows > 0, "chunk_rows must be positive");
        ensure!(self.output_batch_rows > 0, "output_batch_rows must be positive");
        ensure!(self.parquet_batch_rows > 0, "parquet_batch_rows must be positive");
        Ok(())
    }

    pub fn window_secs(&self) -> f64 {
        self.window_nanos as f64 / NANOS_PER_SEC as f64
    }

    pub fn with_window_secs(mut self, secs: f64) -> Self {
        self.window_nanos = (secs * NANOS_PER_SEC as f64).round() as Nanos;
        self
    }
}
