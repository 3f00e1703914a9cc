//! Parquet tick reader.
//!
//! Expects columns `provider`, `symbol` (dictionary-encoded or plain Utf8),
//! `timestamp: Int64` and `price: Float64`. Names are mapped to ids through
//! the caller's dictionaries; a dictionary column's values are resolved once
//! per batch and its keys mapped per row.

use crate::twap::dictionary::Dictionary;
use crate::twap::types::{InputRow, Nanos};
use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::Int32Type;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List `*.parquet` files in `dir`, sorted by file name.
pub fn find_parquet_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "parquet") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(dir = %dir.display(), files = files.len(), "Parquet files found");
    Ok(files)
}

/// A name column resolved to ids for one batch.
enum NameColumn<'a> {
    Keyed {
        keys: &'a Int32Array,
        ids: Vec<Option<u32>>,
    },
    Plain(&'a StringArray),
}

impl<'a> NameColumn<'a> {
    fn resolve(column: &'a ArrayRef, name: &str, dictionary: &mut Dictionary) -> Result<Self> {
        if let Some(keyed) = column.as_any().downcast_ref::<DictionaryArray<Int32Type>>() {
            let values = keyed
                .values()
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow!("{} dictionary values are not Utf8", name))?;
            let ids = (0..values.len())
                .map(|i| (!values.is_null(i)).then(|| dictionary.id_for(values.value(i))))
                .collect();
            return Ok(NameColumn::Keyed {
                keys: keyed.keys(),
                ids,
            });
        }
        if let Some(plain) = column.as_any().downcast_ref::<StringArray>() {
            return Ok(NameColumn::Plain(plain));
        }
        bail!("{} column has unsupported type {}", name, column.data_type())
    }

    #[inline]
    fn id_at(&self, row: usize, dictionary: &mut Dictionary) -> Option<u32> {
        match self {
            NameColumn::Keyed { keys, ids } => {
                if keys.is_null(row) {
                    return None;
                }
                ids.get(keys.value(row) as usize).copied().flatten()
            }
            NameColumn::Plain(values) => {
                (!values.is_null(row)).then(|| dictionary.id_for(values.value(row)))
            }
        }
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("{} column missing", name))
}

fn visit_batch<F>(
    batch: &RecordBatch,
    providers: &mut Dictionary,
    symbols: &mut Dictionary,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(InputRow) -> Result<()>,
{
    let provider = NameColumn::resolve(column(batch, "provider")?, "provider", providers)?;
    let symbol = NameColumn::resolve(column(batch, "symbol")?, "symbol", symbols)?;
    let timestamps = column(batch, "timestamp")?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow!("timestamp column is not Int64"))?;
    let prices = column(batch, "price")?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow!("price column is not Float64"))?;

    for row in 0..batch.num_rows() {
        if timestamps.is_null(row) || prices.is_null(row) {
            bail!("null timestamp or price at row {}", row);
        }
        let provider_id = provider
            .id_at(row, providers)
            .ok_or_else(|| anyhow!("null provider at row {}", row))?;
        let symbol_id = symbol
            .id_at(row, symbols)
            .ok_or_else(|| anyhow!("null symbol at row {}", row))?;
        visit(InputRow::new(
            timestamps.value(row),
            provider_id,
            symbol_id,
            prices.value(row),
        ))?;
    }
    Ok(())
}

/// Read one Parquet file of ticks, returning the number of rows visited.
pub fn read_parquet_ticks<F>(
    path: impl AsRef<Path>,
    providers: &mut Dictionary,
    symbols: &mut Dictionary,
    batch_rows: usize,
    mut visit: F,
) -> Result<u64>
where
    F: FnMut(InputRow) -> Result<()>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open parquet file: {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet metadata: {}", path.display()))?
        .with_batch_size(batch_rows.max(1))
        .build()?;

    let mut rows = 0u64;
    for batch in reader {
        let batch = batch.with_context(|| format!("Failed to read batch from {}", path.display()))?;
        visit_batch(&batch, providers, symbols, &mut visit)
            .with_context(|| format!("Bad tick batch in {}", path.display()))?;
        rows += batch.num_rows() as u64;
    }

    debug!(path = %path.display(), rows, "Parquet file read");
    Ok(rows)
}

/// Read `files` in order as one stream.
///
/// # Panics
///
/// If a timestamp is lower than its predecessor, within or across files.
pub fn read_many_parquet_files<F>(
    files: &[PathBuf],
    providers: &mut Dictionary,
    symbols: &mut Dictionary,
    batch_rows: usize,
    mut visit: F,
) -> Result<u64>
where
    F: FnMut(InputRow) -> Result<()>,
{
    let mut last: Nanos = Nanos::MIN;
    let mut total = 0u64;
    for path in files {
        total += read_parquet_ticks(path, providers, symbols, batch_rows, |row| {
            assert!(
                row.time_nanos >= last,
                "timestamps not monotonic in {}: {} after {}",
                path.display(),
                row.time_nanos,
                last
            );
            last = row.time_nanos;
            visit(row)
        })?;
    }
    info!(
        files = files.len(),
        rows = total,
        providers = providers.len(),
        symbols = symbols.len(),
        "Parquet input read"
    );
    Ok(total)
}
