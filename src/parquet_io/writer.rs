//! Parquet writers for synthetic tick input and TWAP reports.

use crate::twap::dictionary::Dictionary;
use crate::twap::source::RowSink;
use crate::twap::types::{InputRow, OutputRow};
use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, DictionaryArray, Float64Array, Float64Builder, Int32Array, Int64Array, Int64Builder,
    StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const ROW_GROUP_ROWS: usize = 64 * 1024;

fn name_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
        false,
    )
}

pub fn tick_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        name_field("provider"),
        name_field("symbol"),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("price", DataType::Float64, false),
    ]))
}

pub fn twap_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("provider", DataType::Utf8, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("twap", DataType::Float64, false),
    ]))
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_max_row_group_size(ROW_GROUP_ROWS)
        .build()
}

fn keyed_names(ids: impl Iterator<Item = u32>, dictionary: &Dictionary) -> Result<ArrayRef> {
    let keys: Int32Array = ids.map(|id| id as i32).collect();
    let values = Arc::new(StringArray::from_iter_values(dictionary.names()));
    Ok(Arc::new(DictionaryArray::<Int32Type>::try_new(keys, values)?))
}

/// Write `rows` with dictionary-encoded provider and symbol columns.
pub fn write_parquet_ticks(
    path: impl AsRef<Path>,
    rows: &[InputRow],
    providers: &Dictionary,
    symbols: &Dictionary,
) -> Result<()> {
    let path = path.as_ref();
    let schema = tick_schema();
    let file = File::create(path)
        .with_context(|| format!("Failed to create parquet file: {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(writer_properties()))?;

    for slice in rows.chunks(ROW_GROUP_ROWS) {
        let columns: Vec<ArrayRef> = vec![
            keyed_names(slice.iter().map(|r| r.provider_id), providers)?,
            keyed_names(slice.iter().map(|r| r.symbol_id), symbols)?,
            Arc::new(slice.iter().map(|r| r.time_nanos).collect::<Int64Array>()),
            Arc::new(slice.iter().map(|r| r.price).collect::<Float64Array>()),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        writer
            .write(&batch)
            .with_context(|| format!("Failed to write parquet file: {}", path.display()))?;
    }
    writer
        .close()
        .with_context(|| format!("Failed to finalize parquet file: {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "Tick parquet written");
    Ok(())
}

/// [`RowSink`] writing TWAP reports with names resolved through borrowed
/// dictionaries. Rows are buffered and written every `batch_rows` rows.
pub struct TwapParquetWriter<'a> {
    path: PathBuf,
    schema: SchemaRef,
    writer: ArrowWriter<File>,
    providers: &'a Dictionary,
    symbols: &'a Dictionary,
    batch_rows: usize,
    provider: StringBuilder,
    symbol: StringBuilder,
    timestamp: Int64Builder,
    twap: Float64Builder,
    buffered: usize,
    rows_written: u64,
}

impl<'a> TwapParquetWriter<'a> {
    pub fn create(
        path: impl AsRef<Path>,
        providers: &'a Dictionary,
        symbols: &'a Dictionary,
        batch_rows: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let schema = twap_schema();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create parquet file: {}", path.display()))?;
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(writer_properties()))?;
        let batch_rows = batch_rows.max(1);
        let capacity = batch_rows.min(ROW_GROUP_ROWS);
        Ok(Self {
            path,
            schema,
            writer,
            providers,
            symbols,
            batch_rows,
            provider: StringBuilder::with_capacity(capacity, capacity * 8),
            symbol: StringBuilder::with_capacity(capacity, capacity * 8),
            timestamp: Int64Builder::with_capacity(capacity),
            twap: Float64Builder::with_capacity(capacity),
            buffered: 0,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.provider.finish()),
            Arc::new(self.symbol.finish()),
            Arc::new(self.timestamp.finish()),
            Arc::new(self.twap.finish()),
        ];
        let batch = RecordBatch::try_new(self.schema.clone(), columns)?;
        self.writer
            .write(&batch)
            .with_context(|| format!("Failed to write parquet file: {}", self.path.display()))?;
        debug!(rows = self.buffered, "TWAP batch written");
        self.rows_written += self.buffered as u64;
        self.buffered = 0;
        Ok(())
    }

    /// Write buffered rows and finalize the file footer.
    pub fn close(mut self) -> Result<u64> {
        self.flush_batch()?;
        self.writer
            .close()
            .with_context(|| format!("Failed to finalize parquet file: {}", self.path.display()))?;
        info!(path = %self.path.display(), rows = self.rows_written, "TWAP parquet written");
        Ok(self.rows_written)
    }
}

impl RowSink for TwapParquetWriter<'_> {
    fn accept(&mut self, row: OutputRow) -> Result<()> {
        self.provider.append_value(self.providers.name_for(row.provider_id));
        self.symbol.append_value(self.symbols.name_for(row.symbol_id));
        self.timestamp.append_value(row.report_time_nanos);
        self.twap.append_value(row.twap);
        self.buffered += 1;
        if self.buffered >= self.batch_rows {
            self.flush_batch()?;
        }
        Ok(())
    }
}
