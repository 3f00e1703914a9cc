//! Chunked Format Writer
//!
//! ```text
//! total_row_count : i64 LE
//! per chunk:
//!   chunk_row_count : i64 LE
//!   per column in [timestamps, prices, provider_ids, symbol_ids]:
//!     compressed_length : i64 LE
//!     compressed_bytes  : compressed_length bytes
//! ```
//!
//! The output is flushed after every chunk, so a failure mid-stream leaves
//! all earlier chunks complete on disk and is reported to the caller.

use super::codec::{IntWidth, IntegerCodec};
use super::columns::{ChunkColumns, Column};
use super::error::{ChunkedError, Result};
use super::ChunkedStats;
use crate::twap::types::InputRow;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

fn write_i64<W: Write + ?Sized>(out: &mut W, value: i64) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Worst-case packed size of one column for a chunk of `rows`.
pub fn column_buffer_len<C: IntegerCodec + ?Sized>(codec: &C, rows: usize) -> usize {
    codec
        .max_compressed_len(IntWidth::U32, rows)
        .max(codec.max_compressed_len(IntWidth::U64, rows))
}

/// Encode `rows` in chunks of at most `chunk_rows`.
pub fn encode_rows<W, C>(out: &mut W, rows: &[InputRow], chunk_rows: usize, codec: &C) -> Result<ChunkedStats>
where
    W: Write + ?Sized,
    C: IntegerCodec + ?Sized,
{
    if chunk_rows == 0 {
        return Err(ChunkedError::InvalidChunkRows);
    }

    write_i64(out, rows.len() as i64)?;
    let mut stats = ChunkedStats {
        rows: rows.len() as u64,
        chunks: 0,
        bytes: 8,
    };

    let capacity = chunk_rows.min(rows.len());
    let mut buffer = vec![0u8; column_buffer_len(codec, capacity)];
    let mut columns = ChunkColumns::with_capacity(capacity);

    for chunk in rows.chunks(chunk_rows) {
        columns.load(chunk);
        write_i64(out, chunk.len() as i64)?;
        stats.bytes += 8;

        for column in Column::ORDER {
            let packed = columns.column(column).pack(codec, &mut buffer)?;
            write_i64(out, packed as i64)?;
            out.write_all(&buffer[..packed])?;
            stats.bytes += 8 + packed as u64;
        }

        out.flush()?;
        stats.chunks += 1;
        debug!(chunk = stats.chunks, rows = chunk.len(), bytes = stats.bytes, "Chunk written");
    }

    Ok(stats)
}

/// Encode `rows` into a new file at `path`, replacing any existing file.
pub fn write_chunked_file<C: IntegerCodec + ?Sized>(
    path: impl AsRef<Path>,
    rows: &[InputRow],
    chunk_rows: usize,
    codec: &C,
) -> anyhow::Result<ChunkedStats> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create chunked file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let stats = encode_rows(&mut writer, rows, chunk_rows, codec)
        .with_context(|| format!("Failed to write chunked file: {}", path.display()))?;

    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush chunked file: {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync chunked file: {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = stats.rows,
        chunks = stats.chunks,
        bytes = stats.bytes,
        codec = codec.name(),
        "Chunked file written"
    );
    Ok(stats)
}
