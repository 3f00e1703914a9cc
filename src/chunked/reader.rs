//! Chunked Format Reader
//!
//! Decodes straight out of a memory-mapped file. Every length-prefixed read is
//! bounds-checked against the remaining bytes; a short or inconsistent file is
//! reported as an error and never yields a silently truncated row set.

use super::codec::IntegerCodec;
use super::columns::{ChunkColumns, Column};
use super::error::{ChunkedError, Result};
use super::ChunkedStats;
use crate::twap::source::RowSource;
use crate::twap::types::InputRow;
use anyhow::Context;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Forward-only, bounds-checked view over encoded bytes.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ChunkedError::Truncated {
                needed: len,
                remaining: self.remaining(),
                offset: self.offset,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(word))
    }

    /// Read a non-negative length or count.
    pub fn read_len(&mut self, what: &str) -> Result<usize> {
        let at = self.offset;
        let value = self.read_i64()?;
        usize::try_from(value).map_err(|_| {
            ChunkedError::Malformed(format!("negative {} {} at offset {}", what, value, at))
        })
    }
}

/// Decode every row in `data`, calling `visit` for each in encoded order.
pub fn decode_rows<C, F>(data: &[u8], codec: &C, mut visit: F) -> anyhow::Result<ChunkedStats>
where
    C: IntegerCodec + ?Sized,
    F: FnMut(InputRow) -> anyhow::Result<()>,
{
    let mut cursor = ByteCursor::new(data);
    let total = cursor.read_len("total row count")?;
    let mut columns = ChunkColumns::default();
    let mut stats = ChunkedStats {
        rows: total as u64,
        chunks: 0,
        bytes: data.len() as u64,
    };

    let mut decoded = 0usize;
    while decoded < total {
        let at = cursor.offset();
        let rows = cursor.read_len("chunk row count")?;
        let remaining = total - decoded;
        if rows == 0 || rows > remaining {
            return Err(ChunkedError::Malformed(format!(
                "chunk at offset {} declares {} rows, {} remain",
                at, rows, remaining
            ))
            .into());
        }

        let min_bytes = Column::ORDER.iter().fold(8 * Column::ORDER.len(), |acc, column| {
            acc.saturating_add(codec.min_compressed_len(column.width(), rows))
        });
        if min_bytes > cursor.remaining() {
            return Err(ChunkedError::Malformed(format!(
                "chunk at offset {} declares {} rows, needs at least {} bytes, {} remain",
                at,
                rows,
                min_bytes,
                cursor.remaining()
            ))
            .into());
        }

        columns.resize(rows);
        for column in Column::ORDER {
            let len = cursor.read_len("segment length")?;
            let segment = cursor.take(len)?;
            columns
                .column_mut(column)
                .unpack(codec, segment)
                .with_context(|| format!("Failed to unpack {} in chunk {}", column.name(), stats.chunks))?;
        }

        for index in 0..rows {
            visit(columns.row(index))?;
        }

        decoded += rows;
        stats.chunks += 1;
        debug!(chunk = stats.chunks, rows, decoded, "Chunk decoded");
    }

    if cursor.remaining() != 0 {
        return Err(ChunkedError::TrailingBytes(cursor.remaining()).into());
    }
    Ok(stats)
}

/// Memory-map `path` and decode it.
pub fn read_chunked_file<C, F>(path: impl AsRef<Path>, codec: &C, visit: F) -> anyhow::Result<ChunkedStats>
where
    C: IntegerCodec + ?Sized,
    F: FnMut(InputRow) -> anyhow::Result<()>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open chunked file: {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat chunked file: {}", path.display()))?
        .len();
    if len == 0 {
        return Err(ChunkedError::Truncated {
            needed: 8,
            remaining: 0,
            offset: 0,
        })
        .with_context(|| format!("Chunked file is empty: {}", path.display()));
    }

    // SAFETY: the file is opened read-only and is not modified while mapped.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map chunked file: {}", path.display()))?;

    let stats = decode_rows(&mmap[..], codec, visit)
        .with_context(|| format!("Failed to decode chunked file: {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = stats.rows,
        chunks = stats.chunks,
        bytes = stats.bytes,
        codec = codec.name(),
        "Chunked file decoded"
    );
    Ok(stats)
}

/// A chunked file as a [`RowSource`]; each pass re-maps the file.
pub struct ChunkedFileSource {
    path: PathBuf,
    codec: Box<dyn IntegerCodec + Send + Sync>,
    last_stats: Option<ChunkedStats>,
}

impl ChunkedFileSource {
    pub fn new(path: impl Into<PathBuf>, codec: Box<dyn IntegerCodec + Send + Sync>) -> Self {
        Self {
            path: path.into(),
            codec,
            last_stats: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stats from the most recent completed pass.
    pub fn last_stats(&self) -> Option<ChunkedStats> {
        self.last_stats
    }
}

impl RowSource for ChunkedFileSource {
    fn for_each_row<F>(&mut self, visit: F) -> anyhow::Result<()>
    where
        F: FnMut(InputRow) -> anyhow::Result<()>,
    {
        let stats = read_chunked_file(&self.path, self.codec.as_ref(), visit)?;
        self.last_stats = Some(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::codec::{CodecKind, PlainCodec};
    use crate::chunked::writer::encode_rows;

    fn encoded(rows: &[InputRow], chunk_rows: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode_rows(&mut out, rows, chunk_rows, &PlainCodec).unwrap();
        out
    }

    fn decode_all(data: &[u8]) -> anyhow::Result<Vec<InputRow>> {
        let mut rows = Vec::new();
        decode_rows(data, &PlainCodec, |row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }

    fn sample() -> Vec<InputRow> {
        (0..10)
            .map(|i| InputRow::new(1_000 + i, (i % 3) as u32, (i % 4) as u32, i as f64 * 0.5))
            .collect()
    }

    #[test]
    fn test_cursor_bounds() {
        let data = [1u8, 0, 0, 0, 0, 0, 0, 0, 9];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_i64().unwrap(), 1);
        assert_eq!(cursor.remaining(), 1);
        match cursor.read_i64() {
            Err(ChunkedError::Truncated {
                needed,
                remaining,
                offset,
            }) => {
                assert_eq!((needed, remaining, offset), (8, 1, 8));
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_matches_input() {
        let rows = sample();
        assert_eq!(decode_all(&encoded(&rows, 3)).unwrap(), rows);
    }

    #[test]
    fn test_empty_sequence() {
        let data = 0i64.to_le_bytes();
        assert!(decode_all(&data).unwrap().is_empty());
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let data = encoded(&sample(), 4);
        for cut in 0..data.len() {
            assert!(decode_all(&data[..cut]).is_err(), "cut at {} decoded", cut);
        }
    }

    #[test]
    fn test_segment_longer_than_file() {
        let mut data = encoded(&sample(), 10);
        // first segment length sits after total and chunk row count
        data[16..24].copy_from_slice(&(1i64 << 40).to_le_bytes());
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChunkedError>(),
            Some(ChunkedError::Truncated { .. })
        ));
    }

    #[test]
    fn test_chunk_count_beyond_total_is_malformed() {
        let mut data = encoded(&sample(), 10);
        data[8..16].copy_from_slice(&11i64.to_le_bytes());
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChunkedError>(),
            Some(ChunkedError::Malformed(_))
        ));
    }

    #[test]
    fn test_huge_row_count_rejected_before_allocating() {
        let huge = (1i64 << 61).to_le_bytes();
        let data = [huge, huge].concat();
        for codec in [CodecKind::Plain, CodecKind::BitPack] {
            let err = decode_rows(&data, codec.build().as_ref(), |_| Ok(())).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ChunkedError>(),
                Some(ChunkedError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_row_count_larger_than_segments_is_malformed() {
        let mut data = encoded(&sample(), 10);
        let rows = 1i64 << 36;
        data[0..8].copy_from_slice(&rows.to_le_bytes());
        data[8..16].copy_from_slice(&rows.to_le_bytes());
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChunkedError>(),
            Some(ChunkedError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_total_is_malformed() {
        let data = (-1i64).to_le_bytes();
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChunkedError>(),
            Some(ChunkedError::Malformed(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut data = encoded(&sample(), 4);
        data.extend_from_slice(&[0, 0, 0]);
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChunkedError>(),
            Some(ChunkedError::TrailingBytes(3))
        ));
    }

    #[test]
    fn test_visitor_error_stops_decode() {
        let data = encoded(&sample(), 4);
        let mut seen = 0;
        let result = decode_rows(&data, &PlainCodec, |_| {
            seen += 1;
            if seen == 5 {
                anyhow::bail!("sink closed");
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(seen, 5);
    }
}
