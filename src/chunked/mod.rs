//! Chunked Binary Tick Format
//!
//! Persists a tick sequence as a row count followed by fixed-capacity chunks.
//! Each chunk stores its four columns independently compressed by an
//! [`IntegerCodec`]:
//!
//! | Column       | Width | Stored as                      |
//! |--------------|-------|--------------------------------|
//! | timestamps   | 64    | `i64` bit pattern              |
//! | prices       | 64    | IEEE-754 bits (`f64::to_bits`) |
//! | provider_ids | 32    | dictionary id                  |
//! | symbol_ids   | 32    | dictionary id                  |
//!
//! Only ids are persisted. Callers that need names keep their own
//! [`Dictionary`](crate::twap::Dictionary).

pub mod bitpack;
pub mod codec;
pub mod columns;
pub mod error;
pub mod reader;
pub mod writer;

pub use bitpack::BitPackCodec;
pub use codec::{CodecKind, IntWidth, IntegerCodec, PlainCodec};
pub use columns::{ChunkColumns, Column};
pub use error::{ChunkedError, Result};
pub use reader::{decode_rows, read_chunked_file, ByteCursor, ChunkedFileSource};
pub use writer::{column_buffer_len, encode_rows, write_chunked_file};

/// Totals for one encode or decode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkedStats {
    pub rows: u64,
    pub chunks: u64,
    pub bytes: u64,
}
