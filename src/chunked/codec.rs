//! Integer Compression Codecs
//!
//! Column compression is delegated to an [`IntegerCodec`] strategy with two
//! integer widths: 64-bit for timestamps and price bit patterns, 32-bit for
//! provider and symbol ids. Callers size one output buffer with
//! [`IntegerCodec::max_compressed_len`] and reuse it across chunks.

use super::bitpack::BitPackCodec;
use super::error::{ChunkedError, Result};
use serde::{Deserialize, Serialize};

/// Integer width of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    U32,
    U64,
}

impl IntWidth {
    pub const fn bytes(self) -> usize {
        match self {
            IntWidth::U32 => 4,
            IntWidth::U64 => 8,
        }
    }
}

/// Pack/unpack/bound strategy for integer arrays.
pub trait IntegerCodec {
    fn name(&self) -> &'static str;

    /// Upper bound on the packed size of `count` values of `width`.
    fn max_compressed_len(&self, width: IntWidth, count: usize) -> usize;

    /// Lower bound on the packed size of `count` values of `width`. Decoders
    /// use it to reject row counts the remaining input cannot hold.
    fn min_compressed_len(&self, width: IntWidth, count: usize) -> usize;

    /// Pack `values` into the front of `out`, returning bytes written.
    fn pack_u64(&self, values: &[u64], out: &mut [u8]) -> Result<usize>;

    fn pack_u32(&self, values: &[u32], out: &mut [u8]) -> Result<usize>;

    /// Unpack exactly `out.len()` values; `input` must be consumed entirely.
    fn unpack_u64(&self, input: &[u8], out: &mut [u64]) -> Result<()>;

    fn unpack_u32(&self, input: &[u8], out: &mut [u32]) -> Result<()>;
}

/// Codec selection for configuration and CLI flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// 128-value bit-packed blocks
    #[default]
    #[value(name = "bitpack")]
    BitPack,
    /// Little-endian values stored verbatim
    Plain,
}

impl CodecKind {
    pub fn build(self) -> Box<dyn IntegerCodec + Send + Sync> {
        match self {
            CodecKind::BitPack => Box::new(BitPackCodec::new()),
            CodecKind::Plain => Box::new(PlainCodec),
        }
    }
}

/// Stores values as little-endian bytes with no compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl PlainCodec {
    fn check_out(needed: usize, available: usize) -> Result<()> {
        if available < needed {
            return Err(ChunkedError::codec(
                "plain",
                format!("output buffer holds {} bytes, need {}", available, needed),
            ));
        }
        Ok(())
    }

    fn check_in(width: IntWidth, input: usize, count: usize) -> Result<()> {
        if input != count * width.bytes() {
            return Err(ChunkedError::codec(
                "plain",
                format!(
                    "{} bytes cannot hold exactly {} values of {} bytes",
                    input,
                    count,
                    width.bytes()
                ),
            ));
        }
        Ok(())
    }
}

impl IntegerCodec for PlainCodec {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn max_compressed_len(&self, width: IntWidth, count: usize) -> usize {
        count * width.bytes()
    }

    fn min_compressed_len(&self, width: IntWidth, count: usize) -> usize {
        count.saturating_mul(width.bytes())
    }

    fn pack_u64(&self, values: &[u64], out: &mut [u8]) -> Result<usize> {
        let needed = values.len() * 8;
        Self::check_out(needed, out.len())?;
        for (dst, v) in out.chunks_exact_mut(8).zip(values) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        Ok(needed)
    }

    fn pack_u32(&self, values: &[u32], out: &mut [u8]) -> Result<usize> {
        let needed = values.len() * 4;
        Self::check_out(needed, out.len())?;
        for (dst, v) in out.chunks_exact_mut(4).zip(values) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        Ok(needed)
    }

    fn unpack_u64(&self, input: &[u8], out: &mut [u64]) -> Result<()> {
        Self::check_in(IntWidth::U64, input.len(), out.len())?;
        for (v, src) in out.iter_mut().zip(input.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(src);
            *v = u64::from_le_bytes(bytes);
        }
        Ok(())
    }

    fn unpack_u32(&self, input: &[u8], out: &mut [u32]) -> Result<()> {
        Self::check_in(IntWidth::U32, input.len(), out.len())?;
        for (v, src) in out.iter_mut().zip(input.chunks_exact(4)) {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(src);
            *v = u32::from_le_bytes(bytes);
        }
        Ok(())
    }
}
