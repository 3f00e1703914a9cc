//! Bit-packing codec over 128-value blocks (`bitpacking::BitPacker4x`).
//!
//! Block layout: one byte holding the bit width, then `bits * 16` packed
//! bytes. The final partial block is zero-padded before packing. 64-bit
//! values are split into a low-lane block followed by a high-lane block.

use super::codec::{IntWidth, IntegerCodec};
use super::error::{ChunkedError, Result};
use bitpacking::{BitPacker, BitPacker4x};

const BLOCK_LEN: usize = BitPacker4x::BLOCK_LEN;
const MAX_BLOCK_BYTES: usize = 1 + BLOCK_LEN * 4;

pub struct BitPackCodec {
    packer: BitPacker4x,
}

impl BitPackCodec {
    pub fn new() -> Self {
        Self {
            packer: BitPacker4x::new(),
        }
    }

    fn pack_block(&self, block: &[u32], out: &mut [u8]) -> Result<usize> {
        let num_bits = self.packer.num_bits(block);
        let packed = num_bits as usize * BLOCK_LEN / 8;
        if out.len() < 1 + packed {
            return Err(ChunkedError::codec(
                "bitpack",
                format!("output buffer holds {} bytes, block needs {}", out.len(), 1 + packed),
            ));
        }
        out[0] = num_bits;
        let written = self.packer.compress(block, &mut out[1..], num_bits);
        Ok(1 + written)
    }

    fn unpack_block(&self, input: &[u8], block: &mut [u32; BLOCK_LEN]) -> Result<usize> {
        let num_bits = *input
            .first()
            .ok_or_else(|| ChunkedError::codec("bitpack", "missing block header"))?;
        if num_bits > 32 {
            return Err(ChunkedError::codec(
                "bitpack",
                format!("invalid bit width {}", num_bits),
            ));
        }
        let packed = num_bits as usize * BLOCK_LEN / 8;
        if input.len() < 1 + packed {
            return Err(ChunkedError::codec(
                "bitpack",
                format!("block needs {} bytes, {} remain", 1 + packed, input.len()),
            ));
        }
        self.packer
            .decompress(&input[1..1 + packed], &mut block[..], num_bits);
        Ok(1 + packed)
    }

    fn finish_unpack(consumed: usize, input: usize) -> Result<()> {
        if consumed != input {
            return Err(ChunkedError::codec(
                "bitpack",
                format!("{} bytes left over after unpacking", input - consumed),
            ));
        }
        Ok(())
    }
}

impl Default for BitPackCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BitPackCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitPackCodec").finish()
    }
}

fn blocks(count: usize) -> usize {
    count / BLOCK_LEN + usize::from(count % BLOCK_LEN != 0)
}

fn lanes(width: IntWidth) -> usize {
    match width {
        IntWidth::U32 => 1,
        IntWidth::U64 => 2,
    }
}

impl IntegerCodec for BitPackCodec {
    fn name(&self) -> &'static str {
        "bitpack"
    }

    fn max_compressed_len(&self, width: IntWidth, count: usize) -> usize {
        blocks(count) * lanes(width) * MAX_BLOCK_BYTES
    }

    // An all-zero block is its header byte alone.
    fn min_compressed_len(&self, width: IntWidth, count: usize) -> usize {
        blocks(count).saturating_mul(lanes(width))
    }

    fn pack_u64(&self, values: &[u64], out: &mut [u8]) -> Result<usize> {
        let mut lo = [0u32; BLOCK_LEN];
        let mut hi = [0u32; BLOCK_LEN];
        let mut written = 0;
        for chunk in values.chunks(BLOCK_LEN) {
            lo.fill(0);
            hi.fill(0);
            for (i, v) in chunk.iter().enumerate() {
                lo[i] = *v as u32;
                hi[i] = (*v >> 32) as u32;
            }
            written += self.pack_block(&lo, &mut out[written..])?;
            written += self.pack_block(&hi, &mut out[written..])?;
        }
        Ok(written)
    }

    fn pack_u32(&self, values: &[u32], out: &mut [u8]) -> Result<usize> {
        let mut block = [0u32; BLOCK_LEN];
        let mut written = 0;
        for chunk in values.chunks(BLOCK_LEN) {
            let packed = if chunk.len() == BLOCK_LEN {
                self.pack_block(chunk, &mut out[written..])?
            } else {
                block.fill(0);
                block[..chunk.len()].copy_from_slice(chunk);
                self.pack_block(&block, &mut out[written..])?
            };
            written += packed;
        }
        Ok(written)
    }

    fn unpack_u64(&self, input: &[u8], out: &mut [u64]) -> Result<()> {
        let mut lo = [0u32; BLOCK_LEN];
        let mut hi = [0u32; BLOCK_LEN];
        let mut consumed = 0;
        for dst in out.chunks_mut(BLOCK_LEN) {
            consumed += self.unpack_block(&input[consumed..], &mut lo)?;
            consumed += self.unpack_block(&input[consumed..], &mut hi)?;
            for (i, v) in dst.iter_mut().enumerate() {
                *v = (hi[i] as u64) << 32 | lo[i] as u64;
            }
        }
        Self::finish_unpack(consumed, input.len())
    }

    fn unpack_u32(&self, input: &[u8], out: &mut [u32]) -> Result<()> {
        let mut block = [0u32; BLOCK_LEN];
        let mut consumed = 0;
        for dst in out.chunks_mut(BLOCK_LEN) {
            consumed += self.unpack_block(&input[consumed..], &mut block)?;
            dst.copy_from_slice(&block[..dst.len()]);
        }
        Self::finish_unpack(consumed, input.len())
    }
}
