//! Per-chunk column buffers and the canonical column order.

use super::codec::{IntWidth, IntegerCodec};
use super::error::Result;
use crate::twap::types::InputRow;

/// Columns of a chunk, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamps,
    Prices,
    ProviderIds,
    SymbolIds,
}

impl Column {
    /// Canonical on-disk order.
    pub const ORDER: [Column; 4] = [
        Column::Timestamps,
        Column::Prices,
        Column::ProviderIds,
        Column::SymbolIds,
    ];

    pub const fn width(self) -> IntWidth {
        match self {
            Column::Timestamps | Column::Prices => IntWidth::U64,
            Column::ProviderIds | Column::SymbolIds => IntWidth::U32,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Column::Timestamps => "timestamps",
            Column::Prices => "prices",
            Column::ProviderIds => "provider_ids",
            Column::SymbolIds => "symbol_ids",
        }
    }
}

/// Borrowed column values tagged with their width.
pub enum ColumnSlice<'a> {
    U64(&'a [u64]),
    U32(&'a [u32]),
}

pub enum ColumnSliceMut<'a> {
    U64(&'a mut [u64]),
    U32(&'a mut [u32]),
}

impl ColumnSlice<'_> {
    pub fn pack<C: IntegerCodec + ?Sized>(&self, codec: &C, out: &mut [u8]) -> Result<usize> {
        match self {
            ColumnSlice::U64(values) => codec.pack_u64(values, out),
            ColumnSlice::U32(values) => codec.pack_u32(values, out),
        }
    }
}

impl ColumnSliceMut<'_> {
    pub fn unpack<C: IntegerCodec + ?Sized>(&mut self, codec: &C, input: &[u8]) -> Result<()> {
        match self {
            ColumnSliceMut::U64(values) => codec.unpack_u64(input, values),
            ColumnSliceMut::U32(values) => codec.unpack_u32(input, values),
        }
    }
}

/// Column-major storage for one chunk. Timestamps and prices are kept as raw
/// 64-bit patterns so they pass through the codec bit-exactly.
#[derive(Debug, Default)]
pub struct ChunkColumns {
    timestamps: Vec<u64>,
    prices: Vec<u64>,
    provider_ids: Vec<u32>,
    symbol_ids: Vec<u32>,
}

impl ChunkColumns {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(rows),
            prices: Vec::with_capacity(rows),
            provider_ids: Vec::with_capacity(rows),
            symbol_ids: Vec::with_capacity(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Replace contents with `rows`.
    pub fn load(&mut self, rows: &[InputRow]) {
        self.clear();
        for row in rows {
            self.timestamps.push(row.time_nanos as u64);
            self.prices.push(row.price.to_bits());
            self.provider_ids.push(row.provider_id);
            self.symbol_ids.push(row.symbol_id);
        }
    }

    /// Resize every column to `rows` so a decoder can fill them.
    pub fn resize(&mut self, rows: usize) {
        self.timestamps.resize(rows, 0);
        self.prices.resize(rows, 0);
        self.provider_ids.resize(rows, 0);
        self.symbol_ids.resize(rows, 0);
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.prices.clear();
        self.provider_ids.clear();
        self.symbol_ids.clear();
    }

    pub fn column(&self, column: Column) -> ColumnSlice<'_> {
        match column {
            Column::Timestamps => ColumnSlice::U64(&self.timestamps),
            Column::Prices => ColumnSlice::U64(&self.prices),
            Column::ProviderIds => ColumnSlice::U32(&self.provider_ids),
            Column::SymbolIds => ColumnSlice::U32(&self.symbol_ids),
        }
    }

    pub fn column_mut(&mut self, column: Column) -> ColumnSliceMut<'_> {
        match column {
            Column::Timestamps => ColumnSliceMut::U64(&mut self.timestamps),
            Column::Prices => ColumnSliceMut::U64(&mut self.prices),
            Column::ProviderIds => ColumnSliceMut::U32(&mut self.provider_ids),
            Column::SymbolIds => ColumnSliceMut::U32(&mut self.symbol_ids),
        }
    }

    #[inline]
    pub fn row(&self, index: usize) -> InputRow {
        InputRow {
            time_nanos: self.timestamps[index] as i64,
            provider_id: self.provider_ids[index],
            symbol_id: self.symbol_ids[index],
            price: f64::from_bits(self.prices[index]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_widths() {
        let widths: Vec<IntWidth> = Column::ORDER.iter().map(|c| c.width()).collect();
        assert_eq!(widths, vec![IntWidth::U64, IntWidth::U64, IntWidth::U32, IntWidth::U32]);
        assert_eq!(Column::ORDER[1].name(), "prices");
    }

    #[test]
    fn test_load_preserves_bit_patterns() {
        let rows = [
            InputRow::new(-5, 1, 2, -0.0),
            InputRow::new(i64::MAX, u32::MAX, 0, f64::NAN),
        ];
        let mut columns = ChunkColumns::default();
        columns.load(&rows);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.row(0).time_nanos, -5);
        assert_eq!(columns.row(0).price.to_bits(), (-0.0f64).to_bits());
        assert!(columns.row(1).price.is_nan());
        assert_eq!(columns.row(1).provider_id, u32::MAX);
    }
}
