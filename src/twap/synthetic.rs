//! Deterministic synthetic tick stream for fixtures and benchmarks.
//!
//! Row `i` is `{start + i * spacing, i % providers, i % symbols, base + (i % levels)}`.

use super::source::IterSource;
use super::types::{InputRow, Nanos};

#[derive(Debug, Clone)]
pub struct SyntheticTicks {
    start_nanos: Nanos,
    spacing_nanos: Nanos,
    count: u64,
    providers: u32,
    symbols: u32,
    base_price: f64,
    price_levels: u32,
    index: u64,
}

impl SyntheticTicks {
    pub fn new(start_nanos: Nanos, spacing_nanos: Nanos, count: u64) -> Self {
        Self {
            start_nanos,
            spacing_nanos,
            count,
            providers: 10,
            symbols: 100,
            base_price: 100.0,
            price_levels: 10,
            index: 0,
        }
    }

    pub fn providers(mut self, providers: u32) -> Self {
        self.providers = providers.max(1);
        self
    }

    pub fn symbols(mut self, symbols: u32) -> Self {
        self.symbols = symbols.max(1);
        self
    }

    pub fn prices(mut self, base_price: f64, price_levels: u32) -> Self {
        self.base_price = base_price;
        self.price_levels = price_levels.max(1);
        self
    }

    /// Time of the row after the last one generated, for chaining streams.
    pub fn end_nanos(&self) -> Nanos {
        self.start_nanos + self.count as i64 * self.spacing_nanos
    }

    pub fn into_source(self) -> IterSource<Self> {
        IterSource(self)
    }
}

impl Iterator for SyntheticTicks {
    type Item = InputRow;

    fn next(&mut self) -> Option<InputRow> {
        if self.index >= self.count {
            return None;
        }
        let i = self.index;
        self.index += 1;
        Some(InputRow {
            time_nanos: self.start_nanos + i as i64 * self.spacing_nanos,
            provider_id: (i % self.providers as u64) as u32,
            symbol_id: (i % self.symbols as u64) as u32,
            price: self.base_price + (i % self.price_levels as u64) as f64,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.index) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SyntheticTicks {}
