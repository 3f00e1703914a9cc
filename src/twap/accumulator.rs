//! Time-Weighted Accumulators
//!
//! One accumulator per (provider, symbol) pair. A pair starts out empty (`None`
//! in the matrix) and becomes active on its first tick; there is no way back.
//!
//! # Accounting
//!
//! ```text
//! on tick (t, p) for an active pair:
//!     price_time_sum += last_price * (t - last_time)
//!     time_sum       += t - last_time
//!     last_time, last_price = t, p
//!
//! twap(boundary) = observe(boundary, last_price); price_time_sum / time_sum
//! ```

use super::types::Nanos;

/// Running time-weighted sum for one provider/symbol pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwapAccumulator {
    last_time_nanos: Nanos,
    last_price: f64,
    price_time_sum: f64,
    time_sum: i64,
}

impl TwapAccumulator {
    /// Start accumulating from a first observation.
    #[inline]
    pub fn start(time_nanos: Nanos, price: f64) -> Self {
        Self {
            last_time_nanos: time_nanos,
            last_price: price,
            price_time_sum: 0.0,
            time_sum: 0,
        }
    }

    /// Fold in a new observation.
    ///
    /// # Panics
    ///
    /// Panics if `time_nanos` is before the previous observation for this pair.
    #[inline]
    pub fn observe(&mut self, time_nanos: Nanos, price: f64) {
        let delta = time_nanos - self.last_time_nanos;
        assert!(
            delta >= 0,
            "tick time went backwards for pair: {} < {}",
            time_nanos,
            self.last_time_nanos
        );
        self.price_time_sum += self.last_price * delta as f64;
        self.time_sum += delta;
        self.last_time_nanos = time_nanos;
        self.last_price = price;
    }

    /// Extend the last price forward to `boundary_nanos` and return the TWAP.
    ///
    /// The extension is folded into the running sums and moves the pair's last
    /// time to the boundary, so the caller reports each boundary once. A pair
    /// with no elapsed time yields a non-finite value (0 / 0).
    #[inline]
    pub fn report(&mut self, boundary_nanos: Nanos) -> f64 {
        self.observe(boundary_nanos, self.last_price);
        self.price_time_sum / self.time_sum as f64
    }

    pub fn last_time_nanos(&self) -> Nanos {
        self.last_time_nanos
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    pub fn price_time_sum(&self) -> f64 {
        self.price_time_sum
    }

    pub fn time_sum(&self) -> i64 {
        self.time_sum
    }
}

/// Accumulators indexed by provider id, then symbol id.
///
/// Grows on demand, never shrinks. Cells for ids that have not ticked yet are
/// `None`.
#[derive(Debug, Clone, Default)]
pub struct AggregationMatrix {
    providers: Vec<Vec<Option<TwapAccumulator>>>,
    active_pairs: usize,
}

impl AggregationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick for (provider, symbol), growing the matrix as needed.
    #[inline]
    pub fn observe(&mut self, provider_id: u32, symbol_id: u32, time_nanos: Nanos, price: f64) {
        let provider = provider_id as usize;
        let symbol = symbol_id as usize;
        if provider >= self.providers.len() {
            self.providers.resize_with(provider + 1, Vec::new);
        }
        let symbols = &mut self.providers[provider];
        if symbol >= symbols.len() {
            symbols.resize(symbol + 1, None);
        }
        match &mut symbols[symbol] {
            Some(acc) => acc.observe(time_nanos, price),
            cell @ None => {
                *cell = Some(TwapAccumulator::start(time_nanos, price));
                self.active_pairs += 1;
            }
        }
    }

    pub fn get(&self, provider_id: u32, symbol_id: u32) -> Option<&TwapAccumulator> {
        self.providers
            .get(provider_id as usize)?
            .get(symbol_id as usize)?
            .as_ref()
    }

    /// Number of pairs that have seen at least one tick.
    pub fn active_pairs(&self) -> usize {
        self.active_pairs
    }

    /// Visit every active pair in ascending (provider, symbol) order.
    pub fn for_each_active_mut<F, E>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(u32, u32, &mut TwapAccumulator) -> Result<(), E>,
    {
        for (provider, symbols) in self.providers.iter_mut().enumerate() {
            for (symbol, cell) in symbols.iter_mut().enumerate() {
                if let Some(acc) = cell {
                    f(provider as u32, symbol as u32, acc)?;
                }
            }
        }
        Ok(())
    }
}
