//! Windowed TWAP Aggregator
//!
//! Converts a non-decreasing tick stream into per-pair TWAP reports at fixed
//! window boundaries, holding one accumulator per provider/symbol pair and
//! nothing proportional to stream length.
//!
//! # Boundary Rule
//!
//! For the first tick at time `t` and window `W`:
//!
//! ```text
//! first_boundary = ((t + W) / W) * W      // integer division
//! ```
//!
//! i.e. the smallest multiple of `W` strictly greater than `t`. Every later
//! tick at or past the current boundary triggers one flush per boundary
//! crossed before it is accumulated. After the source is exhausted there is
//! one final, unconditional flush.
//!
//! # Output Ordering
//!
//! Reports are emitted in non-decreasing boundary order, and within a boundary
//! in ascending (provider id, symbol id) order. Pairs that have never ticked
//! emit nothing.

use super::accumulator::AggregationMatrix;
use super::source::{RowSink, RowSource};
use super::types::{InputRow, Nanos, OutputRow, DEFAULT_WINDOW_NANOS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Counters for one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorStats {
    pub rows_in: u64,
    pub rows_out: u64,
    pub windows_flushed: u64,
    pub active_pairs: usize,
}

/// Push-driven windowed aggregator.
///
/// Feed ticks with [`push`](Self::push), then call [`finish`](Self::finish)
/// exactly once; `finish` consumes the aggregator so the trailing boundary
/// cannot be flushed twice.
#[derive(Debug)]
pub struct WindowedAggregator {
    window_nanos: Nanos,
    next_report_nanos: Option<Nanos>,
    last_time_nanos: Nanos,
    matrix: AggregationMatrix,
    stats: AggregatorStats,
}

impl WindowedAggregator {
    /// # Panics
    ///
    /// Panics if `window_nanos` is not positive.
    pub fn new(window_nanos: Nanos) -> Self {
        assert!(window_nanos > 0, "window_nanos must be positive, got {}", window_nanos);
        Self {
            window_nanos,
            next_report_nanos: None,
            last_time_nanos: Nanos::MIN,
            matrix: AggregationMatrix::new(),
            stats: AggregatorStats::default(),
        }
    }

    pub fn window_nanos(&self) -> Nanos {
        self.window_nanos
    }

    /// Boundary the next flush will report at, once the first tick arrived.
    pub fn next_report_nanos(&self) -> Option<Nanos> {
        self.next_report_nanos
    }

    pub fn matrix(&self) -> &AggregationMatrix {
        &self.matrix
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            active_pairs: self.matrix.active_pairs(),
            ..self.stats
        }
    }

    /// Accumulate one tick, flushing every boundary it crosses first.
    ///
    /// # Panics
    ///
    /// Panics if `row.time_nanos` is earlier than the previous tick.
    pub fn push<S: RowSink + ?Sized>(&mut self, row: InputRow, sink: &mut S) -> Result<()> {
        assert!(
            row.time_nanos >= self.last_time_nanos,
            "input not time-ordered: {} after {}",
            row.time_nanos,
            self.last_time_nanos
        );
        self.last_time_nanos = row.time_nanos;

        match self.next_report_nanos {
            None => {
                self.next_report_nanos = Some(first_boundary(row.time_nanos, self.window_nanos));
            }
            Some(_) => {
                while let Some(boundary) = self.next_report_nanos.filter(|&b| row.time_nanos >= b) {
                    self.flush(boundary, sink)?;
                }
            }
        }

        self.matrix
            .observe(row.provider_id, row.symbol_id, row.time_nanos, row.price);
        self.stats.rows_in += 1;
        Ok(())
    }

    /// Final flush at the pending boundary. No-op if no tick was ever pushed.
    pub fn finish<S: RowSink + ?Sized>(mut self, sink: &mut S) -> Result<AggregatorStats> {
        if let Some(boundary) = self.next_report_nanos {
            self.flush(boundary, sink)?;
        }
        let stats = self.stats();
        debug!(
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            windows = stats.windows_flushed,
            pairs = stats.active_pairs,
            "TWAP aggregation finished"
        );
        Ok(stats)
    }

    fn flush<S: RowSink + ?Sized>(&mut self, boundary: Nanos, sink: &mut S) -> Result<()> {
        let mut emitted = 0u64;
        self.matrix.for_each_active_mut(|provider_id, symbol_id, acc| {
            let twap = acc.report(boundary);
            emitted += 1;
            sink.accept(OutputRow::new(boundary, provider_id, symbol_id, twap))
        })?;
        self.stats.rows_out += emitted;
        self.stats.windows_flushed += 1;
        let next = boundary
            .checked_add(self.window_nanos)
            .expect("report boundary overflows i64 nanoseconds; ticks must stay a window below i64::MAX");
        self.next_report_nanos = Some(next);
        Ok(())
    }
}

/// Smallest multiple of `window_nanos` strictly greater than `time_nanos`.
///
/// # Panics
///
/// Panics if the boundary does not fit in an `i64`.
#[inline]
pub fn first_boundary(time_nanos: Nanos, window_nanos: Nanos) -> Nanos {
    time_nanos
        .checked_add(window_nanos)
        .map(|t| (t / window_nanos) * window_nanos)
        .expect("first boundary overflows i64 nanoseconds; ticks must stay a window below i64::MAX")
}

/// Drive `source` through a fresh aggregator into `sink`.
pub fn compute_twap<Src, Snk>(source: &mut Src, sink: &mut Snk, window_nanos: Nanos) -> Result<AggregatorStats>
where
    Src: RowSource + ?Sized,
    Snk: RowSink + ?Sized,
{
    let mut aggregator = WindowedAggregator::new(window_nanos);
    source.for_each_row(|row| aggregator.push(row, sink))?;
    aggregator.finish(sink)
}

/// [`compute_twap`] with the default 15 second window.
pub fn compute_twap_default<Src, Snk>(source: &mut Src, sink: &mut Snk) -> Result<AggregatorStats>
where
    Src: RowSource + ?Sized,
    Snk: RowSink + ?Sized,
{
    compute_twap(source, sink, DEFAULT_WINDOW_NANOS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twap::source::{FnSink, IterSource};
    use crate::twap::synthetic::SyntheticTicks;
    use crate::twap::types::{NANOS_PER_MILLI, NANOS_PER_SEC};
    use anyhow::bail;

    fn run(rows: Vec<InputRow>, window: Nanos) -> Vec<OutputRow> {
        let mut source = rows;
        let mut out = Vec::new();
        compute_twap(&mut source, &mut out, window).unwrap();
        out
    }

    #[test]
    fn test_single_tick_default_window() {
        let mut source = vec![InputRow::new(1_000_000_000_001, 17, 23, 100.0)];
        let mut out = Vec::new();
        let stats = compute_twap_default(&mut source, &mut out).unwrap();
        assert_eq!(out, vec![OutputRow::new(1_005_000_000_000, 17, 23, 100.0)]);
        assert_eq!(stats.windows_flushed, 1);
        assert_eq!(stats.active_pairs, 1);
    }

    #[test]
    fn test_first_boundary_on_exact_multiple() {
        assert_eq!(first_boundary(30, 15), 45);
        assert_eq!(first_boundary(31, 15), 45);
        assert_eq!(first_boundary(44, 15), 45);
    }

    #[test]
    #[should_panic(expected = "first boundary overflows")]
    fn test_first_boundary_near_max_panics() {
        first_boundary(i64::MAX - 5, 10);
    }

    #[test]
    #[should_panic(expected = "report boundary overflows")]
    fn test_last_boundary_near_max_panics() {
        // first boundary fits, the one after it does not
        let window = 1_000;
        let t = (i64::MAX / window - 1) * window;
        run(vec![InputRow::new(t, 0, 0, 1.0)], window);
    }

    #[test]
    fn test_empty_source_emits_nothing() {
        let out = run(Vec::new(), 15);
        assert!(out.is_empty());
    }

    #[test]
    fn test_two_prices_in_one_window() {
        // 10.0 for 4ns, 20.0 for 6ns until boundary 20.
        let out = run(
            vec![InputRow::new(10, 0, 0, 10.0), InputRow::new(14, 0, 0, 20.0)],
            10,
        );
        assert_eq!(out, vec![OutputRow::new(20, 0, 0, 16.0)]);
    }

    #[test]
    fn test_one_flush_per_boundary_crossed() {
        // First boundary 10; tick at 35 crosses 10, 20, 30; trailing flush at 40.
        let out = run(
            vec![InputRow::new(1, 0, 0, 5.0), InputRow::new(35, 0, 0, 7.0)],
            10,
        );
        let times: Vec<Nanos> = out.iter().map(|r| r.report_time_nanos).collect();
        assert_eq!(times, vec![10, 20, 30, 40]);
        assert!(out[..3].iter().all(|r| r.twap == 5.0));
        // 5.0 over [1, 35) = 34ns, 7.0 over [35, 40) = 5ns.
        assert_eq!(out[3].twap, (5.0 * 34.0 + 7.0 * 5.0) / 39.0);
    }

    #[test]
    fn test_tick_on_boundary_belongs_to_next_window() {
        let out = run(
            vec![InputRow::new(5, 0, 0, 1.0), InputRow::new(10, 0, 0, 3.0)],
            10,
        );
        assert_eq!(out[0], OutputRow::new(10, 0, 0, 1.0));
        assert_eq!(out[1].report_time_nanos, 20);
        assert_eq!(out[1].twap, (1.0 * 5.0 + 3.0 * 10.0) / 15.0);
    }

    #[test]
    fn test_pairs_join_on_later_boundaries() {
        let out = run(
            vec![
                InputRow::new(1, 1, 0, 100.0),
                InputRow::new(12, 0, 4, 50.0),
                InputRow::new(25, 1, 0, 101.0),
            ],
            10,
        );
        let keys: Vec<(Nanos, u32, u32)> = out
            .iter()
            .map(|r| (r.report_time_nanos, r.provider_id, r.symbol_id))
            .collect();
        assert_eq!(
            keys,
            vec![(10, 1, 0), (20, 0, 4), (20, 1, 0), (30, 0, 4), (30, 1, 0)]
        );
    }

    #[test]
    fn test_output_sorted_by_boundary_then_pair() {
        let mut source = SyntheticTicks::new(1_000 * NANOS_PER_SEC, 7 * NANOS_PER_MILLI, 10_000)
            .providers(4)
            .symbols(9)
            .into_source();
        let mut out = Vec::new();
        compute_twap(&mut source, &mut out, NANOS_PER_SEC).unwrap();
        assert!(out
            .windows(2)
            .all(|w| (w[0].report_time_nanos, w[0].provider_id, w[0].symbol_id)
                < (w[1].report_time_nanos, w[1].provider_id, w[1].symbol_id)));
        assert!(out.iter().all(|r| r.report_time_nanos % NANOS_PER_SEC == 0));
    }

    #[test]
    fn test_constant_price_reports_constant_twap() {
        let rows: Vec<InputRow> = (0..100)
            .map(|i| InputRow::new(1_000 + i * 3, (i % 2) as u32, (i % 5) as u32, 42.0))
            .collect();
        let out = run(rows, 50);
        assert!(!out.is_empty());
        assert!(out.iter().all(|r| r.twap == 42.0));
    }

    #[test]
    fn test_boundary_count_matches_span() {
        let window = 10 * NANOS_PER_MILLI;
        let first = 1_000 * NANOS_PER_SEC + 3;
        let last = first + 95 * NANOS_PER_MILLI;
        let out = run(
            vec![InputRow::new(first, 0, 0, 1.0), InputRow::new(last, 0, 0, 2.0)],
            window,
        );
        let first_b = first_boundary(first, window);
        let expected = ((last - first_b) / window + 2) as usize;
        assert_eq!(out.len(), expected);
    }

    #[test]
    fn test_sink_error_aborts_run() {
        let mut source = IterSource(
            (0..10).map(|i| InputRow::new(1 + i * 10, 0, 0, 1.0)),
        );
        let mut sink = FnSink(|row: OutputRow| {
            if row.report_time_nanos >= 30 {
                bail!("disk full");
            }
            Ok(())
        });
        let err = compute_twap(&mut source, &mut sink, 10).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    #[should_panic(expected = "not time-ordered")]
    fn test_out_of_order_input_panics() {
        run(
            vec![InputRow::new(100, 0, 0, 1.0), InputRow::new(99, 1, 1, 1.0)],
            10,
        );
    }

    #[test]
    fn test_stats_track_rows() {
        let mut agg = WindowedAggregator::new(10);
        let mut out = Vec::new();
        for i in 0..25 {
            agg.push(InputRow::new(1 + i, 0, (i % 3) as u32, 1.0), &mut out)
                .unwrap();
        }
        assert_eq!(agg.next_report_nanos(), Some(30));
        let stats = agg.finish(&mut out).unwrap();
        assert_eq!(stats.rows_in, 25);
        assert_eq!(stats.rows_out, out.len() as u64);
        assert_eq!(stats.windows_flushed, 3);
        assert_eq!(stats.active_pairs, 3);
    }
}
