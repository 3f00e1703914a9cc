//! Row Sources and Sinks
//!
//! Push-style contracts between tick producers, the aggregator, and report
//! consumers. A source drives a visitor over its rows once, synchronously; a
//! sink accepts one report row at a time. Both are fallible so decode and
//! write errors travel back to whoever started the run.

use super::types::{InputRow, OutputRow};
use anyhow::Result;

/// A single-pass, push-driven producer of ticks.
pub trait RowSource {
    /// Call `visit` for every row in order, stopping at the first error.
    fn for_each_row<F>(&mut self, visit: F) -> Result<()>
    where
        F: FnMut(InputRow) -> Result<()>;
}

/// A consumer of report rows.
pub trait RowSink {
    fn accept(&mut self, row: OutputRow) -> Result<()>;
}

impl RowSource for [InputRow] {
    fn for_each_row<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(InputRow) -> Result<()>,
    {
        self.iter().try_for_each(|row| visit(*row))
    }
}

impl RowSource for Vec<InputRow> {
    fn for_each_row<F>(&mut self, visit: F) -> Result<()>
    where
        F: FnMut(InputRow) -> Result<()>,
    {
        self.as_mut_slice().for_each_row(visit)
    }
}

/// Adapts any iterator of ticks into a [`RowSource`].
pub struct IterSource<I>(pub I);

impl<I> RowSource for IterSource<I>
where
    I: Iterator<Item = InputRow>,
{
    fn for_each_row<F>(&mut self, visit: F) -> Result<()>
    where
        F: FnMut(InputRow) -> Result<()>,
    {
        self.0.by_ref().try_for_each(visit)
    }
}

/// Adapts a closure that pushes rows into a visitor.
///
/// ```ignore
/// let mut source = FnSource(|visit: &mut dyn FnMut(InputRow) -> Result<()>| {
///     visit(InputRow::new(1_000_000_000_001, 17, 23, 100.0))
/// });
/// ```
pub struct FnSource<G>(pub G);

impl<G> RowSource for FnSource<G>
where
    G: FnMut(&mut dyn FnMut(InputRow) -> Result<()>) -> Result<()>,
{
    fn for_each_row<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(InputRow) -> Result<()>,
    {
        (self.0)(&mut visit)
    }
}

impl RowSink for Vec<OutputRow> {
    fn accept(&mut self, row: OutputRow) -> Result<()> {
        self.push(row);
        Ok(())
    }
}

/// Adapts a closure into a [`RowSink`].
pub struct FnSink<G>(pub G);

impl<G> RowSink for FnSink<G>
where
    G: FnMut(OutputRow) -> Result<()>,
{
    fn accept(&mut self, row: OutputRow) -> Result<()> {
        (self.0)(row)
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn accept(&mut self, row: OutputRow) -> Result<()> {
        (**self).accept(row)
    }
}

/// Counts rows passing through to an inner sink.
pub struct CountingSink<S> {
    inner: S,
    count: u64,
}

impl<S: RowSink> CountingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RowSink> RowSink for CountingSink<S> {
    fn accept(&mut self, row: OutputRow) -> Result<()> {
        self.count += 1;
        self.inner.accept(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn rows() -> Vec<InputRow> {
        (0..5)
            .map(|i| InputRow::new(1_000 + i, 0, i as u32, i as f64))
            .collect()
    }

    #[test]
    fn test_vec_source_visits_in_order() {
        let mut source = rows();
        let mut seen = Vec::new();
        source
            .for_each_row(|row| {
                seen.push(row.time_nanos);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![1_000, 1_001, 1_002, 1_003, 1_004]);
    }

    #[test]
    fn test_source_stops_on_visitor_error() {
        let mut source = IterSource(rows().into_iter());
        let mut visited = 0;
        let result = source.for_each_row(|row| {
            visited += 1;
            if row.symbol_id == 2 {
                bail!("sink full");
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_fn_source_and_counting_sink() {
        let mut source = FnSource(|visit: &mut dyn FnMut(InputRow) -> Result<()>| {
            visit(InputRow::new(1, 2, 3, 4.0))?;
            visit(InputRow::new(2, 2, 3, 5.0))
        });
        let mut seen = Vec::new();
        source
            .for_each_row(|row| {
                seen.push(row);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen.len(), 2);

        let mut sink = CountingSink::new(Vec::new());
        sink.accept(OutputRow::new(15, 0, 0, 1.0)).unwrap();
        sink.accept(OutputRow::new(30, 0, 0, 1.0)).unwrap();
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.into_inner().len(), 2);
    }
}
