//! Streaming TWAP Aggregation
//!
//! Ticks tagged by provider and symbol flow in through a [`RowSource`];
//! time-weighted average prices per provider/symbol pair flow out to a
//! [`RowSink`] at every window boundary.
//!
//! ```text
//!  RowSource ──push──▶ WindowedAggregator ──accept──▶ RowSink
//!  (Vec, chunked        │ AggregationMatrix            (Vec, Parquet
//!   file, synthetic)    │ [provider][symbol]            report writer)
//!                       ▼
//!                 TwapAccumulator
//! ```
//!
//! Memory is proportional to the number of distinct pairs, never to stream
//! length. Input must be non-decreasing in time; violations panic.

pub mod accumulator;
pub mod aggregator;
pub mod config;
pub mod dictionary;
pub mod source;
pub mod synthetic;
pub mod types;

pub use accumulator::{AggregationMatrix, TwapAccumulator};
pub use aggregator::{compute_twap, compute_twap_default, first_boundary, AggregatorStats, WindowedAggregator};
pub use config::TwapConfig;
pub use dictionary::Dictionary;
pub use source::{CountingSink, FnSink, FnSource, IterSource, RowSink, RowSource};
pub use synthetic::SyntheticTicks;
pub use types::{InputRow, Nanos, OutputRow, DEFAULT_WINDOW_NANOS, NANOS_PER_MILLI, NANOS_PER_SEC};
