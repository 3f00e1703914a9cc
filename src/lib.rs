//! Tick TWAP Library
//!
//! Streaming time-weighted average price aggregation over provider/symbol
//! tick streams, a chunked column-compressed tick format, and Parquet
//! interchange. Exposed for the binaries and integration tests.

pub mod chunked;
pub mod parquet_io;
pub mod twap;
