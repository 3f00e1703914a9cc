//! Tick and Report Rows
//!
//! Plain-old-data rows flowing through the pipeline. Timestamps are Unix epoch
//! nanoseconds; provider and symbol are dense ids resolved through a
//! [`Dictionary`](super::dictionary::Dictionary).

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC).
pub type Nanos = i64;

pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Default report window: 15 seconds.
pub const DEFAULT_WINDOW_NANOS: Nanos = 15 * NANOS_PER_SEC;

/// One price tick.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct InputRow {
    pub time_nanos: Nanos,
    pub provider_id: u32,
    pub symbol_id: u32,
    pub price: f64,
}

impl InputRow {
    #[inline]
    pub fn new(time_nanos: Nanos, provider_id: u32, symbol_id: u32, price: f64) -> Self {
        Self {
            time_nanos,
            provider_id,
            symbol_id,
            price,
        }
    }
}

/// One TWAP value for a provider/symbol pair as of a window boundary.
///
/// `report_time_nanos` is always an exact multiple of the window size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub report_time_nanos: Nanos,
    pub provider_id: u32,
    pub symbol_id: u32,
    pub twap: f64,
}

impl OutputRow {
    #[inline]
    pub fn new(report_time_nanos: Nanos, provider_id: u32, symbol_id: u32, twap: f64) -> Self {
        Self {
            report_time_nanos,
            provider_id,
            symbol_id,
            twap,
        }
    }
}

/// Format epoch nanoseconds as an RFC 3339 UTC timestamp.
pub fn format_nanos(nanos: Nanos) -> String {
    Utc.timestamp_nanos(nanos)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl fmt::Display for InputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InputRow{{{}, {}, {}, {}}}",
            format_nanos(self.time_nanos),
            self.provider_id,
            self.symbol_id,
            self.price
        )
    }
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OutputRow{{{}, {}, {}, {}}}",
            format_nanos(self.report_time_nanos),
            self.provider_id,
            self.symbol_id,
            self.twap
        )
    }
}
