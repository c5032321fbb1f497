use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The set of bar intervals the store and engine understand.
///
/// `M1` bars come from ingestion (C4); `M5` bars are produced by the
/// aggregator (C5) and never persisted. `D1` is carried for completeness of
/// the persisted schema (spec §6) but nothing in this crate currently writes
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    M1,
    M5,
    D1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::D1 => "1d",
        }
    }

    pub fn duration_secs(&self) -> i64 {
        match self {
            Interval::M1 => 60,
            Interval::M5 => 300,
            Interval::D1 => 86_400,
        }
    }

    /// Floors a unix timestamp (seconds) to the start of the interval it
    /// belongs to.
    pub fn bar_start(&self, unix_ts: i64) -> i64 {
        let d = self.duration_secs();
        (unix_ts.div_euclid(d)) * d
    }

    pub fn all() -> &'static [Interval] {
        &[Interval::M1, Interval::M5, Interval::D1]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown interval: {0}")]
pub struct ParseIntervalError(String);

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "1d" => Ok(Interval::D1),
            other => Err(ParseIntervalError(other.to_string())),
        }
    }
}
