use crate::error::Result;
use crate::interval::Interval;
use crate::models::Bar;

/// The bar store contract (C1). Every implementation must uphold the
/// system-wide ordering invariant: all reads return bars in chronological
/// (oldest → newest) order. No component downstream of the store is
/// permitted to reverse that order.
pub trait BarStore: Send + Sync {
    /// Upserts by `(instrument_key, interval, timestamp)`. Fails with
    /// `StoreError::DuplicateIncomplete` if the existing bar has strictly
    /// more populated indicator fields than `bar`.
    fn put_bar(&self, bar: &Bar) -> Result<()>;

    /// Bulk upsert, atomic per batch. Returns the count inserted/updated.
    fn put_bars(&self, bars: &[Bar]) -> Result<usize>;

    /// Bars with `start <= timestamp < end`, oldest → newest. Empty range
    /// yields an empty sequence.
    fn get_range(
        &self,
        instrument_key: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<Vec<Bar>>;

    /// The most recent `n` bars at or before `now`, oldest → newest. Returns
    /// all available bars if fewer than `n` exist.
    fn get_last_n(
        &self,
        instrument_key: &str,
        interval: Interval,
        n: usize,
        now: i64,
    ) -> Result<Vec<Bar>>;

    /// The single most recent bar, or `None` if none exists.
    fn get_latest(&self, instrument_key: &str, interval: Interval) -> Result<Option<Bar>>;
}
