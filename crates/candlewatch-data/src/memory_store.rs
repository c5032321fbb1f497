use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::interval::Interval;
use crate::models::Bar;
use crate::store::BarStore;

type Key = (String, Interval, i64);

/// An in-memory `BarStore`, backed by a sorted map so range reads are
/// naturally chronological. Used for fast unit tests of C3/C4/C5 without
/// touching SQLite.
#[derive(Default)]
pub struct MemoryBarStore {
    bars: Mutex<BTreeMap<Key, Bar>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert_locked(map: &mut BTreeMap<Key, Bar>, bar: &Bar) -> Result<bool> {
        if !bar.is_valid() {
            return Err(StoreError::Validation(format!(
                "bar {}/{}/{} fails OHLCV invariants",
                bar.instrument_key, bar.interval, bar.timestamp
            )));
        }
        let key = (bar.instrument_key.clone(), bar.interval, bar.timestamp);
        if let Some(existing) = map.get(&key) {
            if existing.populated_indicator_count() > bar.populated_indicator_count() {
                return Err(StoreError::DuplicateIncomplete {
                    instrument_key: bar.instrument_key.clone(),
                    interval: bar.interval.as_str().to_string(),
                    timestamp: bar.timestamp,
                });
            }
        }
        let inserted = map.insert(key, bar.clone()).is_none();
        Ok(inserted)
    }
}

impl BarStore for MemoryBarStore {
    fn put_bar(&self, bar: &Bar) -> Result<()> {
        let mut map = self.bars.lock().unwrap();
        Self::upsert_locked(&mut map, bar)?;
        Ok(())
    }

    fn put_bars(&self, bars: &[Bar]) -> Result<usize> {
        let mut map = self.bars.lock().unwrap();
        // Apply the whole batch to a staged copy first and only swap it in
        // on full success, so the put is all-or-nothing at this store's
        // transactional boundary (spec §4.1) — the same guarantee
        // `Database::put_bars` gets from `conn.transaction()`/rollback.
        // Staging (rather than a two-pass pre-check against the pre-batch
        // map) also preserves intra-batch correction: a later bar in the
        // same batch still sees the staged effect of an earlier one.
        let mut staged = map.clone();
        let mut count = 0;
        for bar in bars {
            Self::upsert_locked(&mut staged, bar)?;
            count += 1;
        }
        *map = staged;
        Ok(count)
    }

    fn get_range(
        &self,
        instrument_key: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<Vec<Bar>> {
        let map = self.bars.lock().unwrap();
        Ok(map
            .range((instrument_key.to_string(), interval, start)..(instrument_key.to_string(), interval, end))
            .map(|(_, bar)| bar.clone())
            .collect())
    }

    fn get_last_n(
        &self,
        instrument_key: &str,
        interval: Interval,
        n: usize,
        now: i64,
    ) -> Result<Vec<Bar>> {
        let map = self.bars.lock().unwrap();
        let mut matches: Vec<Bar> = map
            .range(..=(instrument_key.to_string(), interval, now))
            .rev()
            .filter(|((key_inst, key_iv, _), _)| key_inst == instrument_key && *key_iv == interval)
            .take(n)
            .map(|(_, bar)| bar.clone())
            .collect();
        matches.reverse();
        Ok(matches)
    }

    fn get_latest(&self, instrument_key: &str, interval: Interval) -> Result<Option<Bar>> {
        let map = self.bars.lock().unwrap();
        Ok(map
            .range(..(instrument_key.to_string(), interval, i64::MAX))
            .rev()
            .find(|((key_inst, key_iv, _), _)| key_inst == instrument_key && *key_iv == interval)
            .map(|(_, bar)| bar.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64) -> Bar {
        Bar::new(
            "NSE:TCS".to_string(),
            Interval::M1,
            ts,
            100.0,
            101.0,
            99.0,
            100.5,
            1000,
            0,
        )
    }

    #[test]
    fn reads_are_chronological() {
        let store = MemoryBarStore::new();
        store.put_bars(&[bar(180), bar(60), bar(120)]).unwrap();
        let got = store.get_range("NSE:TCS", Interval::M1, 0, 1000).unwrap();
        let timestamps: Vec<i64> = got.iter().map(|b| b.timestamp).collect();
        assert_eq!(timestamps, vec![60, 120, 180]);
    }

    #[test]
    fn get_last_n_returns_available_when_fewer_exist() {
        let store = MemoryBarStore::new();
        store.put_bars(&[bar(60), bar(120)]).unwrap();
        let got = store.get_last_n("NSE:TCS", Interval::M1, 10, 1000).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn duplicate_incomplete_is_rejected() {
        let store = MemoryBarStore::new();
        let mut enriched = bar(60);
        enriched.sma9 = Some(100.0);
        store.put_bar(&enriched).unwrap();

        let bare = bar(60);
        let err = store.put_bar(&bare).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIncomplete { .. }));
    }

    #[test]
    fn get_latest_returns_none_when_empty() {
        let store = MemoryBarStore::new();
        assert!(store.get_latest("NSE:TCS", Interval::M1).unwrap().is_none());
    }
}
