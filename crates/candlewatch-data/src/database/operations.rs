use rusqlite::{params, Connection, Row};

use super::connection::Database;
use crate::error::{Result, StoreError};
use crate::interval::Interval;
use crate::models::Bar;
use crate::store::BarStore;

fn row_to_bar(row: &Row) -> rusqlite::Result<Bar> {
    let interval_str: String = row.get("interval")?;
    let interval = interval_str.parse::<Interval>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Bar {
        instrument_key: row.get("instrument_key")?,
        interval,
        timestamp: row.get("timestamp")?,
        open: row.get("open")?,
        high: row.get("high")?,
        low: row.get("low")?,
        close: row.get("close")?,
        volume: row.get("volume")?,
        open_interest: row.get("open_interest")?,
        incomplete_period: row.get::<_, i64>("incomplete_period")? != 0,
        sma9: row.get("sma9")?,
        ema5: row.get("ema5")?,
        ema9: row.get("ema9")?,
        ema20: row.get("ema20")?,
        ema50: row.get("ema50")?,
        rsi14: row.get("rsi14")?,
        atr14: row.get("atr14")?,
        vwap: row.get("vwap")?,
        bb_upper: row.get("bb_upper")?,
        bb_middle: row.get("bb_middle")?,
        bb_lower: row.get("bb_lower")?,
        bb_width_abs: row.get("bb_width_abs")?,
        bb_width_norm: row.get("bb_width_norm")?,
        bb_width_pct: row.get("bb_width_pct")?,
    })
}

const SELECT_COLUMNS: &str = "instrument_key, interval, timestamp, open, high, low, close, \
     volume, open_interest, incomplete_period, sma9, ema5, ema9, ema20, ema50, rsi14, atr14, \
     vwap, bb_upper, bb_middle, bb_lower, bb_width_abs, bb_width_norm, bb_width_pct";

fn existing_indicator_count(
    conn: &Connection,
    bar: &Bar,
) -> rusqlite::Result<Option<usize>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM bars WHERE instrument_key = ?1 AND interval = ?2 AND timestamp = ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let existing = stmt
        .query_row(
            params![bar.instrument_key, bar.interval.as_str(), bar.timestamp],
            row_to_bar,
        )
        .map(|b| Some(b.populated_indicator_count()));
    match existing {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn upsert_one(conn: &Connection, bar: &Bar) -> Result<()> {
    if !bar.is_valid() {
        return Err(StoreError::Validation(format!(
            "bar {}/{}/{} fails OHLCV invariants",
            bar.instrument_key, bar.interval, bar.timestamp
        )));
    }

    if let Some(existing_count) = existing_indicator_count(conn, bar)? {
        if existing_count > bar.populated_indicator_count() {
            return Err(StoreError::DuplicateIncomplete {
                instrument_key: bar.instrument_key.clone(),
                interval: bar.interval.as_str().to_string(),
                timestamp: bar.timestamp,
            });
        }
    }

    conn.execute(
        "INSERT INTO bars (instrument_key, interval, timestamp, open, high, low, close, \
         volume, open_interest, incomplete_period, sma9, ema5, ema9, ema20, ema50, rsi14, \
         atr14, vwap, bb_upper, bb_middle, bb_lower, bb_width_abs, bb_width_norm, bb_width_pct) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21, ?22, ?23, ?24) \
         ON CONFLICT(instrument_key, interval, timestamp) DO UPDATE SET \
         open = excluded.open, high = excluded.high, low = excluded.low, close = excluded.close, \
         volume = excluded.volume, open_interest = excluded.open_interest, \
         incomplete_period = excluded.incomplete_period, sma9 = excluded.sma9, \
         ema5 = excluded.ema5, ema9 = excluded.ema9, ema20 = excluded.ema20, \
         ema50 = excluded.ema50, rsi14 = excluded.rsi14, atr14 = excluded.atr14, \
         vwap = excluded.vwap, bb_upper = excluded.bb_upper, bb_middle = excluded.bb_middle, \
         bb_lower = excluded.bb_lower, bb_width_abs = excluded.bb_width_abs, \
         bb_width_norm = excluded.bb_width_norm, bb_width_pct = excluded.bb_width_pct",
        params![
            bar.instrument_key,
            bar.interval.as_str(),
            bar.timestamp,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.open_interest,
            bar.incomplete_period as i64,
            bar.sma9,
            bar.ema5,
            bar.ema9,
            bar.ema20,
            bar.ema50,
            bar.rsi14,
            bar.atr14,
            bar.vwap,
            bar.bb_upper,
            bar.bb_middle,
            bar.bb_lower,
            bar.bb_width_abs,
            bar.bb_width_norm,
            bar.bb_width_pct,
        ],
    )?;

    Ok(())
}

impl BarStore for Database {
    fn put_bar(&self, bar: &Bar) -> Result<()> {
        self.with_connection(|conn| upsert_one(conn, bar))
    }

    fn put_bars(&self, bars: &[Bar]) -> Result<usize> {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            for bar in bars {
                upsert_one(&tx, bar)?;
            }
            tx.commit()?;
            Ok(bars.len())
        })
    }

    fn get_range(
        &self,
        instrument_key: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<Vec<Bar>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM bars WHERE instrument_key = ?1 AND interval = ?2 \
                 AND timestamp >= ?3 AND timestamp < ?4 ORDER BY timestamp ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![instrument_key, interval.as_str(), start, end],
                row_to_bar,
            )?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn get_last_n(
        &self,
        instrument_key: &str,
        interval: Interval,
        n: usize,
        now: i64,
    ) -> Result<Vec<Bar>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM bars WHERE instrument_key = ?1 AND interval = ?2 \
                 AND timestamp <= ?3 ORDER BY timestamp DESC LIMIT ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![instrument_key, interval.as_str(), now, n as i64],
                row_to_bar,
            )?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out.reverse();
            Ok(out)
        })
    }

    fn get_latest(&self, instrument_key: &str, interval: Interval) -> Result<Option<Bar>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM bars WHERE instrument_key = ?1 AND interval = ?2 \
                 ORDER BY timestamp DESC LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map(params![instrument_key, interval.as_str()], row_to_bar)?;
            match rows.next() {
                Some(bar) => Ok(Some(bar?)),
                None => Ok(None),
            }
        })
    }
}
