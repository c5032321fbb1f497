use rusqlite::Connection;

use crate::error::Result;

const BARS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS bars (
    instrument_key TEXT NOT NULL,
    interval TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER NOT NULL,
    open_interest INTEGER NOT NULL,
    incomplete_period INTEGER NOT NULL,
    sma9 REAL,
    ema5 REAL,
    ema9 REAL,
    ema20 REAL,
    ema50 REAL,
    rsi14 REAL,
    atr14 REAL,
    vwap REAL,
    bb_upper REAL,
    bb_middle REAL,
    bb_lower REAL,
    bb_width_abs REAL,
    bb_width_norm REAL,
    bb_width_pct REAL,
    PRIMARY KEY (instrument_key, interval, timestamp)
)"#;

const BARS_INDEX_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_bars_instrument_interval_timestamp
ON bars(instrument_key, interval, timestamp)
"#;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(BARS_TABLE_SCHEMA, [])?;
    conn.execute(BARS_INDEX_SCHEMA, [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialization() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'bars'",
            [],
            |row| row.get(0),
        )?;

        assert!(table_exists);
        Ok(())
    }
}
