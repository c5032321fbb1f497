use candlewatch_data::{Bar, BarStore, Database, Interval, MemoryBarStore, StoreError};

fn bar(ts: i64, close: f64) -> Bar {
    Bar::new(
        "NSE:HDFCBANK".to_string(),
        Interval::M1,
        ts,
        close - 1.0,
        close + 1.0,
        close - 2.0,
        close,
        10_000,
        0,
    )
}

#[test]
fn sqlite_store_round_trips_a_batch() {
    let db = Database::open_memory().unwrap();
    let bars: Vec<Bar> = (0..10).map(|i| bar(i * 60, 1600.0 + i as f64)).collect();
    let inserted = db.put_bars(&bars).unwrap();
    assert_eq!(inserted, 10);

    let got = db.get_range("NSE:HDFCBANK", Interval::M1, 0, 600).unwrap();
    assert_eq!(got.len(), 10);
    assert!(got.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn memory_store_rejects_shrinking_update() {
    let store = MemoryBarStore::new();
    let mut enriched = bar(60, 100.0);
    enriched.ema9 = Some(100.0);
    enriched.rsi14 = Some(55.0);
    store.put_bar(&enriched).unwrap();

    let less_complete = bar(60, 100.0);
    let err = store.put_bar(&less_complete).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateIncomplete { .. }));
}

#[test]
fn stores_agree_on_empty_range() {
    let sqlite = Database::open_memory().unwrap();
    let mem = MemoryBarStore::new();
    assert!(sqlite
        .get_range("NSE:HDFCBANK", Interval::M1, 0, 100)
        .unwrap()
        .is_empty());
    assert!(mem
        .get_range("NSE:HDFCBANK", Interval::M1, 0, 100)
        .unwrap()
        .is_empty());
}
