use candlewatch_data::Bar;
use serde::{Deserialize, Serialize};

/// Emitted by the aggregator (C5) at each five-minute boundary, carrying the
/// last fully-completed aggregated bar for one instrument. Consumed by the
/// monitor (C6) and the dashboard broadcaster (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiveMinCloseEvent {
    pub instrument_key: String,
    pub bar: Bar,
}

impl FiveMinCloseEvent {
    pub fn new(instrument_key: String, bar: Bar) -> Self {
        Self {
            instrument_key,
            bar,
        }
    }
}
