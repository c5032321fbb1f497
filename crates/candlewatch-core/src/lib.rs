//! CandleWatch core: numerical kernel, indicator engine, ingestion
//! coordinator, five-minute aggregator, BBW pattern monitor, dashboard
//! broadcaster, clock, and process configuration (C2-C8).

pub mod aggregator;
pub mod broadcaster;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod kernel;
pub mod monitor;

pub use aggregator::FiveMinuteAggregator;
pub use broadcaster::{DashboardBroadcaster, DashboardSnapshot};
pub use clock::{Clock, SystemClock, TestClock};
pub use config::{Config, MonitorConfig, MonitorConfigUpdate};
pub use coordinator::IngestionCoordinator;
pub use engine::IndicatorEngine;
pub use events::FiveMinCloseEvent;
pub use monitor::{
    AlertKind, AlertRecord, BbwMonitor, InstrumentProfile, MonitorEvaluation, PatternStrength,
    Trend,
};
