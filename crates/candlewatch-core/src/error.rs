use thiserror::Error;

/// Errors raised by the indicator engine (C3).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("insufficient context: need at least {required} bars, got {actual}")]
    InsufficientContext { required: usize, actual: usize },
}

/// Errors raised by the ingestion coordinator (C4).
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("ingest batch must be non-empty")]
    EmptyBatch,

    #[error(transparent)]
    Store(#[from] candlewatch_data::StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors raised by the aggregator (C5).
#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error(transparent)]
    Store(#[from] candlewatch_data::StoreError),
}

/// Errors raised by `ConfigureMonitor` (C6) and process configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} out of range: {reason}")]
    Validation { field: &'static str, reason: String },
}
