use thiserror::Error;

/// Error taxonomy for the bar store (C1), per spec §7.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store rejected put: existing bar at {instrument_key}/{interval}/{timestamp} is more complete than the incoming one")]
    DuplicateIncomplete {
        instrument_key: String,
        interval: String,
        timestamp: i64,
    },

    #[error("invalid bar: {0}")]
    Validation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to initialize store: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
