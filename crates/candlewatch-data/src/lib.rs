//! Bar storage: the `Bar`/`Interval` data model and the `BarStore` contract
//! (C1), plus a SQLite-backed and an in-memory implementation.

pub mod database;
pub mod error;
pub mod interval;
pub mod memory_store;
pub mod models;
pub mod store;

pub use database::Database;
pub use error::{Result, StoreError};
pub use interval::Interval;
pub use memory_store::MemoryBarStore;
pub use models::Bar;
pub use store::BarStore;
