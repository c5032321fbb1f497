pub use candlewatch_core as core;
pub use candlewatch_data as data;
