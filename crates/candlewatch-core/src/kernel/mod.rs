//! The numerical kernel (C2): pure, deterministic, side-effect-free
//! functions computing SMA, EMA, RSI, ATR, VWAP, Bollinger Bands, and BBW
//! over aligned price vectors. `None` is the "undefined" sentinel for
//! warm-up indices; invalid input (empty slices, mismatched lengths,
//! `period == 0`) yields an empty sequence rather than an error, per spec
//! §4.2 and the re-architecture guidance in §9.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod vwap;

pub use atr::atr;
pub use bollinger::{bb_width, bollinger_bands, BandWidth};
pub use ema::ema;
pub use rsi::rsi;
pub use sma::sma;
pub use vwap::vwap;
