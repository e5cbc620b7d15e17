//! # Commodex Core Types
//!
//! The Layer 0 vocabulary shared by every other crate in the workspace: price
//! points, validated series, instruments and the ranked output of the engine.
//! This crate has no knowledge of statistics, configuration or networking.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Interval, Period};
pub use error::CoreError;
pub use structs::{Instrument, PricePoint, RankedEntry, Series};
