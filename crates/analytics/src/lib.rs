//! # Commodex Analytics Engine
//!
//! The instrument ranking engine: a pure pipeline that turns raw price series
//! into an ordered, annotated list ready for display.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every component is a stateless calculator. The same input
//!   snapshot always produces the same output, so the engine can be called from any
//!   number of threads without coordination.
//!
//! ## Public API
//!
//! - `SeriesCleaner`: trims intraday series to weekday trading sessions.
//! - `ZScoreCalculator`: scores the latest close against the series' own distribution.
//! - `Ranker`: cleans, scores and orders a set of instruments, NaN scores last.
//! - `InstrumentSummary`: latest-price and period-return figures for the snapshot views.

pub mod cleaner;
pub mod error;
pub mod ranker;
pub mod summary;
pub mod zscore;

pub use cleaner::{SeriesCleaner, SessionWindow};
pub use error::AnalyticsError;
pub use ranker::{Ranker, RankerConfig, nan_last};
pub use summary::{InstrumentSummary, SortKey, sort_summaries, summarize};
pub use zscore::{DispersionEstimator, ZScoreCalculator};
