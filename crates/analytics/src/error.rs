use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Instrument symbol '{0}' appears more than once in the ranking input")]
    DuplicateSymbol(String),

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),
}
