use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Malformed series: timestamp at index {index} is not strictly after its predecessor")]
    MalformedSeries { index: usize },

    #[error("Unknown interval: {0}")]
    UnknownInterval(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),
}
