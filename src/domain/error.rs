// Failures raised by the series core
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    /// Non-positive step, `from > to`, or a non-positive look-back.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// A series name collides with the timestamp column.
    #[error("series name '{0}' is reserved")]
    ReservedName(String),

    #[error("merge called with no tables")]
    EmptyInput,
}
