//! Error types for Encore core validation.

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating domain values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Day of week outside 0-6.
    #[error("invalid day of week: {0} (expected 0-6)")]
    InvalidDayOfWeek(u8),

    /// Time of day not in `HH:MM` form.
    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    /// Start time is not before end time.
    #[error("empty time range: {start} - {end}")]
    EmptyTimeRange {
        /// Start as supplied.
        start: String,
        /// End as supplied.
        end: String,
    },
}
