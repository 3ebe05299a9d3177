//! Client error types.

/// Errors that can occur when using the Encore client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The course has no seat left.
    #[error("course full: {course_id} (max {max_students})")]
    CourseFull {
        /// The course ID.
        course_id: String,
        /// The course capacity.
        max_students: u32,
    },

    /// The service rejected the checkout signature.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The bearer token was missing, expired or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Polling gave up before the enrollment showed up.
    #[error("not enrolled after {attempts} attempts")]
    Timeout {
        /// Number of reconcile calls made.
        attempts: u32,
    },
}
