//! Encore Client SDK.
//!
//! HTTP client for apps talking to the Encore service on behalf of a
//! signed-in user.
//!
//! # Example
//!
//! ```no_run
//! use encore_client::{EncoreClient, PollOptions};
//! use encore_core::CourseId;
//!
//! # async fn example(course_id: CourseId) -> Result<(), encore_client::ClientError> {
//! let client = EncoreClient::new("https://encore.example.com", "user-jwt");
//!
//! // After the student scans the QR code and pays:
//! client.record_qr_payment(course_id).await?;
//! let status = client
//!     .wait_for_enrollment(course_id, PollOptions::default())
//!     .await?;
//!
//! assert!(status.enrolled);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, EncoreClient, PollOptions};
pub use error::ClientError;
pub use types::*;
