//! Encore HTTP API Service.
//!
//! This crate provides the HTTP API for Encore, including:
//!
//! - User profiles and roles
//! - Course catalog and capacity checks
//! - Enrollment reconciliation (redirect, poll and manual triggers)
//! - Razorpay order creation and payment verification
//! - Availability slots and activity reporting
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Bearer JWT tokens** - HS256 tokens issued by the managed auth backend
//! 2. **Admin API key** - `X-Admin-Key` for the reporting endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Store calls are sync but handlers must be async

pub mod attempts;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod enrollment;
pub mod error;
pub mod handlers;
pub mod razorpay;
pub mod routes;
pub mod state;

pub use attempts::{PaymentAttempt, PaymentAttemptCache};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use razorpay::{RazorpayClient, RazorpayError};
pub use routes::create_router;
pub use state::AppState;
