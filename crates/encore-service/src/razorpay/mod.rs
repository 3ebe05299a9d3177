//! Razorpay integration for order creation and lookup.
//!
//! Checkout itself happens in Razorpay's hosted widget; this service only
//! creates orders, reads them back and verifies the returned signature.

pub mod client;
pub mod types;

pub use client::RazorpayClient;
pub use client::RazorpayError;
pub use types::*;
