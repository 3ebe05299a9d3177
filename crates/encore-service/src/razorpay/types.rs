//! Razorpay API types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt reference (max 40 characters).
    pub receipt: String,
    /// Free-form key/value notes stored on the order.
    pub notes: serde_json::Value,
}

/// A Razorpay order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    /// Order ID (`order_...`).
    pub id: String,
    /// Entity type, always "order".
    #[serde(default)]
    pub entity: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// Amount paid so far.
    #[serde(default)]
    pub amount_paid: i64,
    /// Amount still due.
    #[serde(default)]
    pub amount_due: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt reference.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Order status (`created`, `attempted`, `paid`).
    pub status: String,
    /// Number of payment attempts.
    #[serde(default)]
    pub attempts: u32,
    /// Notes. Razorpay returns an empty array when there are none.
    #[serde(default)]
    pub notes: serde_json::Value,
    /// Unix timestamp.
    #[serde(default)]
    pub created_at: i64,
}

/// Razorpay error response.
#[derive(Debug, Deserialize)]
pub struct RazorpayErrorResponse {
    /// The error.
    pub error: RazorpayErrorBody,
}

/// Razorpay error details.
#[derive(Debug, Deserialize)]
pub struct RazorpayErrorBody {
    /// Error code (e.g. `BAD_REQUEST_ERROR`).
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Offending field, if any.
    #[serde(default)]
    pub field: Option<String>,
}
