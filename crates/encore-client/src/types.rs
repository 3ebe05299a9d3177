//! Request and response types for the Encore client.

use serde::{Deserialize, Serialize};

/// Create order request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in minor units; must equal the course price.
    pub amount: i64,
    /// Course being bought.
    pub course_id: String,
}

/// Checkout details returned by create-order.
///
/// For free courses only `enrolled`, `amount` and the course are set.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    /// Gateway order ID for the checkout widget.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Local payment ID to send back on verification.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Public gateway key.
    #[serde(default)]
    pub key: Option<String>,
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is enrolled.
    pub enrolled: bool,
}

/// What the checkout widget hands back after a successful payment.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentRequest {
    /// Gateway payment ID.
    pub razorpay_payment_id: String,
    /// Gateway order ID.
    pub razorpay_order_id: String,
    /// Gateway signature.
    pub razorpay_signature: String,
    /// Local payment ID from create-order.
    pub payment_id: String,
}

/// Verify payment response.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentResponse {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Course ID.
    pub course_id: String,
    /// Completion details as reported by the service.
    pub outcome: serde_json::Value,
}

/// What prompted a reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileTrigger {
    /// The user pressed "enroll".
    #[default]
    Manual,
    /// The checkout widget redirected back.
    Redirect,
    /// Polling after a QR payment.
    Poll,
}

/// Reconciliation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// The user was already enrolled.
    AlreadyEnrolled,
    /// The user was enrolled by this call.
    Enrolled,
    /// No payment evidence yet.
    Pending,
}

/// Why a reconciliation enrolled the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentSource {
    /// Free course.
    Free,
    /// Reported QR payment.
    Qr,
    /// Verified checkout payment.
    Payment,
}

/// Reconcile response.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is enrolled afterwards.
    pub enrolled: bool,
    /// What happened.
    pub status: ReconcileStatus,
    /// Set when `status` is `enrolled`.
    #[serde(default)]
    pub source: Option<EnrollmentSource>,
    /// Student count, when known.
    #[serde(default)]
    pub students: Option<u32>,
    /// Gateway order of a checkout still open, when `status` is `pending`.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Local payment of that checkout.
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// Enrollment status response.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentStatus {
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is enrolled.
    pub enrolled: bool,
}

/// Capacity response.
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether one more student fits.
    pub has_space: bool,
}

/// QR report response.
#[derive(Debug, Clone, Deserialize)]
pub struct QrPaymentResponse {
    /// Course ID.
    pub course_id: String,
    /// Always `true`.
    pub recorded: bool,
}

/// API error response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
