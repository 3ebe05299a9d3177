//! Order and payment records for gateway checkouts.
//!
//! One `Order` and one `Payment` are written per checkout attempt, both
//! `pending`. Verification moves both to `completed` exactly once; abandoned
//! attempts simply stay `pending`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CourseId, OrderId, PaymentId, UserId};

/// Status of an order or payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, waiting for gateway verification.
    Pending,
    /// Signature verified and enrollment recorded.
    Completed,
}

/// A local order referencing a gateway order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Local order ID.
    pub id: OrderId,

    /// Order ID issued by the payment gateway (e.g. `order_Mx...`).
    pub gateway_order_id: String,

    /// Purchasing user.
    pub user_id: UserId,

    /// Course being purchased.
    pub course_id: CourseId,

    /// Amount in minor currency units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// Current status.
    pub status: PaymentStatus,

    /// Free-form metadata (receipt, gateway response, verification details).
    pub metadata: serde_json::Value,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order.
    #[must_use]
    pub fn pending(
        gateway_order_id: impl Into<String>,
        user_id: UserId,
        course_id: CourseId,
        amount: i64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::generate(),
            gateway_order_id: gateway_order_id.into(),
            user_id,
            course_id,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A checkout attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Local payment ID.
    pub id: PaymentId,

    /// Paying user. Older records carry it only in `metadata.user_id`.
    pub user_id: Option<UserId>,

    /// Course being purchased.
    pub course_id: CourseId,

    /// Local order this payment belongs to.
    pub order_id: OrderId,

    /// Amount in minor currency units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// Current status.
    pub status: PaymentStatus,

    /// Gateway payment ID, set on verification.
    pub gateway_payment_id: Option<String>,

    /// Gateway signature, set on verification.
    pub gateway_signature: Option<String>,

    /// Free-form metadata.
    pub metadata: serde_json::Value,

    /// When the payment was created.
    pub created_at: DateTime<Utc>,

    /// When the payment was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment for an order.
    #[must_use]
    pub fn pending(order: &Order) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::generate(),
            user_id: Some(order.user_id),
            course_id: order.course_id,
            order_id: order.id,
            amount: order.amount,
            currency: order.currency.clone(),
            status: PaymentStatus::Pending,
            gateway_payment_id: None,
            gateway_signature: None,
            metadata: serde_json::json!({ "user_id": order.user_id.to_string() }),
            created_at: now,
            updated_at: now,
        }
    }

    /// The paying user, falling back to `metadata.user_id`.
    #[must_use]
    pub fn owner(&self) -> Option<UserId> {
        self.user_id.or_else(|| {
            self.metadata
                .get("user_id")
                .and_then(serde_json::Value::as_str)
                .and_then(|s| s.parse().ok())
        })
    }

    /// Whether the payment has been verified.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}
