//! Payment completion planning shared by all store backends.
//!
//! Backends load the payment, its order and the course under their write
//! lock, call [`plan_completion`], and then persist every record in the plan
//! in one write. Nothing is written when planning fails.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use encore_core::activity::action;
use encore_core::{ActivityLog, Course, EnrollOutcome, Order, Payment, PaymentId, PaymentStatus};

use crate::error::{Result, StoreError};

/// Verified gateway details for a pending payment.
#[derive(Debug, Clone)]
pub struct PaymentCompletion {
    /// Local payment record.
    pub payment_id: PaymentId,
    /// Gateway order ID the signature was computed over.
    pub gateway_order_id: String,
    /// Gateway payment ID the signature was computed over.
    pub gateway_payment_id: String,
    /// The verified signature.
    pub gateway_signature: String,
}

/// Result of completing a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The payment moved to `completed` in this call.
    Completed {
        /// What happened to the enrollment ledger.
        enrollment: EnrollOutcome,
    },
    /// The same gateway payment was already applied.
    AlreadyCompleted {
        /// Current student count of the course.
        students: u32,
    },
}

/// Records to persist for a completion.
#[derive(Debug)]
pub(crate) struct CompletionWrites {
    pub order: Order,
    pub payment: Payment,
    /// Present only when the ledger changed.
    pub course: Option<Course>,
    pub activity: Vec<ActivityLog>,
    pub outcome: CompletionOutcome,
}

#[derive(Debug)]
pub(crate) enum CompletionPlan {
    Unchanged(CompletionOutcome),
    Write(Box<CompletionWrites>),
}

/// Decide what completing `payment` means for the stored records.
pub(crate) fn plan_completion(
    completion: &PaymentCompletion,
    mut payment: Payment,
    mut order: Order,
    mut course: Course,
) -> Result<CompletionPlan> {
    if order.id != payment.order_id || order.gateway_order_id != completion.gateway_order_id {
        return Err(StoreError::Conflict(format!(
            "payment {} does not belong to gateway order {}",
            payment.id, completion.gateway_order_id
        )));
    }

    if payment.is_completed() {
        return if payment.gateway_payment_id.as_deref()
            == Some(completion.gateway_payment_id.as_str())
        {
            Ok(CompletionPlan::Unchanged(
                CompletionOutcome::AlreadyCompleted {
                    students: course.students,
                },
            ))
        } else {
            Err(StoreError::Conflict(format!(
                "payment {} already completed with a different gateway payment",
                payment.id
            )))
        };
    }

    let owner = payment.owner().ok_or_else(|| {
        StoreError::Conflict(format!("payment {} has no owning user", payment.id))
    })?;

    let enrollment = course.try_enroll(owner);
    if let EnrollOutcome::CourseFull { max_students, .. } = enrollment {
        return Err(StoreError::CourseFull {
            course_id: course.id.to_string(),
            max_students,
        });
    }

    let now = Utc::now();

    order.status = PaymentStatus::Completed;
    order.metadata = serde_json::json!({
        "razorpay_payment_id": completion.gateway_payment_id,
        "razorpay_signature": completion.gateway_signature,
        "verified_at": now.to_rfc3339(),
    });
    order.updated_at = now;

    payment.status = PaymentStatus::Completed;
    payment.gateway_payment_id = Some(completion.gateway_payment_id.clone());
    payment.gateway_signature = Some(completion.gateway_signature.clone());
    payment.updated_at = now;

    let mut activity = vec![ActivityLog::new(
        owner,
        action::PAYMENT_COMPLETED,
        "payments",
        Some(payment.id.to_string()),
    )];

    let newly_enrolled = matches!(enrollment, EnrollOutcome::Enrolled { .. });
    if newly_enrolled {
        activity.push(ActivityLog::new(
            owner,
            action::ENROLL,
            "courses",
            Some(course.id.to_string()),
        ));
    }

    Ok(CompletionPlan::Write(Box::new(CompletionWrites {
        order,
        payment,
        course: newly_enrolled.then_some(course),
        activity,
        outcome: CompletionOutcome::Completed { enrollment },
    })))
}
