//! Payment handlers: order creation, verification and QR reports.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use encore_core::activity::action;
use encore_core::{ActivityLog, Course, CourseId, Order, Payment, PaymentId};
use encore_store::{CompletionOutcome, PaymentCompletion};

use crate::auth::AuthUser;
use crate::enrollment;
use crate::error::ApiError;
use crate::handlers::courses::parse_course_id;
use crate::razorpay::{CreateOrderRequest, RazorpayClient, RazorpayError, RazorpayOrder};
use crate::state::AppState;

/// Create order request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    /// Amount in minor units; must equal the course price.
    pub amount: i64,
    /// Course being bought.
    pub course_id: String,
}

/// Create order response.
///
/// Free courses skip the gateway: only `enrolled` and the course are set.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// Gateway order ID for the checkout widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Local payment ID to send back on verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Public gateway key for the checkout widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is already enrolled.
    pub enrolled: bool,
}

/// Open a checkout for a course.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateOrderBody>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let course_id = parse_course_id(&body.course_id)?;

    let profile = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;
    if !profile.role.can_enroll() {
        return Err(ApiError::Forbidden(format!(
            "{} accounts cannot buy courses",
            profile.role
        )));
    }

    let course = state
        .store
        .get_course(&course_id)?
        .ok_or_else(|| ApiError::NotFound(format!("course not found: {course_id}")))?;

    let already_enrolled = course.is_enrolled(&auth.user_id);
    if !already_enrolled && !course.has_space() {
        return Err(course_full(&course));
    }

    if course.is_free() {
        let enrolled =
            enrollment::enroll_student_in_course(state.store.as_ref(), &course_id, &auth.user_id);
        if !enrolled {
            // The last seat went between the read above and the enroll.
            return Err(
                if enrollment::has_space(state.store.as_ref(), &course_id) {
                    ApiError::Internal(format!(
                        "enrollment of {} in {course_id} failed",
                        auth.user_id
                    ))
                } else {
                    course_full(&course)
                },
            );
        }
        tracing::info!(
            user_id = %auth.user_id,
            course_id = %course_id,
            "Free course, gateway skipped"
        );
        return Ok(Json(CreateOrderResponse {
            order_id: None,
            payment_id: None,
            amount: 0,
            currency: course.currency,
            key: None,
            course_id: course_id.to_string(),
            enrolled,
        }));
    }

    if body.amount != course.final_price {
        return Err(ApiError::BadRequest(format!(
            "amount {} does not match course price {}",
            body.amount, course.final_price
        )));
    }

    if already_enrolled {
        return Err(ApiError::Conflict("Already enrolled in this course".into()));
    }

    let razorpay = gateway(&state)?;
    let currency = if course.currency.is_empty() {
        state.config.payment_currency.clone()
    } else {
        course.currency.clone()
    };

    let gateway_order = razorpay
        .create_order(&CreateOrderRequest {
            amount: course.final_price,
            currency: currency.clone(),
            receipt: format!("c_{course_id}"),
            notes: json!({
                "user_id": auth.user_id.to_string(),
                "course_id": course_id.to_string(),
            }),
        })
        .await?;

    let order = Order::pending(
        gateway_order.id.clone(),
        auth.user_id,
        course_id,
        course.final_price,
        currency.clone(),
    );
    let payment = Payment::pending(&order);
    state.store.create_checkout(&order, &payment)?;
    state.store.append_activity(&ActivityLog::new(
        auth.user_id,
        action::ORDER_CREATED,
        "payments",
        Some(gateway_order.id.clone()),
    ))?;
    state
        .attempts
        .record_order(auth.user_id, course_id, &gateway_order.id, payment.id)
        .await;

    tracing::info!(
        user_id = %auth.user_id,
        course_id = %course_id,
        order_id = %gateway_order.id,
        payment_id = %payment.id,
        amount = course.final_price,
        "Checkout opened"
    );

    Ok(Json(CreateOrderResponse {
        order_id: Some(gateway_order.id),
        payment_id: Some(payment.id.to_string()),
        amount: course.final_price,
        currency,
        key: Some(razorpay.key_id().to_string()),
        course_id: course_id.to_string(),
        enrolled: false,
    }))
}

/// Fetch a gateway order. Only the order's owner may read it.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<RazorpayOrder>, ApiError> {
    let local = state
        .store
        .get_order_by_gateway_id(&order_id)?
        .filter(|order| order.user_id == auth.user_id)
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {order_id}")))?;

    let razorpay = gateway(&state)?;
    let remote = razorpay
        .fetch_order(&local.gateway_order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {order_id}")))?;

    Ok(Json(remote))
}

/// Verify payment request, as posted back by the checkout widget.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentBody {
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
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Course ID.
    pub course_id: String,
    /// What the completion did.
    pub outcome: CompletionOutcome,
}

/// Verify a checkout signature and complete the payment.
///
/// On success the order and payment are completed and the payer enrolled in
/// one store write. A bad signature or a full course writes nothing.
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<VerifyPaymentBody>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let payment_id: PaymentId = body
        .payment_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid payment ID: {}", body.payment_id)))?;

    let razorpay = gateway(&state)?;
    razorpay
        .verify_payment_signature(
            &body.razorpay_order_id,
            &body.razorpay_payment_id,
            &body.razorpay_signature,
        )
        .map_err(|e| match e {
            RazorpayError::InvalidSignature => {
                tracing::warn!(
                    user_id = %auth.user_id,
                    order_id = %body.razorpay_order_id,
                    "Payment signature mismatch"
                );
                ApiError::InvalidSignature
            }
            other => ApiError::from(other),
        })?;

    let payment = state
        .store
        .get_payment(&payment_id)?
        .filter(|p| p.owner() == Some(auth.user_id))
        .ok_or_else(|| ApiError::NotFound(format!("payment not found: {payment_id}")))?;

    let outcome = state.store.complete_payment(&PaymentCompletion {
        payment_id,
        gateway_order_id: body.razorpay_order_id.clone(),
        gateway_payment_id: body.razorpay_payment_id.clone(),
        gateway_signature: body.razorpay_signature,
    })?;

    state
        .attempts
        .mark_processed(auth.user_id, payment.course_id)
        .await;

    let message = match outcome {
        CompletionOutcome::Completed { .. } => "Payment verified and enrollment completed",
        CompletionOutcome::AlreadyCompleted { .. } => "Payment already verified",
    };

    tracing::info!(
        user_id = %auth.user_id,
        course_id = %payment.course_id,
        order_id = %body.razorpay_order_id,
        gateway_payment_id = %body.razorpay_payment_id,
        ?outcome,
        "Payment verified"
    );

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: message.to_string(),
        course_id: payment.course_id.to_string(),
        outcome,
    }))
}

/// QR payment report.
#[derive(Debug, Deserialize)]
pub struct QrPaymentBody {
    /// Course paid for.
    pub course_id: String,
}

/// QR payment response.
#[derive(Debug, Serialize)]
pub struct QrPaymentResponse {
    /// Course ID.
    pub course_id: String,
    /// Always `true`.
    pub recorded: bool,
}

/// Record that the caller paid for a course by QR code.
///
/// Enrollment happens on the next reconciliation.
pub async fn record_qr_payment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<QrPaymentBody>,
) -> Result<Json<QrPaymentResponse>, ApiError> {
    let course_id: CourseId = parse_course_id(&body.course_id)?;

    if state.store.get_course(&course_id)?.is_none() {
        return Err(ApiError::NotFound(format!("course not found: {course_id}")));
    }

    state.attempts.record_qr(auth.user_id, course_id).await;

    Ok(Json(QrPaymentResponse {
        course_id: course_id.to_string(),
        recorded: true,
    }))
}

fn course_full(course: &Course) -> ApiError {
    ApiError::CourseFull {
        course_id: course.id.to_string(),
        max_students: course.max_students(),
    }
}

fn gateway(state: &AppState) -> Result<&RazorpayClient, ApiError> {
    state
        .razorpay
        .as_deref()
        .ok_or_else(|| ApiError::ExternalService("Payment gateway not configured".into()))
}
