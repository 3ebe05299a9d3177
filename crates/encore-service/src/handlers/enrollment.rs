//! Enrollment handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::enrollment::{self, ReconcileOutcome, ReconcileTrigger};
use crate::error::ApiError;
use crate::handlers::courses::parse_course_id;
use crate::state::AppState;

/// Enrollment status response.
#[derive(Debug, Serialize)]
pub struct EnrollmentStatusResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is enrolled.
    pub enrolled: bool,
}

/// Whether the caller is enrolled in the course.
pub async fn get_enrollment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<EnrollmentStatusResponse>, ApiError> {
    let course_id = parse_course_id(&course_id)?;

    Ok(Json(EnrollmentStatusResponse {
        course_id: course_id.to_string(),
        enrolled: enrollment::is_enrolled(state.store.as_ref(), &course_id, &auth.user_id),
    }))
}

/// Reconcile request.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// What prompted the call.
    #[serde(default)]
    pub trigger: ReconcileTrigger,
}

/// Reconcile response.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether the caller is enrolled afterwards.
    pub enrolled: bool,
    /// What happened.
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

/// Enroll the caller if a free course, QR report or payment justifies it.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
    body: Option<Json<ReconcileRequest>>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let trigger = body.map(|Json(b)| b.trigger).unwrap_or_default();

    let outcome = enrollment::reconcile(&state, auth.user_id, course_id, trigger).await?;

    Ok(Json(ReconcileResponse {
        course_id: course_id.to_string(),
        enrolled: !matches!(outcome, ReconcileOutcome::Pending { .. }),
        outcome,
    }))
}

/// Unenroll response.
#[derive(Debug, Serialize)]
pub struct UnenrollResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether the caller was removed (false if not enrolled).
    pub removed: bool,
}

/// Remove the caller from a course.
pub async fn unenroll(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<UnenrollResponse>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let removed = state.store.unenroll_student(&course_id, &auth.user_id)?;

    if removed {
        tracing::info!(user_id = %auth.user_id, course_id = %course_id, "Student unenrolled");
    }

    Ok(Json(UnenrollResponse {
        course_id: course_id.to_string(),
        removed,
    }))
}
