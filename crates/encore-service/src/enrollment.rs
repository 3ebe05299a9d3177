//! Enrollment operations and the reconciliation flow.
//!
//! The boolean helpers at the top fail closed: any store error is logged and
//! reported as `false`. [`reconcile`] is the single entry point used after a
//! checkout redirect, by polling clients and by the manual "enroll" button.

use serde::{Deserialize, Serialize};

use encore_core::{CourseId, EnrollOutcome, PaymentId, UserId};
use encore_store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Whether one more student fits in the course.
///
/// Missing courses and read failures report `false`.
pub fn has_space(store: &dyn Store, course_id: &CourseId) -> bool {
    match store.get_course(course_id) {
        Ok(Some(course)) => course.has_space(),
        Ok(None) => {
            tracing::warn!(course_id = %course_id, "Capacity check on missing course");
            false
        }
        Err(e) => {
            tracing::error!(course_id = %course_id, error = %e, "Capacity check failed");
            false
        }
    }
}

/// Whether the student is in the course's ledger. Fails closed.
pub fn is_enrolled(store: &dyn Store, course_id: &CourseId, student_id: &UserId) -> bool {
    match store.get_course(course_id) {
        Ok(Some(course)) => course.is_enrolled(student_id),
        Ok(None) => false,
        Err(e) => {
            tracing::error!(
                course_id = %course_id,
                student_id = %student_id,
                error = %e,
                "Enrollment lookup failed"
            );
            false
        }
    }
}

/// Enroll a user if their role allows it and the course has room.
///
/// Returns `true` when the user is enrolled afterwards (including when they
/// already were). Non-students are refused without touching the ledger.
pub fn enroll_student_in_course(store: &dyn Store, course_id: &CourseId, user_id: &UserId) -> bool {
    let profile = match store.get_user(user_id) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!(user_id = %user_id, "Enrollment refused: no profile");
            return false;
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Profile lookup failed");
            return false;
        }
    };

    if !profile.role.can_enroll() {
        tracing::warn!(
            user_id = %user_id,
            role = %profile.role,
            course_id = %course_id,
            "Enrollment refused for role"
        );
        return false;
    }

    match store.enroll_student(course_id, user_id) {
        Ok(outcome @ (EnrollOutcome::Enrolled { .. } | EnrollOutcome::AlreadyEnrolled { .. })) => {
            tracing::info!(user_id = %user_id, course_id = %course_id, ?outcome, "Student enrolled");
            true
        }
        Ok(EnrollOutcome::CourseFull { max_students, .. }) => {
            tracing::warn!(
                user_id = %user_id,
                course_id = %course_id,
                max_students,
                "Enrollment refused: course full"
            );
            false
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, course_id = %course_id, error = %e, "Enrollment failed");
            false
        }
    }
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
    /// A client is polling after a QR payment.
    Poll,
}

/// Why a reconciliation enrolled the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentSource {
    /// The course costs nothing.
    Free,
    /// A QR payment was reported.
    Qr,
    /// A verified payment exists.
    Payment,
}

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Nothing to do.
    AlreadyEnrolled {
        /// Current student count.
        students: u32,
    },
    /// The user was enrolled by this call.
    Enrolled {
        /// What justified the enrollment.
        source: EnrollmentSource,
        /// Student count afterwards.
        students: u32,
    },
    /// No payment evidence yet; try again on the next trigger.
    ///
    /// Carries the checkout the user last opened for the course, so a
    /// client coming back from the gateway can finish verifying it.
    Pending {
        /// Gateway order of the open checkout.
        #[serde(skip_serializing_if = "Option::is_none")]
        order_id: Option<String>,
        /// Local payment of the open checkout.
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_id: Option<PaymentId>,
    },
}

/// Bring the ledger in line with what the user has paid for.
///
/// Steps, stopping at the first that applies: already enrolled, free
/// course, unprocessed QR report, completed payment. Otherwise `Pending`.
///
/// # Errors
///
/// - `NotFound` if the user has no profile or the course doesn't exist
/// - `Forbidden` if the user's role may not enroll
/// - `CourseFull` if enrollment was justified but the course has no room
pub async fn reconcile(
    state: &AppState,
    user_id: UserId,
    course_id: CourseId,
    trigger: ReconcileTrigger,
) -> Result<ReconcileOutcome, ApiError> {
    let store = state.store.as_ref();

    let profile = store
        .get_user(&user_id)?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;
    if !profile.role.can_enroll() {
        return Err(ApiError::Forbidden(format!(
            "{} accounts cannot enroll in courses",
            profile.role
        )));
    }

    let course = store
        .get_course(&course_id)?
        .ok_or_else(|| ApiError::NotFound(format!("course not found: {course_id}")))?;

    if course.is_enrolled(&user_id) {
        return Ok(ReconcileOutcome::AlreadyEnrolled {
            students: course.students,
        });
    }

    if course.is_free() {
        return enroll_and_verify(store, &course_id, &user_id, EnrollmentSource::Free);
    }

    if state.attempts.has_pending_qr(user_id, course_id).await {
        let outcome = enroll_and_verify(store, &course_id, &user_id, EnrollmentSource::Qr)?;
        state.attempts.mark_processed(user_id, course_id).await;
        return Ok(outcome);
    }

    if store.has_completed_payment(&user_id, &course_id)? {
        return enroll_and_verify(store, &course_id, &user_id, EnrollmentSource::Payment);
    }

    let attempt = state.attempts.get(user_id, course_id).await;
    let order_id = attempt.as_ref().and_then(|a| a.gateway_order_id.clone());
    let payment_id = attempt.and_then(|a| a.payment_id);

    tracing::debug!(
        user_id = %user_id,
        course_id = %course_id,
        ?trigger,
        open_order = order_id.as_deref().unwrap_or("none"),
        "No payment evidence yet"
    );
    Ok(ReconcileOutcome::Pending {
        order_id,
        payment_id,
    })
}

fn enroll_and_verify(
    store: &dyn Store,
    course_id: &CourseId,
    user_id: &UserId,
    source: EnrollmentSource,
) -> Result<ReconcileOutcome, ApiError> {
    let students = match store.enroll_student(course_id, user_id)? {
        EnrollOutcome::Enrolled { students } | EnrollOutcome::AlreadyEnrolled { students } => {
            students
        }
        EnrollOutcome::CourseFull { max_students, .. } => {
            return Err(ApiError::CourseFull {
                course_id: course_id.to_string(),
                max_students,
            });
        }
    };

    if !is_enrolled(store, course_id, user_id) {
        return Err(ApiError::Internal(format!(
            "enrollment of {user_id} in {course_id} was not recorded"
        )));
    }

    tracing::info!(
        user_id = %user_id,
        course_id = %course_id,
        ?source,
        students,
        "Enrollment reconciled"
    );

    Ok(ReconcileOutcome::Enrolled { source, students })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use encore_core::{ClassType, Course, Order, Payment, Role, UserProfile};
    use encore_store::{MemoryStore, PaymentCompletion};

    use crate::config::ServiceConfig;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), ServiceConfig::default())
    }

    fn user(state: &AppState, role: Role) -> UserId {
        let profile = UserProfile::new(UserId::generate(), role, "Test");
        state.store.put_user(&profile).unwrap();
        profile.id
    }

    fn course(state: &AppState, price: i64, max: Option<u32>) -> CourseId {
        let course = Course::new("Guitar", price, "INR", vec![ClassType::new("group", max)]);
        state.store.put_course(&course).unwrap();
        course.id
    }

    #[test]
    fn has_space_is_false_for_missing_course() {
        let state = state();
        assert!(!has_space(state.store.as_ref(), &CourseId::generate()));
    }

    #[test]
    fn has_space_at_limit_boundary() {
        let state = state();
        let course_id = course(&state, 0, Some(3));
        let store = state.store.as_ref();

        store.enroll_student(&course_id, &UserId::generate()).unwrap();
        store.enroll_student(&course_id, &UserId::generate()).unwrap();
        assert!(has_space(store, &course_id)); // 2 of 3

        store.enroll_student(&course_id, &UserId::generate()).unwrap();
        assert!(!has_space(store, &course_id)); // 3 of 3
    }

    #[test]
    fn unlimited_course_always_has_space() {
        let state = state();
        let course_id = course(&state, 0, None);
        for _ in 0..50 {
            state
                .store
                .enroll_student(&course_id, &UserId::generate())
                .unwrap();
        }
        assert!(has_space(state.store.as_ref(), &course_id));
    }

    #[test]
    fn teacher_cannot_enroll() {
        let state = state();
        let teacher = user(&state, Role::Teacher);
        let course_id = course(&state, 0, Some(5));

        assert!(!enroll_student_in_course(state.store.as_ref(), &course_id, &teacher));
        let stored = state.store.get_course(&course_id).unwrap().unwrap();
        assert!(stored.student_ids.is_empty());
        assert_eq!(stored.students, 0);
    }

    #[test]
    fn student_enrollment_is_idempotent() {
        let state = state();
        let student = user(&state, Role::Student);
        let course_id = course(&state, 0, Some(5));
        let store = state.store.as_ref();

        assert!(enroll_student_in_course(store, &course_id, &student));
        assert!(enroll_student_in_course(store, &course_id, &student));
        assert!(is_enrolled(store, &course_id, &student));
        assert_eq!(store.get_course(&course_id).unwrap().unwrap().students, 1);
    }

    #[test]
    fn is_enrolled_fails_closed() {
        let state = state();
        assert!(!is_enrolled(
            state.store.as_ref(),
            &CourseId::generate(),
            &UserId::generate()
        ));
    }

    #[tokio::test]
    async fn paid_course_without_evidence_is_pending() {
        let state = state();
        let student = user(&state, Role::Student);
        let course_id = course(&state, 4900, Some(5));

        let outcome = reconcile(&state, student, course_id, ReconcileTrigger::Redirect)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Pending {
                order_id: None,
                payment_id: None
            }
        );
        assert!(!is_enrolled(state.store.as_ref(), &course_id, &student));
    }

    #[tokio::test]
    async fn pending_reconcile_points_at_open_checkout() {
        let state = state();
        let student = user(&state, Role::Student);
        let course_id = course(&state, 4900, Some(5));

        let order = Order::pending("order_open", student, course_id, 4900, "INR");
        let payment = Payment::pending(&order);
        state.store.create_checkout(&order, &payment).unwrap();
        state
            .attempts
            .record_order(student, course_id, "order_open", payment.id)
            .await;

        let outcome = reconcile(&state, student, course_id, ReconcileTrigger::Redirect)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Pending {
                order_id: Some("order_open".into()),
                payment_id: Some(payment.id)
            }
        );
    }

    #[tokio::test]
    async fn qr_report_enrolls_and_is_processed() {
        let state = state();
        let student = user(&state, Role::Student);
        let course_id = course(&state, 4900, Some(5));

        state.attempts.record_qr(student, course_id).await;
        let outcome = reconcile(&state, student, course_id, ReconcileTrigger::Poll)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Enrolled {
                source: EnrollmentSource::Qr,
                students: 1
            }
        );
        assert!(!state.attempts.has_pending_qr(student, course_id).await);
        assert!(state.attempts.get(student, course_id).await.unwrap().processed);
    }

    #[tokio::test]
    async fn completed_payment_re_enrolls_after_leaving() {
        let state = state();
        let student = user(&state, Role::Student);
        let course_id = course(&state, 4900, Some(5));

        let order = Order::pending("order_X", student, course_id, 4900, "INR");
        let payment = Payment::pending(&order);
        state.store.create_checkout(&order, &payment).unwrap();
        state
            .store
            .complete_payment(&PaymentCompletion {
                payment_id: payment.id,
                gateway_order_id: "order_X".into(),
                gateway_payment_id: "pay_X".into(),
                gateway_signature: "sig".into(),
            })
            .unwrap();

        // A verified payment stays an entitlement: leaving the course does
        // not stop the next reconcile from enrolling again.
        state.store.unenroll_student(&course_id, &student).unwrap();

        let outcome = reconcile(&state, student, course_id, ReconcileTrigger::Redirect)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Enrolled {
                source: EnrollmentSource::Payment,
                students: 1
            }
        );
    }

    #[tokio::test]
    async fn full_course_is_a_conflict() {
        let state = state();
        let course_id = course(&state, 0, Some(1));
        let first = user(&state, Role::Student);
        let second = user(&state, Role::Student);

        reconcile(&state, first, course_id, ReconcileTrigger::Manual)
            .await
            .unwrap();
        let err = reconcile(&state, second, course_id, ReconcileTrigger::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::CourseFull { max_students: 1, .. }));
    }

    #[tokio::test]
    async fn reconcile_rejects_teachers() {
        let state = state();
        let teacher = user(&state, Role::Teacher);
        let course_id = course(&state, 0, None);

        let err = reconcile(&state, teacher, course_id, ReconcileTrigger::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
