//! Enrollment and reconciliation integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, ADMIN_KEY};
use serde_json::json;

// ============================================================================
// Capacity and idempotency
// ============================================================================

#[tokio::test]
async fn three_students_two_seats() {
    let harness = TestHarness::new();
    let course_id = harness.seed_course(0, Some(2));
    let enroll_path = format!("/v1/courses/{course_id}/enroll");

    let (_, a) = harness.register_user("student").await;
    let (_, b) = harness.register_user("student").await;
    let (c_id, c) = harness.register_user("student").await;

    for header in [&a, &b] {
        let response = harness
            .server
            .post(&enroll_path)
            .add_header("authorization", header.clone())
            .json(&json!({ "trigger": "manual" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "enrolled");
        assert_eq!(body["source"], "free");
    }

    let response = harness
        .server
        .post(&enroll_path)
        .add_header("authorization", c.clone())
        .json(&json!({ "trigger": "manual" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "course_full");
    assert_eq!(body["error"]["details"]["max_students"], 2);

    let again = harness
        .server
        .post(&enroll_path)
        .add_header("authorization", a.clone())
        .json(&json!({ "trigger": "manual" }))
        .await;
    again.assert_status_ok();
    assert_eq!(again.json::<serde_json::Value>()["status"], "already_enrolled");

    let course = harness.stored_course(course_id);
    assert_eq!(course.students, 2);
    assert_eq!(course.student_ids.len(), 2);
    assert!(!course.is_enrolled(&c_id));

    let capacity: serde_json::Value = harness
        .server
        .get(&format!("/v1/courses/{course_id}/capacity"))
        .await
        .json();
    assert_eq!(capacity["has_space"], false);
}

#[tokio::test]
async fn reconcile_body_is_optional() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(0, None);

    let response = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["enrolled"], true);
}

#[tokio::test]
async fn teacher_cannot_enroll() {
    let harness = TestHarness::new();
    harness.register_test_user("teacher").await;
    let course_id = harness.seed_course(0, Some(5));

    harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(harness.stored_course(course_id).students, 0);
}

#[tokio::test]
async fn missing_course_is_not_found() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let missing = encore_core::CourseId::generate();

    harness
        .server
        .post(&format!("/v1/courses/{missing}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({}))
        .await
        .assert_status_not_found();
}

// ============================================================================
// Reconciliation sources
// ============================================================================

#[tokio::test]
async fn paid_course_without_payment_stays_pending() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(5));

    let response = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "trigger": "redirect" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["enrolled"], false);
}

#[tokio::test]
async fn qr_report_enrolls_on_next_poll() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(5));

    harness
        .server
        .post("/v1/payments/qr")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "course_id": course_id.to_string() }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "trigger": "poll" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "enrolled");
    assert_eq!(body["source"], "qr");

    let status: serde_json::Value = harness
        .server
        .get(&format!("/v1/courses/{course_id}/enrollment"))
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(status["enrolled"], true);

    // The QR report was consumed: after leaving, polling no longer re-enrolls.
    harness
        .server
        .delete(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let again: serde_json::Value = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "trigger": "poll" }))
        .await
        .json();
    assert_eq!(again["status"], "pending");
}

#[tokio::test]
async fn unenroll_is_idempotent_and_logged() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(0, None);
    let path = format!("/v1/courses/{course_id}/enroll");

    harness
        .server
        .post(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let first: serde_json::Value = harness
        .server
        .delete(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(first["removed"], true);

    let second: serde_json::Value = harness
        .server
        .delete(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(second["removed"], false);

    let activity: serde_json::Value = harness
        .server
        .get("/v1/users/me/activity")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let actions: Vec<_> = activity["activity"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["unenroll", "enroll"]);

    let report: serde_json::Value = harness
        .server
        .get("/v1/admin/activity?limit=1")
        .add_header("x-admin-key", ADMIN_KEY.to_string())
        .await
        .json();
    assert_eq!(report["activity"][0]["action"], "unenroll");
    assert_eq!(report["has_more"], true);
}
