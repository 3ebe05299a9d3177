//! Payment order and verification integration tests.
//!
//! Razorpay is replaced by a wiremock server.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, RAZORPAY_KEY_ID, RAZORPAY_KEY_SECRET};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use encore_core::{CourseId, PaymentStatus};
use encore_service::crypto::razorpay_signature;
use encore_store::Store;

fn gateway_order(id: &str, amount: i64) -> serde_json::Value {
    json!({
        "id": id,
        "entity": "order",
        "amount": amount,
        "amount_paid": 0,
        "amount_due": amount,
        "currency": "INR",
        "receipt": "c_test",
        "status": "created",
        "attempts": 0,
        "notes": [],
        "created_at": 1_700_000_000
    })
}

async fn mock_order_creation(server: &MockServer, order_id: &str, amount: i64) {
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_order(order_id, amount)))
        .mount(server)
        .await;
}

/// Open a checkout for the test user and return `(order_id, payment_id)`.
async fn open_checkout(harness: &TestHarness, course_id: CourseId, amount: i64) -> (String, String) {
    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": amount, "course_id": course_id.to_string() }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    (
        body["order_id"].as_str().unwrap().to_string(),
        body["payment_id"].as_str().unwrap().to_string(),
    )
}

fn verify_body(order_id: &str, gateway_payment_id: &str, payment_id: &str) -> serde_json::Value {
    json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": gateway_payment_id,
        "razorpay_signature": razorpay_signature(order_id, gateway_payment_id, RAZORPAY_KEY_SECRET),
        "payment_id": payment_id,
    })
}

// ============================================================================
// Create order
// ============================================================================

#[tokio::test]
async fn create_order_returns_checkout_details() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_TEST1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(5));

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 4900, "course_id": course_id.to_string() }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["order_id"], "order_TEST1");
    assert_eq!(body["amount"], 4900);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["key"], RAZORPAY_KEY_ID);
    assert_eq!(body["enrolled"], false);

    let order = harness
        .store
        .get_order_by_gateway_id("order_TEST1")
        .unwrap()
        .unwrap();
    assert_eq!(order.user_id, harness.test_user_id);
    assert_eq!(order.status, PaymentStatus::Pending);

    let payment_id = body["payment_id"].as_str().unwrap().parse().unwrap();
    let payment = harness.store.get_payment(&payment_id).unwrap().unwrap();
    assert_eq!(payment.owner(), Some(harness.test_user_id));
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn create_order_requires_profile() {
    let gateway = MockServer::start().await;
    let harness = TestHarness::with_razorpay(&gateway.uri());
    let course_id = harness.seed_course(4900, None);

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 4900, "course_id": course_id.to_string() }))
        .await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "user does not exist");
}

#[tokio::test]
async fn amount_must_match_price() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_order("order_X", 1)))
        .expect(0)
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 1, "course_id": course_id.to_string() }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_failure_is_bad_gateway() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 4900, "course_id": course_id.to_string() }))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    assert!(!harness
        .store
        .has_completed_payment(&harness.test_user_id, &course_id)
        .unwrap());
}

#[tokio::test]
async fn paid_checkout_without_gateway_is_unavailable() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 4900, "course_id": course_id.to_string() }))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn free_course_bypasses_gateway() {
    // No gateway configured at all: a free course must not need one.
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(0, Some(10));

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 0, "course_id": course_id.to_string() }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["enrolled"], true);
    assert!(body.get("order_id").is_none());
    assert!(body.get("payment_id").is_none());

    assert!(harness.stored_course(course_id).is_enrolled(&harness.test_user_id));
    assert!(!harness
        .store
        .has_completed_payment(&harness.test_user_id, &course_id)
        .unwrap());

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
    assert_eq!(actions, vec!["enroll"]);
}

// ============================================================================
// Verify payment
// ============================================================================

#[tokio::test]
async fn verified_payment_enrolls_student() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_V1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(3));
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", harness.user_auth_header())
        .json(&verify_body(&order_id, "pay_V1", &payment_id))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"]["status"], "completed");
    assert_eq!(body["outcome"]["enrollment"]["outcome"], "enrolled");

    let course = harness.stored_course(course_id);
    assert!(course.is_enrolled(&harness.test_user_id));
    assert_eq!(course.students, 1);

    let order = harness.store.get_order_by_gateway_id(&order_id).unwrap().unwrap();
    assert_eq!(order.status, PaymentStatus::Completed);
    assert_eq!(order.metadata["razorpay_payment_id"], "pay_V1");

    // Redirect-triggered reconciliation afterwards is a no-op.
    let reconcile: serde_json::Value = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "trigger": "redirect" }))
        .await
        .json();
    assert_eq!(reconcile["status"], "already_enrolled");
}

#[tokio::test]
async fn verification_replay_is_idempotent() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_R1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;
    let body = verify_body(&order_id, "pay_R1", &payment_id);

    for _ in 0..2 {
        harness
            .server
            .post("/v1/payments/verify")
            .add_header("authorization", harness.user_auth_header())
            .json(&body)
            .await
            .assert_status_ok();
    }

    let replay: serde_json::Value = harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", harness.user_auth_header())
        .json(&body)
        .await
        .json();
    assert_eq!(replay["outcome"]["status"], "already_completed");
    assert_eq!(harness.stored_course(course_id).students, 1);

    // A different gateway payment for the same local payment is refused.
    harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", harness.user_auth_header())
        .json(&verify_body(&order_id, "pay_R2", &payment_id))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_signature_writes_nothing() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_B1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_B1",
            "razorpay_signature": razorpay_signature(&order_id, "pay_B1", "wrong-secret"),
            "payment_id": payment_id,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_signature");

    assert!(!harness.stored_course(course_id).is_enrolled(&harness.test_user_id));
    let payment = harness
        .store
        .get_payment(&payment_id.parse().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn full_course_at_verification_writes_nothing() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_F1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(1));
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;

    // Someone else takes the last seat between checkout and verification.
    harness
        .store
        .enroll_student(&course_id, &encore_core::UserId::generate())
        .unwrap();

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", harness.user_auth_header())
        .json(&verify_body(&order_id, "pay_F1", &payment_id))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<serde_json::Value>()["error"]["code"],
        "course_full"
    );

    let order = harness.store.get_order_by_gateway_id(&order_id).unwrap().unwrap();
    assert_eq!(order.status, PaymentStatus::Pending);
    assert!(!harness
        .store
        .has_completed_payment(&harness.test_user_id, &course_id)
        .unwrap());
}

#[tokio::test]
async fn cannot_verify_someone_elses_payment() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_O1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;
    let (_, intruder) = harness.register_user("student").await;

    harness
        .server
        .post("/v1/payments/verify")
        .add_header("authorization", intruder)
        .json(&verify_body(&order_id, "pay_O1", &payment_id))
        .await
        .assert_status_not_found();
}

// ============================================================================
// Order details
// ============================================================================

#[tokio::test]
async fn order_details_are_proxied_for_owner() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_D1", 4900).await;
    Mock::given(method("GET"))
        .and(path("/orders/order_D1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_D1",
            "entity": "order",
            "amount": 4900,
            "amount_paid": 4900,
            "amount_due": 0,
            "currency": "INR",
            "status": "paid",
            "attempts": 1,
            "notes": { "course_id": "x" },
            "created_at": 1_700_000_000
        })))
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);
    open_checkout(&harness, course_id, 4900).await;

    let response = harness
        .server
        .get("/v1/payments/orders/order_D1")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "paid");
    assert_eq!(body["amount_paid"], 4900);

    let (_, other) = harness.register_user("student").await;
    harness
        .server
        .get("/v1/payments/orders/order_D1")
        .add_header("authorization", other)
        .await
        .assert_status_not_found();
}

// ============================================================================
// Capacity at checkout
// ============================================================================

#[tokio::test]
async fn full_paid_course_opens_no_checkout() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_order("order_FULL", 4900)))
        .expect(0)
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, Some(1));
    harness
        .store
        .enroll_student(&course_id, &encore_core::UserId::generate())
        .unwrap();

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 4900, "course_id": course_id.to_string() }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "course_full");
    assert_eq!(body["error"]["details"]["max_students"], 1);
    assert!(harness
        .store
        .get_order_by_gateway_id("order_FULL")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn full_free_course_is_a_conflict() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(0, Some(1));
    harness
        .store
        .enroll_student(&course_id, &encore_core::UserId::generate())
        .unwrap();

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 0, "course_id": course_id.to_string() }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<serde_json::Value>()["error"]["code"],
        "course_full"
    );
    assert!(!harness.stored_course(course_id).is_enrolled(&harness.test_user_id));
}

#[tokio::test]
async fn enrolled_student_may_checkout_free_course_again() {
    let harness = TestHarness::new();
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(0, Some(1));

    for _ in 0..2 {
        let body: serde_json::Value = harness
            .server
            .post("/v1/payments/orders")
            .add_header("authorization", harness.user_auth_header())
            .json(&json!({ "amount": 0, "course_id": course_id.to_string() }))
            .await
            .json();
        assert_eq!(body["enrolled"], true);
    }
    assert_eq!(harness.stored_course(course_id).students, 1);
}

#[tokio::test]
async fn pending_reconcile_returns_open_checkout() {
    let gateway = MockServer::start().await;
    mock_order_creation(&gateway, "order_P1", 4900).await;

    let harness = TestHarness::with_razorpay(&gateway.uri());
    harness.register_test_user("student").await;
    let course_id = harness.seed_course(4900, None);
    let (order_id, payment_id) = open_checkout(&harness, course_id, 4900).await;

    let body: serde_json::Value = harness
        .server
        .post(&format!("/v1/courses/{course_id}/enroll"))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "trigger": "redirect" }))
        .await
        .json();

    assert_eq!(body["status"], "pending");
    assert_eq!(body["enrolled"], false);
    assert_eq!(body["order_id"], order_id);
    assert_eq!(body["payment_id"], payment_id);
}
