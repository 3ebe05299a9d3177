//! Common test utilities for encore integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use encore_core::{ClassType, Course, CourseId, UserId};
use encore_service::{create_router, AppState, ServiceConfig};
use encore_store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const AUDIENCE: &str = "encore";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const RAZORPAY_KEY_ID: &str = "rzp_test_key";
pub const RAZORPAY_KEY_SECRET: &str = "s3cr3t";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the store for setup and assertions.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a harness without a payment gateway.
    pub fn new() -> Self {
        Self::with_config(base_config())
    }

    /// Create a harness whose Razorpay client talks to `api_url`.
    pub fn with_razorpay(api_url: &str) -> Self {
        let config = ServiceConfig {
            razorpay_key_id: Some(RAZORPAY_KEY_ID.into()),
            razorpay_key_secret: Some(RAZORPAY_KEY_SECRET.into()),
            razorpay_api_url: api_url.into(),
            ..base_config()
        };
        Self::with_config(config)
    }

    fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
        }
    }

    /// Get the authorization header for the test user.
    pub fn user_auth_header(&self) -> String {
        auth_header_for(self.test_user_id)
    }

    /// Register the test user with a role.
    pub async fn register_test_user(&self, role: &str) {
        self.server
            .post("/v1/users")
            .add_header("authorization", self.user_auth_header())
            .json(&json!({ "name": "Test User", "role": role }))
            .await
            .assert_status_ok();
    }

    /// Register a fresh user with a role and return its auth header.
    pub async fn register_user(&self, role: &str) -> (UserId, String) {
        let user_id = UserId::generate();
        let header = auth_header_for(user_id);
        self.server
            .post("/v1/users")
            .add_header("authorization", header.clone())
            .json(&json!({ "name": format!("{role} {user_id}"), "role": role }))
            .await
            .assert_status_ok();
        (user_id, header)
    }

    /// Insert a course directly into the store.
    pub fn seed_course(&self, final_price: i64, max_students: Option<u32>) -> CourseId {
        let course = Course::new(
            "Piano Foundations",
            final_price,
            "INR",
            vec![ClassType::new("group", max_students)],
        );
        self.store.put_course(&course).expect("Failed to seed course");
        course.id
    }

    /// Read a course back from the store.
    pub fn stored_course(&self, course_id: CourseId) -> Course {
        self.store
            .get_course(&course_id)
            .expect("Failed to read course")
            .expect("Course missing")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn base_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        auth_jwt_secret: Some(JWT_SECRET.into()),
        auth_audience: AUDIENCE.into(),
        admin_api_key: Some(ADMIN_KEY.into()),
        ..ServiceConfig::default()
    }
}

/// Mint a token the service accepts for `user_id`.
pub fn token_for(user_id: UserId) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": user_id.to_string(),
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode token")
}

/// Authorization header value for `user_id`.
pub fn auth_header_for(user_id: UserId) -> String {
    format!("Bearer {}", token_for(user_id))
}
