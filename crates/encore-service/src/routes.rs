//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, availability, courses, enrollment, health, payments, users};
use crate::state::AppState;

/// Maximum concurrent requests for payment endpoints.
/// Each one may hold a gateway call open.
const PAYMENTS_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/courses` - List courses
/// - `GET /v1/courses/:id` - Get a course
/// - `GET /v1/courses/:id/capacity` - Capacity check
///
/// ## Users (JWT auth)
/// - `POST /v1/users` - Register profile
/// - `GET /v1/users/me` - Own profile
/// - `GET /v1/users/me/activity` - Own activity
///
/// ## Courses and enrollment (JWT auth)
/// - `POST /v1/courses` - Create course (teacher/admin)
/// - `GET /v1/courses/:id/enrollment` - Enrollment status
/// - `POST /v1/courses/:id/enroll` - Reconcile enrollment
/// - `DELETE /v1/courses/:id/enroll` - Unenroll
///
/// ## Payments (JWT auth, concurrency-limited)
/// - `POST /v1/payments/orders` - Create order
/// - `GET /v1/payments/orders/:order_id` - Gateway order details
/// - `POST /v1/payments/verify` - Verify signature and complete
/// - `POST /v1/payments/qr` - Record QR payment
///
/// ## Availability (JWT auth)
/// - `POST /v1/availability` - Add slot
/// - `GET /v1/availability` - List own slots
/// - `DELETE /v1/availability/:id` - Delete slot
///
/// ## Admin (`X-Admin-Key`)
/// - `GET /v1/admin/activity` - Activity report
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let payment_routes = Router::new()
        .route("/orders", post(payments::create_order))
        .route("/orders/:order_id", get(payments::get_order))
        .route("/verify", post(payments::verify_payment))
        .route("/qr", post(payments::record_qr_payment))
        .layer(ConcurrencyLimitLayer::new(PAYMENTS_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users", post(users::create_profile))
        .route("/users/me", get(users::get_profile))
        .route("/users/me/activity", get(users::list_my_activity))
        // Courses
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route("/courses/:id", get(courses::get_course))
        .route("/courses/:id/capacity", get(courses::get_capacity))
        .route("/courses/:id/enrollment", get(enrollment::get_enrollment))
        .route(
            "/courses/:id/enroll",
            post(enrollment::reconcile).delete(enrollment::unenroll),
        )
        // Availability
        .route(
            "/availability",
            get(availability::list_slots).post(availability::create_slot),
        )
        .route("/availability/:id", delete(availability::delete_slot))
        // Admin
        .route("/admin/activity", get(admin::list_activity))
        // Payments (with their own concurrency limit)
        .nest("/payments", payment_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
