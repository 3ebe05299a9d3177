//! Encore HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::time::Duration;

use encore_core::CourseId;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CapacityResponse, CreateOrderRequest, CreateOrderResponse,
    EnrollmentStatus, QrPaymentResponse, ReconcileResponse, ReconcileTrigger,
    VerifyPaymentRequest, VerifyPaymentResponse,
};

/// Encore API client.
///
/// Acts on behalf of one signed-in user, identified by their bearer token.
#[derive(Debug, Clone)]
pub struct EncoreClient {
    client: Client,
    base_url: String,
    token: String,
}

impl EncoreClient {
    /// Create a new Encore client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the Encore service (e.g., `"http://encore:8080"`)
    /// * `token` - The user's JWT
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a new Encore client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Open a checkout for a course.
    ///
    /// Free courses enroll immediately and return no order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_order(
        &self,
        course_id: CourseId,
        amount: i64,
    ) -> Result<CreateOrderResponse, ClientError> {
        let request = CreateOrderRequest {
            amount,
            course_id: course_id.to_string(),
        };

        self.send(self.post("/v1/payments/orders").json(&request))
            .await
    }

    /// Submit the checkout widget's result for verification.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidSignature`] if the service rejects the
    /// signature, [`ClientError::CourseFull`] if the last seat went while
    /// paying, or another error if the request fails.
    pub async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        self.send(self.post("/v1/payments/verify").json(request))
            .await
    }

    /// Report a QR payment for a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn record_qr_payment(
        &self,
        course_id: CourseId,
    ) -> Result<QrPaymentResponse, ClientError> {
        self.send(
            self.post("/v1/payments/qr")
                .json(&json!({ "course_id": course_id.to_string() })),
        )
        .await
    }

    /// Ask the service to enroll the caller if payment evidence exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn reconcile(
        &self,
        course_id: CourseId,
        trigger: ReconcileTrigger,
    ) -> Result<ReconcileResponse, ClientError> {
        self.send(
            self.post(&format!("/v1/courses/{course_id}/enroll"))
                .json(&json!({ "trigger": trigger })),
        )
        .await
    }

    /// Whether the caller is enrolled in a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn enrollment_status(
        &self,
        course_id: CourseId,
    ) -> Result<EnrollmentStatus, ClientError> {
        self.send(self.get(&format!("/v1/courses/{course_id}/enrollment")))
            .await
    }

    /// Whether a course has a free seat.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn capacity(&self, course_id: CourseId) -> Result<CapacityResponse, ClientError> {
        self.send(self.get(&format!("/v1/courses/{course_id}/capacity")))
            .await
    }

    /// Poll reconciliation until the caller is enrolled.
    ///
    /// Used after a QR payment, where no callback tells the app when the
    /// payment landed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] after `options.max_attempts` pending
    /// answers. Any error from the service stops polling immediately.
    pub async fn wait_for_enrollment(
        &self,
        course_id: CourseId,
        options: PollOptions,
    ) -> Result<ReconcileResponse, ClientError> {
        for attempt in 1..=options.max_attempts {
            let response = self.reconcile(course_id, ReconcileTrigger::Poll).await?;
            if response.enrolled {
                tracing::debug!(course_id = %course_id, attempt, "Enrollment confirmed");
                return Ok(response);
            }

            tracing::debug!(course_id = %course_id, attempt, "Enrollment still pending");
            if attempt < options.max_attempts {
                tokio::time::sleep(options.interval).await;
            }
        }

        Err(ClientError::Timeout {
            attempts: options.max_attempts,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;

                match code {
                    "course_full" => {
                        let details = api_error.error.details.as_ref();
                        let course_id = details
                            .and_then(|d| d.get("course_id"))
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let max_students = details
                            .and_then(|d| d.get("max_students"))
                            .and_then(serde_json::Value::as_u64)
                            .and_then(|n| u32::try_from(n).ok())
                            .unwrap_or(0);

                        Err(ClientError::CourseFull {
                            course_id,
                            max_students,
                        })
                    }
                    "invalid_signature" => Err(ClientError::InvalidSignature),
                    "unauthorized" => Err(ClientError::Unauthorized(message)),
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// How [`EncoreClient::wait_for_enrollment`] polls.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Delay between reconcile calls (default: 3s).
    pub interval: Duration,
    /// Reconcile calls before giving up (default: 20).
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = EncoreClient::new("http://localhost:8080", "token");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = EncoreClient::new("http://localhost:8080/", "token");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn poll_defaults() {
        let options = PollOptions::default();
        assert_eq!(options.interval, Duration::from_secs(3));
        assert_eq!(options.max_attempts, 20);
    }
}
