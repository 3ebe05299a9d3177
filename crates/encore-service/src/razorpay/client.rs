//! Razorpay API client implementation.

use reqwest::Client;
use std::time::Duration;

use super::types::{CreateOrderRequest, RazorpayErrorResponse, RazorpayOrder};
use crate::crypto::verify_payment_signature;

/// Error type for Razorpay operations.
#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay API returned an error.
    #[error("Razorpay API error: {code} - {description}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code.
        code: String,
        /// Error description.
        description: String,
    },

    /// Invalid payment signature.
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Razorpay API client.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    api_url: String,
}

impl RazorpayClient {
    /// Razorpay API base URL.
    pub const DEFAULT_API_URL: &'static str = "https://api.razorpay.com/v1";

    /// Create a new Razorpay client.
    ///
    /// # Arguments
    ///
    /// * `key_id` - Public key ID (`rzp_test_...` or `rzp_live_...`)
    /// * `key_secret` - Key secret, used for API auth and signatures
    /// * `api_url` - Base URL, normally [`Self::DEFAULT_API_URL`]
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        api_url: &str,
    ) -> Result<Self, RazorpayError> {
        let key_id = key_id.into();
        let key_secret = key_secret.into();
        if key_id.is_empty() || key_secret.is_empty() {
            return Err(RazorpayError::Configuration(
                "Razorpay key ID and secret must not be empty".into(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            key_id,
            key_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// The public key ID handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order. No retries: a failure is returned to the caller.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let response = self
            .client
            .post(format!("{}/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        let order: RazorpayOrder = self.handle_response(response).await?;
        tracing::info!(
            order_id = %order.id,
            amount = order.amount,
            currency = %order.currency,
            "Razorpay order created"
        );
        Ok(order)
    }

    /// Fetch an order by ID.
    pub async fn fetch_order(&self, order_id: &str) -> Result<Option<RazorpayOrder>, RazorpayError> {
        let response = self
            .client
            .get(format!("{}/orders/{}", self.api_url, order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    /// Verify the signature returned by the checkout widget.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        if verify_payment_signature(order_id, payment_id, signature, &self.key_secret) {
            Ok(())
        } else {
            Err(RazorpayError::InvalidSignature)
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RazorpayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<RazorpayErrorResponse, _> = response.json().await;

        match error_body {
            Ok(razorpay_error) => Err(RazorpayError::Api {
                status: status.as_u16(),
                code: razorpay_error.error.code,
                description: razorpay_error.error.description,
            }),
            Err(_) => Err(RazorpayError::Api {
                status: status.as_u16(),
                code: "unknown".to_string(),
                description: format!("HTTP {status}"),
            }),
        }
    }
}
