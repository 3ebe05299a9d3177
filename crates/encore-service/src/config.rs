//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use crate::razorpay::RazorpayClient;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/encore").
    /// Only used with the `rocksdb-backend` feature.
    pub data_dir: String,

    /// HS256 secret shared with the auth backend. Without it every
    /// bearer token is rejected.
    pub auth_jwt_secret: Option<String>,

    /// Expected JWT audience (default: "encore").
    pub auth_audience: String,

    /// Admin API key for the reporting endpoints.
    pub admin_api_key: Option<String>,

    /// Razorpay key ID (optional; payments are disabled without it).
    pub razorpay_key_id: Option<String>,

    /// Razorpay key secret, also used to verify payment signatures.
    pub razorpay_key_secret: Option<String>,

    /// Razorpay REST base URL.
    pub razorpay_api_url: String,

    /// Currency used when a course does not carry one (default: "INR").
    pub payment_currency: String,

    /// How long a payment attempt is remembered, in seconds (default: 24h).
    pub payment_attempt_ttl_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Razorpay secrets file structure.
#[derive(Debug, Deserialize)]
struct RazorpaySecrets {
    key_id: String,
    key_secret: String,
    #[serde(default)]
    api_url: Option<String>,
}

const DEFAULT_ATTEMPT_TTL_SECONDS: u64 = 24 * 60 * 60;

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load Razorpay secrets from file first, then fall back to env vars
        let (razorpay_key_id, razorpay_key_secret, razorpay_api_url) = load_razorpay_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/encore".into()),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "encore".into()),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_url: razorpay_api_url
                .unwrap_or_else(|| RazorpayClient::DEFAULT_API_URL.into()),
            payment_currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".into()),
            payment_attempt_ttl_seconds: std::env::var("PAYMENT_ATTEMPT_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ATTEMPT_TTL_SECONDS),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Load Razorpay secrets from file or environment.
fn load_razorpay_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/razorpay.json",
        "encore/.secrets/razorpay.json",
        "../.secrets/razorpay.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<RazorpaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Razorpay secrets from file");
            return (
                Some(secrets.key_id),
                Some(secrets.key_secret),
                secrets
                    .api_url
                    .or_else(|| std::env::var("RAZORPAY_API_URL").ok()),
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Razorpay secrets file not found, using environment variables");
    (
        std::env::var("RAZORPAY_KEY_ID").ok(),
        std::env::var("RAZORPAY_KEY_SECRET").ok(),
        std::env::var("RAZORPAY_API_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/encore".into(),
            auth_jwt_secret: None,
            auth_audience: "encore".into(),
            admin_api_key: None,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_url: RazorpayClient::DEFAULT_API_URL.into(),
            payment_currency: "INR".into(),
            payment_attempt_ttl_seconds: DEFAULT_ATTEMPT_TTL_SECONDS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
