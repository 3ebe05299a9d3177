//! Cryptographic utilities for payment signature verification.
//!
//! Razorpay signs a successful checkout with
//! `HMAC-SHA256(key_secret, order_id + "|" + payment_id)`, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    let result = mac.finalize();

    hex::encode(result.into_bytes())
}

/// Constant-time string comparison.
///
/// Returns `true` if the strings are equal. Only the length is leaked.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// The signature Razorpay produces for a completed checkout.
#[must_use]
pub fn razorpay_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    hmac_sha256_hex(secret, &format!("{order_id}|{payment_id}"))
}

/// Check a checkout signature supplied by the client.
#[must_use]
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    constant_time_eq(&razorpay_signature(order_id, payment_id, secret), signature)
}
