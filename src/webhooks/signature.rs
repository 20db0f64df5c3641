//! Webhook authenticity checks.
//!
//! GitHub signs webhook payloads using HMAC-SHA256 with a shared secret.
//! The signature is provided in the `X-Hub-Signature-256` header as `sha256=<hex>`.
//!
//! GitLab does not sign payloads; it echoes a configured secret token in the
//! `X-Gitlab-Token` header instead.
//!
//! Both checks are optional per repository and run before the body is parsed.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Parses a GitHub signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
///
/// # Examples
///
/// ```
/// use mirror_relay::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha1=abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so this never takes the else branch
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return Vec::new();
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// Uses constant-time comparison.
///
/// # Examples
///
/// ```
/// use mirror_relay::webhooks::{verify_signature, compute_signature, format_signature_header};
///
/// let payload = br#"{"ref":"refs/heads/main"}"#;
/// let header = format_signature_header(&compute_signature(payload, b"hook-secret"));
///
/// assert!(verify_signature(payload, &header, b"hook-secret"));
/// assert!(!verify_signature(payload, &header, b"other-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected_signature) = parse_signature_header(signature_header) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

/// Checks an `X-Gitlab-Token` header against the configured token.
///
/// Both sides are hashed first so the comparison time does not depend on
/// where the first differing byte is, nor on the token length.
pub fn verify_gitlab_token(header: &str, expected: &str) -> bool {
    let provided = Sha256::digest(header.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
