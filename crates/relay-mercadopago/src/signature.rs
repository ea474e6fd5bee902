//! # Webhook Signature Verification
//!
//! Mercado Pago signs each notification with HMAC-SHA256 over a manifest
//! built from the payment id, the `x-request-id` header and the timestamp
//! carried in `x-signature`:
//!
//! ```text
//! x-signature: ts=1704908010,v1=618c8534...
//! manifest:    id:{payment_id};request-id:{x-request-id};ts:{ts};
//! ```
//!
//! Without a configured secret verification is skipped and the webhook is
//! accepted unauthenticated.

use hmac::{Hmac, Mac};
use relay_core::{PaymentError, PaymentResult};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Parsed `x-signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: String,
    pub v1: String,
}

/// Parse `ts=<int>,v1=<hex>`.
///
/// Segments without `=` are rejected. Unknown keys are ignored.
pub fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut ts = None;
    let mut v1 = None;

    for part in header.split(',') {
        let (key, value) = part.split_once('=').ok_or_else(|| {
            PaymentError::WebhookVerificationFailed(format!(
                "Malformed signature segment: {:?}",
                part.trim()
            ))
        })?;

        match key.trim() {
            "ts" => ts = Some(value.trim().to_string()),
            "v1" => v1 = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let ts = ts.filter(|t| !t.is_empty()).ok_or_else(|| {
        PaymentError::WebhookVerificationFailed("Missing ts in signature".to_string())
    })?;

    let v1 = v1.filter(|v| !v.is_empty()).ok_or_else(|| {
        PaymentError::WebhookVerificationFailed("Missing v1 in signature".to_string())
    })?;

    Ok(SignatureHeader { ts, v1 })
}

/// Everything a signature check needs, taken from one webhook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureContext {
    pub timestamp: String,
    pub provided_mac: String,
    pub request_id: String,
    pub payment_id: String,
}

impl SignatureContext {
    /// Assemble the context; any missing or empty part fails closed
    pub fn from_headers(
        signature: Option<&str>,
        request_id: Option<&str>,
        payment_id: &str,
    ) -> PaymentResult<Self> {
        let signature = signature.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            PaymentError::WebhookVerificationFailed(format!("Missing {} header", SIGNATURE_HEADER))
        })?;

        let request_id = request_id
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                PaymentError::WebhookVerificationFailed(format!(
                    "Missing {} header",
                    REQUEST_ID_HEADER
                ))
            })?;

        if payment_id.is_empty() {
            return Err(PaymentError::WebhookVerificationFailed(
                "Missing payment id".to_string(),
            ));
        }

        let header = parse_signature_header(signature)?;

        Ok(Self {
            timestamp: header.ts,
            provided_mac: header.v1,
            request_id: request_id.to_string(),
            payment_id: payment_id.to_string(),
        })
    }

    /// The signed manifest string
    pub fn manifest(&self) -> String {
        signature_manifest(&self.payment_id, &self.request_id, &self.timestamp)
    }
}

/// `id:{payment_id};request-id:{request_id};ts:{ts};`
pub fn signature_manifest(payment_id: &str, request_id: &str, ts: &str) -> String {
    format!("id:{};request-id:{};ts:{};", payment_id, request_id, ts)
}

/// Hex-encoded HMAC-SHA256 of `message`
pub fn compute_hmac_sha256(secret: &str, message: &str) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Internal(format!("HMAC key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Result of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The MAC matched
    Verified,
    /// No secret configured; nothing was checked
    Skipped,
}

/// Checks webhook authenticity against the shared secret
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify one webhook.
    ///
    /// `Ok(Skipped)` when no secret is configured; an error for missing
    /// parts or a MAC mismatch.
    pub fn verify(
        &self,
        signature: Option<&str>,
        request_id: Option<&str>,
        payment_id: &str,
    ) -> PaymentResult<SignatureCheck> {
        let Some(secret) = self.secret.as_deref() else {
            warn!(
                payment_id,
                "Webhook secret not configured, skipping signature verification"
            );
            return Ok(SignatureCheck::Skipped);
        };

        let context = SignatureContext::from_headers(signature, request_id, payment_id)?;
        let expected = compute_hmac_sha256(secret, &context.manifest())?;
        let provided = context.provided_mac.to_ascii_lowercase();

        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            warn!(
                payment_id,
                request_id = %context.request_id,
                ts = %context.timestamp,
                "Webhook signature mismatch, possible forgery"
            );
            return Err(PaymentError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        debug!(payment_id, "Webhook signature verified");
        Ok(SignatureCheck::Verified)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-webhook-secret";
    const REQUEST_ID: &str = "bb56a2f1-6aae-46ac-982e-9dcd3581d08e";
    const TS: &str = "1704908010";
    const EXPECTED_MAC: &str = "0be1dd67c662d5606e5acb3e6904c5536d2c10aa3b74a9349361b327c4dc65eb";

    fn header(mac: &str) -> String {
        format!("ts={},v1={}", TS, mac)
    }

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("ts=1704908010, v1=abc123").unwrap();

        assert_eq!(parsed.ts, "1704908010");
        assert_eq!(parsed.v1, "abc123");
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let parsed = parse_signature_header("v2=zzz,ts=1,v1=abc").unwrap();
        assert_eq!(parsed.v1, "abc");
    }

    #[test]
    fn test_parse_rejects_malformed_segments() {
        assert!(parse_signature_header("ts=1,garbage,v1=abc").is_err());
        assert!(parse_signature_header("").is_err());
    }

    #[test]
    fn test_parse_requires_ts_and_v1() {
        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("ts=1").is_err());
        assert!(parse_signature_header("ts=,v1=abc").is_err());
    }

    #[test]
    fn test_manifest_format() {
        assert_eq!(
            signature_manifest("123", REQUEST_ID, TS),
            "id:123;request-id:bb56a2f1-6aae-46ac-982e-9dcd3581d08e;ts:1704908010;"
        );
    }

    #[test]
    fn test_hmac_matches_reference() {
        let mac = compute_hmac_sha256("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            mac,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );

        let manifest = signature_manifest("123", REQUEST_ID, TS);
        assert_eq!(compute_hmac_sha256(SECRET, &manifest).unwrap(), EXPECTED_MAC);
        // Stable across calls
        assert_eq!(compute_hmac_sha256(SECRET, &manifest).unwrap(), EXPECTED_MAC);
    }

    #[test]
    fn test_valid_signature_verifies() {
        let verifier = SignatureVerifier::new(Some(SECRET.to_string()));
        let result = verifier.verify(Some(&header(EXPECTED_MAC)), Some(REQUEST_ID), "123");

        assert_eq!(result.unwrap(), SignatureCheck::Verified);
    }

    #[test]
    fn test_uppercase_mac_verifies() {
        let verifier = SignatureVerifier::new(Some(SECRET.to_string()));
        let upper = EXPECTED_MAC.to_ascii_uppercase();

        assert!(verifier.verify(Some(&header(&upper)), Some(REQUEST_ID), "123").is_ok());
    }

    #[test]
    fn test_tampering_fails() {
        let verifier = SignatureVerifier::new(Some(SECRET.to_string()));

        // Different payment id
        assert!(verifier
            .verify(Some(&header(EXPECTED_MAC)), Some(REQUEST_ID), "124")
            .is_err());
        // Different request id
        assert!(verifier
            .verify(Some(&header(EXPECTED_MAC)), Some("another-request"), "123")
            .is_err());
        // Different timestamp
        let shifted = format!("ts=1704908011,v1={}", EXPECTED_MAC);
        assert!(verifier.verify(Some(&shifted), Some(REQUEST_ID), "123").is_err());
        // Different secret
        let other = SignatureVerifier::new(Some("other-secret".to_string()));
        assert!(other
            .verify(Some(&header(EXPECTED_MAC)), Some(REQUEST_ID), "123")
            .is_err());
    }

    #[test]
    fn test_missing_parts_fail_closed() {
        let verifier = SignatureVerifier::new(Some(SECRET.to_string()));

        assert!(verifier.verify(None, Some(REQUEST_ID), "123").is_err());
        assert!(verifier.verify(Some(&header(EXPECTED_MAC)), None, "123").is_err());
        assert!(verifier.verify(Some(&header(EXPECTED_MAC)), Some("  "), "123").is_err());
        assert!(verifier.verify(Some(&header(EXPECTED_MAC)), Some(REQUEST_ID), "").is_err());
        assert!(verifier
            .verify(Some(&format!("v1={}", EXPECTED_MAC)), Some(REQUEST_ID), "123")
            .is_err());
    }

    #[test]
    fn test_no_secret_skips() {
        let verifier = SignatureVerifier::new(None);

        assert!(!verifier.is_enabled());
        assert_eq!(
            verifier.verify(None, None, "123").unwrap(),
            SignatureCheck::Skipped
        );
        // An empty secret counts as unset
        assert!(!SignatureVerifier::new(Some(String::new())).is_enabled());
    }

    #[test]
    fn test_context_from_headers() {
        let context =
            SignatureContext::from_headers(Some(&header(EXPECTED_MAC)), Some(REQUEST_ID), "123")
                .unwrap();

        assert_eq!(context.timestamp, TS);
        assert_eq!(context.provided_mac, EXPECTED_MAC);
        assert_eq!(context.manifest(), signature_manifest("123", REQUEST_ID, TS));
    }
}
