//! # Webhook Ingestion
//!
//! Processing of Mercado Pago notifications after the HTTP layer has
//! already acknowledged them. Each webhook goes through:
//!
//! ```text
//! parse ──► filter (type == "payment", data.id) ──► verify signature ──► reconcile
//! ```
//!
//! Every stage may drop the notification. Nothing here can change the
//! response the sender already received; outcomes are visible in logs only.

use crate::signature::{SignatureCheck, SignatureVerifier};
use relay_core::{PaymentError, PaymentResult, ReconcileOutcome, Reconciler};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Notification type that carries a payment id
pub const PAYMENT_TOPIC: &str = "payment";

/// Parsed notification body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// e.g. `payment.created`, `payment.updated`
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
}

/// Accept `data.id` as a string or a non-negative integer; any other value
/// counts as absent instead of failing the whole envelope.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(n)) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    })
}

impl WebhookEnvelope {
    pub fn parse(body: &[u8]) -> PaymentResult<Self> {
        serde_json::from_slice(body).map_err(|e| PaymentError::WebhookParseError(e.to_string()))
    }

    pub fn is_payment(&self) -> bool {
        self.kind.as_deref() == Some(PAYMENT_TOPIC)
    }

    /// `data.id` as a string, if present and non-empty
    pub fn payment_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.id.clone())
            .filter(|id| !id.is_empty())
    }
}

/// Authentication headers taken off the webhook request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub signature: Option<String>,
    pub request_id: Option<String>,
}

impl WebhookHeaders {
    pub fn new(signature: Option<String>, request_id: Option<String>) -> Self {
        Self {
            signature,
            request_id,
        }
    }
}

/// Why a webhook was dropped before reconciliation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestRejection {
    /// Body is not valid UTF-8 JSON of the expected shape
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Not a payment notification
    #[error("ignored notification type {0:?}")]
    Ignored(Option<String>),

    /// Payment notification without `data.id`
    #[error("payment notification without data.id")]
    MissingPaymentId,

    /// Signature check failed
    #[error("signature rejected: {0}")]
    Rejected(String),
}

/// Terminal state of one webhook's background task
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Dropped(IngestRejection),
    Reconciled(ReconcileOutcome),
}

/// Webhook ingestion pipeline
///
/// Cheap to clone; the HTTP layer hands a clone to each detached task.
#[derive(Clone)]
pub struct WebhookPipeline {
    verifier: SignatureVerifier,
    reconciler: Reconciler,
}

impl WebhookPipeline {
    pub fn new(verifier: SignatureVerifier, reconciler: Reconciler) -> Self {
        Self {
            verifier,
            reconciler,
        }
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Parse, filter and authenticate a webhook, yielding the payment id.
    pub fn ingest(&self, body: &[u8], headers: &WebhookHeaders) -> Result<String, IngestRejection> {
        debug!(body = %String::from_utf8_lossy(body), "Webhook body");

        let envelope = WebhookEnvelope::parse(body).map_err(|e| {
            error!(error = %e, "Could not parse webhook body");
            IngestRejection::Malformed(e.to_string())
        })?;

        if !envelope.is_payment() {
            info!(kind = ?envelope.kind, action = ?envelope.action, "Ignoring non-payment webhook");
            return Err(IngestRejection::Ignored(envelope.kind));
        }

        let payment_id = envelope.payment_id().ok_or_else(|| {
            warn!(action = ?envelope.action, "Payment webhook without data.id");
            IngestRejection::MissingPaymentId
        })?;

        match self.verifier.verify(
            headers.signature.as_deref(),
            headers.request_id.as_deref(),
            &payment_id,
        ) {
            Ok(SignatureCheck::Verified) | Ok(SignatureCheck::Skipped) => Ok(payment_id),
            Err(e) => {
                warn!(payment_id = %payment_id, error = %e, "Rejected webhook");
                Err(IngestRejection::Rejected(e.to_string()))
            }
        }
    }

    /// Run the whole pipeline for one webhook.
    #[instrument(skip_all, fields(request_id = headers.request_id.as_deref().unwrap_or("")))]
    pub async fn run(&self, body: &[u8], headers: &WebhookHeaders) -> PipelineOutcome {
        let payment_id = match self.ingest(body, headers) {
            Ok(id) => id,
            Err(rejection) => return PipelineOutcome::Dropped(rejection),
        };

        info!(payment_id = %payment_id, "Reconciling payment from webhook");
        PipelineOutcome::Reconciled(self.reconciler.reconcile(&payment_id).await)
    }

    /// Run the pipeline on a detached task.
    ///
    /// The returned handle is only for tests; callers may drop it.
    pub fn spawn(&self, body: Vec<u8>, headers: WebhookHeaders) -> JoinHandle<PipelineOutcome> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(&body, &headers).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{compute_hmac_sha256, signature_manifest};
    use relay_core::testing::{RecordingHandler, ScriptedProvider};
    use relay_core::{PaymentError, PaymentRecord, PaymentStatus};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const SECRET: &str = "test-webhook-secret";
    const REQUEST_ID: &str = "req-1";

    fn pipeline(provider: Arc<ScriptedProvider>, secret: Option<&str>) -> WebhookPipeline {
        let reconciler = Reconciler::new(provider, Arc::new(RecordingHandler::default()));
        WebhookPipeline::new(SignatureVerifier::new(secret.map(String::from)), reconciler)
    }

    fn signed_headers(payment_id: &str) -> WebhookHeaders {
        let ts = "1704908010";
        let mac = compute_hmac_sha256(SECRET, &signature_manifest(payment_id, REQUEST_ID, ts)).unwrap();
        WebhookHeaders::new(
            Some(format!("ts={},v1={}", ts, mac)),
            Some(REQUEST_ID.to_string()),
        )
    }

    fn payment_body(id: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "action": "payment.updated",
            "type": "payment",
            "data": { "id": id }
        }))
        .unwrap()
    }

    fn approved(id: &str) -> PaymentRecord {
        PaymentRecord::new(id, PaymentStatus::Approved, 100.0)
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope = WebhookEnvelope::parse(&payment_body(json!("123"))).unwrap();

        assert!(envelope.is_payment());
        assert_eq!(envelope.payment_id().as_deref(), Some("123"));
        assert_eq!(envelope.action.as_deref(), Some("payment.updated"));
    }

    #[test]
    fn test_numeric_payment_id() {
        let envelope = WebhookEnvelope::parse(&payment_body(json!(123456789))).unwrap();
        assert_eq!(envelope.payment_id().as_deref(), Some("123456789"));
    }

    #[test]
    fn test_unparseable_body_is_a_parse_error() {
        assert!(matches!(
            WebhookEnvelope::parse(b"{\"type\": "),
            Err(PaymentError::WebhookParseError(_))
        ));
    }

    #[test]
    fn test_unusable_payment_id_counts_as_missing() {
        let provider = Arc::new(ScriptedProvider::new());
        let p = pipeline(provider.clone(), None);

        for id in [json!(12.5), json!(-1), json!(true), json!({ "nested": 1 }), json!(null)] {
            assert_eq!(
                p.ingest(&payment_body(id), &WebhookHeaders::default()),
                Err(IngestRejection::MissingPaymentId)
            );
        }
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[test]
    fn test_ingest_without_secret() {
        let provider = Arc::new(ScriptedProvider::new());
        let result = pipeline(provider, None).ingest(&payment_body(json!("123")), &WebhookHeaders::default());

        assert_eq!(result.unwrap(), "123");
    }

    #[test]
    fn test_ingest_malformed_body() {
        let provider = Arc::new(ScriptedProvider::new());
        let p = pipeline(provider, None);

        assert!(matches!(
            p.ingest(b"not json", &WebhookHeaders::default()),
            Err(IngestRejection::Malformed(_))
        ));
        assert!(matches!(
            p.ingest(&[0xff, 0xfe, 0x00], &WebhookHeaders::default()),
            Err(IngestRejection::Malformed(_))
        ));
    }

    #[test]
    fn test_ingest_missing_payment_id() {
        let provider = Arc::new(ScriptedProvider::new());
        let p = pipeline(provider, None);

        let no_data = serde_json::to_vec(&json!({ "type": "payment" })).unwrap();
        let no_id = serde_json::to_vec(&json!({ "type": "payment", "data": {} })).unwrap();

        assert_eq!(
            p.ingest(&no_data, &WebhookHeaders::default()),
            Err(IngestRejection::MissingPaymentId)
        );
        assert_eq!(
            p.ingest(&no_id, &WebhookHeaders::default()),
            Err(IngestRejection::MissingPaymentId)
        );
    }

    #[tokio::test]
    async fn test_non_payment_type_never_fetches() {
        let provider = Arc::new(ScriptedProvider::new().then_fetch(Ok(approved("123"))));
        let body = serde_json::to_vec(&json!({ "type": "refund", "data": { "id": "123" } })).unwrap();

        let outcome = pipeline(provider.clone(), None)
            .run(&body, &WebhookHeaders::default())
            .await;

        assert_eq!(
            outcome,
            PipelineOutcome::Dropped(IngestRejection::Ignored(Some("refund".to_string())))
        );
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_with_secret_never_fetches() {
        let provider = Arc::new(ScriptedProvider::new().then_fetch(Ok(approved("123"))));
        let headers = WebhookHeaders::new(None, Some(REQUEST_ID.to_string()));

        let outcome = pipeline(provider.clone(), Some(SECRET))
            .run(&payment_body(json!("123")), &headers)
            .await;

        assert!(matches!(
            outcome,
            PipelineOutcome::Dropped(IngestRejection::Rejected(_))
        ));
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_forged_signature_never_fetches() {
        let provider = Arc::new(ScriptedProvider::new().then_fetch(Ok(approved("123"))));
        // Signed for a different payment
        let headers = signed_headers("456");

        let outcome = pipeline(provider.clone(), Some(SECRET))
            .run(&payment_body(json!("123")), &headers)
            .await;

        assert!(matches!(
            outcome,
            PipelineOutcome::Dropped(IngestRejection::Rejected(_))
        ));
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_webhook_reconciles_on_first_attempt() {
        let provider = Arc::new(ScriptedProvider::new().then_fetch(Ok(approved("123"))));

        let start = Instant::now();
        let outcome = pipeline(provider.clone(), Some(SECRET))
            .run(&payment_body(json!("123")), &signed_headers("123"))
            .await;

        match outcome {
            PipelineOutcome::Reconciled(ReconcileOutcome::Confirmed { payment, attempts }) => {
                assert_eq!(attempts, 1);
                assert!(payment.is_verified());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_webhook_retries_until_success() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_fetch(Err(PaymentError::NetworkError("down".into())))
                .then_fetch(Err(PaymentError::NetworkError("down".into())))
                .then_fetch(Ok(approved("123"))),
        );

        let start = Instant::now();
        let handle = pipeline(provider.clone(), Some(SECRET))
            .spawn(payment_body(json!("123")), signed_headers("123"));
        let outcome = handle.await.unwrap();
        let elapsed = start.elapsed();

        assert!(matches!(
            outcome,
            PipelineOutcome::Reconciled(ReconcileOutcome::Confirmed { attempts: 3, .. })
        ));
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
        assert_eq!(provider.fetch_calls(), 3);
    }
}
