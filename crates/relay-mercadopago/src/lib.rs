//! # relay-mercadopago
//!
//! Mercado Pago integration for mp-relay.
//!
//! This crate provides:
//!
//! 1. **MercadoPagoClient** - `PaymentProvider` over the REST API
//!    - Checkout preferences (`POST /checkout/preferences`)
//!    - Payment lookup (`GET /v1/payments/{id}`)
//!
//! 2. **SignatureVerifier** - `x-signature` HMAC-SHA256 checks
//!
//! 3. **WebhookPipeline** - parse, filter, verify and reconcile notifications
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay_core::{LoggingPaymentHandler, Reconciler};
//! use relay_mercadopago::{MercadoPagoClient, SignatureVerifier, WebhookPipeline};
//! use std::sync::Arc;
//!
//! let client = Arc::new(MercadoPagoClient::from_env()?);
//! let verifier = SignatureVerifier::new(client.config().webhook_secret.clone());
//! let pipeline = WebhookPipeline::new(
//!     verifier,
//!     Reconciler::new(client, Arc::new(LoggingPaymentHandler)),
//! );
//!
//! // In your webhook endpoint, after acknowledging:
//! pipeline.spawn(body.to_vec(), headers);
//! ```

pub mod client;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use client::MercadoPagoClient;
pub use config::MercadoPagoConfig;
pub use signature::{
    compute_hmac_sha256, parse_signature_header, signature_manifest, SignatureCheck,
    SignatureContext, SignatureHeader, SignatureVerifier, REQUEST_ID_HEADER, SIGNATURE_HEADER,
};
pub use webhook::{
    IngestRejection, PipelineOutcome, WebhookEnvelope, WebhookHeaders, WebhookPipeline,
    PAYMENT_TOPIC,
};
