//! # Payment Provider Trait
//!
//! The collaborator seam between the relay and the payment processor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PaymentProvider (trait)                   │
//! │  ├── create_checkout()                                      │
//! │  ├── fetch_payment()                                        │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!              ┌─────────────┴─────────────┐
//!              │                           │
//!  ┌───────────┴───────────┐   ┌───────────┴───────────┐
//!  │   MercadoPagoClient   │   │   ScriptedProvider    │
//!  │  (relay-mercadopago)  │   │       (tests)         │
//!  └───────────────────────┘   └───────────────────────┘
//! ```
//!
//! The provider is constructed once at startup and passed explicitly to the
//! components that need it; nothing reaches for a global client.

use crate::checkout::{CheckoutRequest, CheckoutSession};
use crate::error::PaymentResult;
use crate::payment::PaymentRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities the relay needs from the payment processor.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout preference.
    ///
    /// # Returns
    /// A `CheckoutSession` carrying the preference id and entry-point URLs.
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession>;

    /// Fetch the authoritative payment record by provider id.
    ///
    /// Implementations must not cache: every call reflects the provider's
    /// current view of the payment.
    async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<PaymentRecord>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;

    /// Whether this provider talks to a sandbox environment.
    fn is_sandbox(&self) -> bool {
        false
    }
}

/// Type alias for a shared payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;
