//! # Test Doubles
//!
//! In-memory collaborators for exercising the relay without a network.
//! Enabled for downstream crates through the `testing` feature.

use crate::checkout::{CheckoutRequest, CheckoutSession};
use crate::error::{PaymentError, PaymentResult};
use crate::handler::PaymentHandler;
use crate::payment::PaymentRecord;
use crate::provider::PaymentProvider;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Provider that replays scripted fetch results in order.
///
/// Once the script runs out every fetch answers `PaymentNotFound`.
#[derive(Default)]
pub struct ScriptedProvider {
    fetches: Mutex<VecDeque<PaymentResult<PaymentRecord>>>,
    fetch_calls: AtomicUsize,
    checkout_failure: Option<String>,
    checkout_requests: Mutex<Vec<CheckoutRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unanswered fetch
    pub fn then_fetch(self, result: PaymentResult<PaymentRecord>) -> Self {
        self.fetches.lock().unwrap().push_back(result);
        self
    }

    /// Make every checkout creation fail with a provider error
    pub fn failing_checkout(mut self, message: impl Into<String>) -> Self {
        self.checkout_failure = Some(message.into());
        self
    }

    /// Number of `fetch_payment` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Checkout requests received so far
    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkout_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        self.checkout_requests.lock().unwrap().push(request.clone());

        if let Some(message) = &self.checkout_failure {
            return Err(PaymentError::ProviderError {
                provider: "scripted".to_string(),
                message: message.clone(),
            });
        }

        let n = self.checkout_requests.lock().unwrap().len();
        Ok(CheckoutSession::new(
            format!("pref_{}", n),
            format!("https://checkout.example/live/pref_{}", n),
            format!("https://checkout.example/sandbox/pref_{}", n),
        ))
    }

    async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<PaymentRecord> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PaymentError::PaymentNotFound {
                    payment_id: payment_id.to_string(),
                })
            })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn is_sandbox(&self) -> bool {
        true
    }
}

/// Handler that remembers every payment it was given
#[derive(Default)]
pub struct RecordingHandler {
    payments: Mutex<Vec<PaymentRecord>>,
}

impl RecordingHandler {
    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.payments.lock().unwrap().clone()
    }

    fn record(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.payments.lock().unwrap().push(payment.clone());
        Ok(())
    }
}

impl PaymentHandler for RecordingHandler {
    fn on_payment_approved(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.record(payment)
    }

    fn on_payment_pending(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.record(payment)
    }

    fn on_payment_rejected(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.record(payment)
    }

    fn on_payment_refunded(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.record(payment)
    }

    fn on_other_status(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        self.record(payment)
    }
}
