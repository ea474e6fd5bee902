//! # Payment Reconciliation
//!
//! Confirms a payment's state by asking the provider directly instead of
//! trusting a webhook payload. Fetches are retried with exponential backoff;
//! the first successful fetch ends the task whatever the payment status is.
//!
//! ```text
//! attempt 1 ──fail──► sleep 1s ──► attempt 2 ──fail──► sleep 2s ──► attempt 3 ──fail──► exhausted
//!     │                                │                                │
//!     └──ok──► handler                 └──ok──► handler                 └──ok──► handler
//! ```

use crate::handler::{dispatch_payment_update, PaymentHandler};
use crate::payment::PaymentRecord;
use crate::provider::BoxedPaymentProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Bounded retry schedule for provider fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on each further failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

/// Progress through one reconciliation task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts,
        }
    }

    /// Begin the next attempt, returning its 1-based number
    pub fn advance(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Whether the current attempt is the last one allowed
    pub fn is_final(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// How a reconciliation task ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The provider returned the payment record
    Confirmed {
        payment: PaymentRecord,
        attempts: u32,
    },
    /// Every attempt failed
    Exhausted { attempts: u32, last_error: String },
}

impl ReconcileOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            ReconcileOutcome::Confirmed { attempts, .. } => *attempts,
            ReconcileOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn payment(&self) -> Option<&PaymentRecord> {
        match self {
            ReconcileOutcome::Confirmed { payment, .. } => Some(payment),
            ReconcileOutcome::Exhausted { .. } => None,
        }
    }
}

/// Reconciliation worker
///
/// Cheap to clone; every task gets its own [`RetryState`].
#[derive(Clone)]
pub struct Reconciler {
    provider: BoxedPaymentProvider,
    handler: Arc<dyn PaymentHandler>,
    policy: RetryPolicy,
}

impl Reconciler {
    pub fn new(provider: BoxedPaymentProvider, handler: Arc<dyn PaymentHandler>) -> Self {
        Self {
            provider,
            handler,
            policy: RetryPolicy::default(),
        }
    }

    /// Builder: override the retry schedule
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the payment until it is retrieved or attempts run out.
    ///
    /// Never returns an error: failures end up in logs and in
    /// [`ReconcileOutcome::Exhausted`].
    #[instrument(skip(self), fields(provider = self.provider.provider_name()))]
    pub async fn reconcile(&self, payment_id: &str) -> ReconcileOutcome {
        let mut state = RetryState::new(&self.policy);

        loop {
            let attempt = state.advance();

            match self.provider.fetch_payment(payment_id).await {
                Ok(payment) => {
                    info!(
                        payment_id = %payment.id,
                        status = %payment.status,
                        amount = payment.amount,
                        payer_email = payment.payer_email.as_deref().unwrap_or("unknown"),
                        attempt,
                        "Payment reconciled"
                    );

                    if let Err(e) = dispatch_payment_update(self.handler.as_ref(), &payment) {
                        error!(payment_id = %payment.id, error = %e, "Payment handler failed");
                    }

                    return ReconcileOutcome::Confirmed {
                        payment,
                        attempts: attempt,
                    };
                }
                Err(e) if state.is_final() => {
                    error!(
                        payment_id,
                        attempt,
                        max_attempts = state.max_attempts,
                        error = %e,
                        "Giving up on payment reconciliation"
                    );
                    return ReconcileOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    };
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        payment_id,
                        attempt,
                        max_attempts = state.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Payment fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
