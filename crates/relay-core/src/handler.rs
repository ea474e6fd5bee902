//! # Payment Handlers
//!
//! Extension point for business logic that runs once a payment has been
//! reconciled against the provider (granting access, sending receipts, ...).
//! The relay itself ships only a logging handler.

use crate::error::PaymentResult;
use crate::payment::{PaymentRecord, PaymentStatus};
use tracing::{debug, info, warn};

/// Reconciled payment handler trait
///
/// Implement this trait to act on confirmed payment records.
#[allow(unused_variables)]
pub trait PaymentHandler: Send + Sync {
    /// Called when the provider reports the payment as approved
    fn on_payment_approved(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        info!(
            payment_id = %payment.id,
            amount = payment.amount,
            payer_email = payment.payer_email.as_deref().unwrap_or("unknown"),
            "Payment approved"
        );
        Ok(())
    }

    /// Called while the payment is still pending, authorized or in process
    fn on_payment_pending(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        info!(payment_id = %payment.id, status = %payment.status, "Payment pending");
        Ok(())
    }

    /// Called when the payment was rejected or cancelled
    fn on_payment_rejected(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        warn!(
            payment_id = %payment.id,
            status = %payment.status,
            detail = payment.status_detail.as_deref().unwrap_or(""),
            "Payment rejected"
        );
        Ok(())
    }

    /// Called when the payment was refunded or charged back
    fn on_payment_refunded(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        warn!(payment_id = %payment.id, status = %payment.status, "Payment reversed");
        Ok(())
    }

    /// Called for mediation and unknown statuses
    fn on_other_status(&self, payment: &PaymentRecord) -> PaymentResult<()> {
        debug!(payment_id = %payment.id, status = %payment.status, "Unhandled payment status");
        Ok(())
    }
}

/// Default no-op payment handler (just logs)
pub struct LoggingPaymentHandler;

impl PaymentHandler for LoggingPaymentHandler {}

/// Dispatch a reconciled payment to the appropriate handler method
pub fn dispatch_payment_update(
    handler: &dyn PaymentHandler,
    payment: &PaymentRecord,
) -> PaymentResult<()> {
    match &payment.status {
        PaymentStatus::Approved => handler.on_payment_approved(payment),
        PaymentStatus::Pending | PaymentStatus::Authorized | PaymentStatus::InProcess => {
            handler.on_payment_pending(payment)
        }
        PaymentStatus::Rejected | PaymentStatus::Cancelled => handler.on_payment_rejected(payment),
        PaymentStatus::Refunded | PaymentStatus::ChargedBack => {
            handler.on_payment_refunded(payment)
        }
        PaymentStatus::InMediation | PaymentStatus::Unknown(_) => handler.on_other_status(payment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<&'static str>>,
    }

    impl PaymentHandler for RecordingHandler {
        fn on_payment_approved(&self, _payment: &PaymentRecord) -> PaymentResult<()> {
            self.calls.lock().unwrap().push("approved");
            Ok(())
        }

        fn on_payment_pending(&self, _payment: &PaymentRecord) -> PaymentResult<()> {
            self.calls.lock().unwrap().push("pending");
            Ok(())
        }

        fn on_payment_rejected(&self, _payment: &PaymentRecord) -> PaymentResult<()> {
            self.calls.lock().unwrap().push("rejected");
            Ok(())
        }

        fn on_payment_refunded(&self, _payment: &PaymentRecord) -> PaymentResult<()> {
            self.calls.lock().unwrap().push("refunded");
            Ok(())
        }

        fn on_other_status(&self, _payment: &PaymentRecord) -> PaymentResult<()> {
            self.calls.lock().unwrap().push("other");
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_by_status() {
        let handler = RecordingHandler::default();
        let statuses = [
            PaymentStatus::Approved,
            PaymentStatus::InProcess,
            PaymentStatus::Cancelled,
            PaymentStatus::ChargedBack,
            PaymentStatus::Unknown("weird".to_string()),
        ];

        for status in statuses {
            let payment = PaymentRecord::new("123", status, 100.0);
            dispatch_payment_update(&handler, &payment).unwrap();
        }

        assert_eq!(
            *handler.calls.lock().unwrap(),
            vec!["approved", "pending", "rejected", "refunded", "other"]
        );
    }

    #[test]
    fn test_logging_handler_accepts_everything() {
        let payment = PaymentRecord::new("123", PaymentStatus::Rejected, 100.0);
        assert!(dispatch_payment_update(&LoggingPaymentHandler, &payment).is_ok());
    }
}
