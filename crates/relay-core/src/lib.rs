//! # relay-core
//!
//! Core types and traits for the mp-relay payment relay.
//!
//! This crate provides:
//! - `PaymentProvider` trait, the seam to the payment processor
//! - `CheckoutRequest`, `LineItem` and `CheckoutSession` for checkout preferences
//! - `PaymentRecord` and `PaymentStatus` for reconciled payments
//! - `Product` and `ProductCatalog` for the product catalog
//! - `Reconciler`, the bounded-retry reconciliation worker
//! - `PaymentHandler`, the business-logic extension point
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_core::{LoggingPaymentHandler, Reconciler};
//! use std::sync::Arc;
//!
//! let reconciler = Reconciler::new(provider, Arc::new(LoggingPaymentHandler));
//!
//! // Runs until the payment is fetched or 3 attempts fail
//! let outcome = reconciler.reconcile("123456789").await;
//! ```

pub mod catalog;
pub mod checkout;
pub mod error;
pub mod handler;
pub mod payment;
pub mod provider;
pub mod reconcile;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience
pub use catalog::{Currency, Product, ProductCatalog};
pub use checkout::{AutoReturn, BackUrls, CheckoutRequest, CheckoutSession, LineItem};
pub use error::{PaymentError, PaymentResult};
pub use handler::{dispatch_payment_update, LoggingPaymentHandler, PaymentHandler};
pub use payment::{PaymentRecord, PaymentStatus};
pub use provider::{BoxedPaymentProvider, PaymentProvider};
pub use reconcile::{ReconcileOutcome, Reconciler, RetryPolicy, RetryState};
