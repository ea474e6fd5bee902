//! # Payment Records
//!
//! The authoritative view of a payment, fetched fresh from the provider on
//! every reconciliation attempt and every verification lookup.

use crate::catalog::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment status as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    /// Status not known to this relay (passthrough)
    Unknown(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::InProcess => "in_process",
            PaymentStatus::InMediation => "in_mediation",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::ChargedBack => "charged_back",
            PaymentStatus::Unknown(other) => other,
        }
    }

    /// Only `approved` counts as a verified payment
    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "approved" => PaymentStatus::Approved,
            "pending" => PaymentStatus::Pending,
            "authorized" => PaymentStatus::Authorized,
            "in_process" => PaymentStatus::InProcess,
            "in_mediation" => PaymentStatus::InMediation,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" => PaymentStatus::Refunded,
            "charged_back" => PaymentStatus::ChargedBack,
            _ => PaymentStatus::Unknown(value),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment as the provider reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Provider payment ID
    pub id: String,

    pub status: PaymentStatus,

    /// Provider reason code (e.g. `accredited`, `cc_rejected_insufficient_amount`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,

    /// Transaction amount as a decimal
    pub amount: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,

    /// Storefront reference set on the preference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_approved: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn new(id: impl Into<String>, status: PaymentStatus, amount: f64) -> Self {
        Self {
            id: id.into(),
            status,
            status_detail: None,
            amount,
            currency: None,
            payer_email: None,
            external_reference: None,
            date_approved: None,
        }
    }

    /// Builder: set payer email
    pub fn with_payer_email(mut self, email: impl Into<String>) -> Self {
        self.payer_email = Some(email.into());
        self
    }

    pub fn is_verified(&self) -> bool {
        self.status.is_approved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_provider_strings() {
        assert_eq!(PaymentStatus::from("approved".to_string()), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::from("in_process".to_string()), PaymentStatus::InProcess);
        assert_eq!(
            PaymentStatus::from("charged_back".to_string()),
            PaymentStatus::ChargedBack
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: PaymentStatus = serde_json::from_str("\"partially_refunded\"").unwrap();

        assert_eq!(status, PaymentStatus::Unknown("partially_refunded".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"partially_refunded\"");
        assert!(!status.is_approved());
    }

    #[test]
    fn test_only_approved_is_verified() {
        let approved = PaymentRecord::new("1", PaymentStatus::Approved, 100.0);
        let pending = PaymentRecord::new("2", PaymentStatus::Pending, 100.0);
        let authorized = PaymentRecord::new("3", PaymentStatus::Authorized, 100.0);

        assert!(approved.is_verified());
        assert!(!pending.is_verified());
        assert!(!authorized.is_verified());
    }
}
