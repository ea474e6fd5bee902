//! # Checkout Types
//!
//! Checkout preference request and the session a provider returns for it.

use crate::catalog::{Currency, Product};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A line item in a checkout preference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog product ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Title shown to the buyer
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit price as a decimal amount
    pub unit_price: f64,

    pub quantity: u32,

    pub currency: Currency,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

impl LineItem {
    /// Create a line item from a catalog product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: Some(product.id.clone()),
            title: product.title.clone(),
            description: product.description.clone(),
            unit_price: product.unit_price,
            quantity,
            currency: product.currency,
            picture_url: product.picture_url.clone(),
        }
    }

    /// Total for this line
    pub fn total(&self) -> f64 {
        self.currency.round(self.unit_price * self.quantity as f64)
    }
}

/// Where the buyer is sent back to after checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl BackUrls {
    /// Build `/success`, `/failure` and `/pending` under a storefront base URL
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{}/success", base),
            failure: format!("{}/failure", base),
            pending: format!("{}/pending", base),
        }
    }
}

impl Default for BackUrls {
    fn default() -> Self {
        Self::from_base("http://localhost:3000")
    }
}

/// Automatic redirect after checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoReturn {
    /// Redirect only approved payments
    Approved,
}

impl AutoReturn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoReturn::Approved => "approved",
        }
    }
}

/// A checkout preference to be created at the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,

    pub back_urls: BackUrls,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<AutoReturn>,

    /// Server-to-server webhook URL for this preference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,

    /// Storefront reference echoed back on the payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,

    /// Payer email (prefill)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,

    /// Idempotency key (prevents duplicate preferences on retry)
    pub idempotency_key: String,
}

impl CheckoutRequest {
    pub fn new(back_urls: BackUrls) -> Self {
        Self {
            items: Vec::new(),
            back_urls,
            auto_return: Some(AutoReturn::Approved),
            notification_url: None,
            external_reference: None,
            payer_email: None,
            idempotency_key: Uuid::new_v4().to_string(),
        }
    }

    /// Add a line item
    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Add a catalog product with quantity
    pub fn add_product(&mut self, product: &Product, quantity: u32) {
        self.add_item(LineItem::from_product(product, quantity));
    }

    /// Builder: set the notification URL
    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }

    /// Builder: set the external reference
    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// Builder: set payer email
    pub fn with_payer_email(mut self, email: impl Into<String>) -> Self {
        self.payer_email = Some(email.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of all line totals (items are assumed to share a currency)
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::total).sum()
    }
}

/// A checkout session (preference) created by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's preference ID
    pub id: String,

    /// Live checkout URL
    pub init_point: String,

    /// Sandbox checkout URL
    pub sandbox_init_point: String,

    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(
        id: impl Into<String>,
        init_point: impl Into<String>,
        sandbox_init_point: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            init_point: init_point.into(),
            sandbox_init_point: sandbox_init_point.into(),
            created_at: Utc::now(),
        }
    }
}
