//! # Mercado Pago Client
//!
//! Implementation of the checkout preferences and payments APIs.
//! This is the only component that talks to Mercado Pago over the network.

use crate::config::MercadoPagoConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{
    CheckoutRequest, CheckoutSession, Currency, PaymentError, PaymentProvider, PaymentRecord,
    PaymentResult, PaymentStatus,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "mercadopago";

/// Mercado Pago REST client
pub struct MercadoPagoClient {
    config: MercadoPagoConfig,
    client: Client,
}

impl MercadoPagoClient {
    /// Create a new client
    pub fn new(config: MercadoPagoConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(MercadoPagoConfig::from_env()?)
    }

    pub fn config(&self) -> &MercadoPagoConfig {
        &self.config
    }

    /// Build the preference body for the API
    fn build_preference(request: &CheckoutRequest) -> PreferenceBody {
        PreferenceBody {
            items: request
                .items
                .iter()
                .map(|item| PreferenceItem {
                    id: item.id.clone(),
                    title: item.title.clone(),
                    description: item.description.clone(),
                    picture_url: item.picture_url.clone(),
                    quantity: item.quantity,
                    currency_id: item.currency.as_str().to_string(),
                    unit_price: item.unit_price,
                })
                .collect(),
            back_urls: PreferenceBackUrls {
                success: request.back_urls.success.clone(),
                failure: request.back_urls.failure.clone(),
                pending: request.back_urls.pending.clone(),
            },
            auto_return: request.auto_return.map(|a| a.as_str().to_string()),
            notification_url: request.notification_url.clone(),
            external_reference: request.external_reference.clone(),
            payer: request
                .payer_email
                .clone()
                .map(|email| PreferencePayer { email }),
        }
    }

    /// Turn a non-2xx response into a typed error
    fn api_error(status: StatusCode, body: &str, payment_id: Option<&str>) -> PaymentError {
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = payment_id {
                return PaymentError::PaymentNotFound {
                    payment_id: id.to_string(),
                };
            }
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return PaymentError::RateLimited {
                provider: PROVIDER.to_string(),
            };
        }

        let message = serde_json::from_str::<ApiErrorResponse>(body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message,
        }
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        if request.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Preference has no items".to_string(),
            ));
        }

        let body = Self::build_preference(request);
        let url = format!("{}/checkout/preferences", self.config.api_base_url);

        debug!("Creating preference: {} items", body.items.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Mercado Pago API error: status={}, body={}", status, text);
            return Err(Self::api_error(status, &text, None));
        }

        let preference: PreferenceResponse = serde_json::from_str(&text).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse preference response: {}", e))
        })?;

        info!(
            "Created preference: id={}, sandbox={}",
            preference.id, self.config.sandbox
        );

        let created_at = preference
            .date_created
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        Ok(CheckoutSession {
            id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<PaymentRecord> {
        if payment_id.is_empty() || !payment_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PaymentError::InvalidRequest(format!(
                "Malformed payment id: {:?}",
                payment_id
            )));
        }

        let url = format!("{}/v1/payments/{}", self.config.api_base_url, payment_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            debug!("Payment lookup failed: status={}, body={}", status, text);
            return Err(Self::api_error(status, &text, Some(payment_id)));
        }

        let payment: PaymentResponse = serde_json::from_str(&text).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse payment response: {}", e))
        })?;

        Ok(payment.into_record(payment_id))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn is_sandbox(&self) -> bool {
        self.config.sandbox
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// =============================================================================
// Mercado Pago API Types
// =============================================================================

/// Identifiers Mercado Pago sends either as JSON numbers or strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlexibleId {
    Number(u64),
    Text(String),
}

impl FlexibleId {
    pub(crate) fn into_string(self) -> String {
        match self {
            FlexibleId::Number(n) => n.to_string(),
            FlexibleId::Text(s) => s,
        }
    }
}

#[derive(Debug, Serialize)]
struct PreferenceBody {
    items: Vec<PreferenceItem>,
    back_urls: PreferenceBackUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_return: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<PreferencePayer>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    picture_url: Option<String>,
    quantity: u32,
    currency_id: String,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct PreferenceBackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct PreferencePayer {
    email: String,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
    sandbox_init_point: String,
    #[serde(default)]
    date_created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    id: Option<FlexibleId>,
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
    #[serde(default)]
    transaction_amount: Option<f64>,
    #[serde(default)]
    currency_id: Option<String>,
    #[serde(default)]
    payer: Option<PaymentPayer>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    date_approved: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentPayer {
    #[serde(default)]
    email: Option<String>,
}

impl PaymentResponse {
    fn into_record(self, requested_id: &str) -> PaymentRecord {
        PaymentRecord {
            id: self
                .id
                .map(FlexibleId::into_string)
                .unwrap_or_else(|| requested_id.to_string()),
            status: PaymentStatus::from(self.status),
            status_detail: self.status_detail,
            amount: self.transaction_amount.unwrap_or(0.0),
            currency: self.currency_id.as_deref().and_then(Currency::from_code),
            payer_email: self.payer.and_then(|p| p.email).filter(|e| !e.is_empty()),
            external_reference: self.external_reference.filter(|r| !r.is_empty()),
            date_approved: self.date_approved.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
