//! # Mercado Pago Configuration
//!
//! Configuration management for the Mercado Pago integration.
//! All secrets are loaded from environment variables.

use relay_core::PaymentError;
use std::env;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";

/// Mercado Pago API configuration
#[derive(Clone)]
pub struct MercadoPagoConfig {
    /// Access token (TEST-... or APP_USR-...)
    pub access_token: String,

    /// Use sandbox checkout entry points
    pub sandbox: bool,

    /// Webhook signing secret; `None` disables signature verification
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl MercadoPagoConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `MERCADOPAGO_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `MERCADOPAGO_SANDBOX` (defaults to true for `TEST-` tokens)
    /// - `MERCADOPAGO_WEBHOOK_SECRET`
    /// - `MERCADOPAGO_API_URL`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token = env::var("MERCADOPAGO_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                PaymentError::Configuration("MERCADOPAGO_ACCESS_TOKEN not set".to_string())
            })?;

        let sandbox = match env::var("MERCADOPAGO_SANDBOX") {
            Ok(value) => parse_flag(&value).ok_or_else(|| {
                PaymentError::Configuration(format!(
                    "MERCADOPAGO_SANDBOX must be true or false, got {:?}",
                    value
                ))
            })?,
            Err(_) => access_token.starts_with("TEST-"),
        };

        let webhook_secret = env::var("MERCADOPAGO_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let mut config = Self::new(access_token, webhook_secret).with_sandbox(sandbox);
        if let Ok(url) = env::var("MERCADOPAGO_API_URL") {
            config = config.with_api_base_url(url);
        }

        if !config.has_known_token_prefix() {
            warn!("MERCADOPAGO_ACCESS_TOKEN does not start with TEST- or APP_USR-");
        }

        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(access_token: impl Into<String>, webhook_secret: Option<String>) -> Self {
        let access_token = access_token.into();
        Self {
            sandbox: access_token.starts_with("TEST-"),
            access_token,
            webhook_secret,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Check if the token is a test credential
    pub fn is_test_token(&self) -> bool {
        self.access_token.starts_with("TEST-")
    }

    fn has_known_token_prefix(&self) -> bool {
        self.is_test_token() || self.access_token.starts_with("APP_USR-")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Builder: set sandbox mode
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for MercadoPagoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoConfig")
            .field("access_token", &"[redacted]")
            .field("sandbox", &self.sandbox)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
