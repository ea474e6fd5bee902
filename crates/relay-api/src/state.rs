//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment provider, the webhook pipeline, configuration, and product catalog.

use relay_core::{BackUrls, BoxedPaymentProvider, LoggingPaymentHandler, ProductCatalog, Reconciler};
use relay_mercadopago::{MercadoPagoClient, SignatureVerifier, WebhookPipeline};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Storefront base URL for the success/failure/pending redirects
    pub frontend_url: String,
    /// Public base URL of this relay, used for the notification URL
    pub public_url: Option<String>,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            public_url: std::env::var("PUBLIC_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Webhook URL sent with each preference, when a public URL is known
    pub fn notification_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}/webhook", base.trim_end_matches('/')))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            frontend_url: "http://localhost:3000".to_string(),
            public_url: None,
            environment: "development".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider (checkout creation and payment lookup)
    pub provider: BoxedPaymentProvider,
    /// Webhook ingestion pipeline
    pub webhooks: WebhookPipeline,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by Mercado Pago, configured from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        // Load product catalog
        let catalog = load_product_catalog()?;

        let client = MercadoPagoClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Mercado Pago: {}", e))?;
        let webhook_secret = client.config().webhook_secret.clone();

        Ok(Self::with_provider(config, Arc::new(client), webhook_secret).with_catalog(catalog))
    }

    /// Assemble state around an explicit provider
    pub fn with_provider(
        config: AppConfig,
        provider: BoxedPaymentProvider,
        webhook_secret: Option<String>,
    ) -> Self {
        let reconciler = Reconciler::new(provider.clone(), Arc::new(LoggingPaymentHandler));
        let webhooks = WebhookPipeline::new(SignatureVerifier::new(webhook_secret), reconciler);

        Self {
            provider,
            webhooks,
            catalog: Arc::new(ProductCatalog::builtin()),
            config,
        }
    }

    /// Builder: replace the product catalog
    pub fn with_catalog(mut self, catalog: ProductCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Redirect URLs for new preferences
    pub fn back_urls(&self) -> BackUrls {
        BackUrls::from_base(&self.config.frontend_url)
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    // Try to load from config/products.toml
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, using built-in catalog");
    Ok(ProductCatalog::builtin())
}
