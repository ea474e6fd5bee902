//! # mp-relay
//!
//! Relay between a storefront and Mercado Pago.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export MERCADOPAGO_ACCESS_TOKEN=TEST-...
//! export MERCADOPAGO_WEBHOOK_SECRET=...   # optional, enables signature checks
//!
//! # Run the server
//! mp-relay
//! ```

use relay_api::{routes, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!(
        "Payment provider: {} (sandbox={})",
        state.provider.provider_name(),
        state.provider.is_sandbox()
    );

    if !state.webhooks.verifier().is_enabled() {
        warn!("MERCADOPAGO_WEBHOOK_SECRET not set: webhooks will be accepted without signature verification");
    }

    match state.config.notification_url() {
        Some(url) => info!("Notification URL: {}", url),
        None => info!("PUBLIC_URL not set: preferences rely on the dashboard webhook configuration"),
    }

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("mp-relay listening on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/create-order", addr);
        info!("Webhook: POST http://{}/webhook", addr);
        info!("Verify: GET http://{}/api/verify-payment/{{id}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Text logs by default, JSON lines with `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
  mp-relay
  ━━━━━━━━━━━━━━━━━━━━━━━
  Mercado Pago checkout & webhook relay
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
