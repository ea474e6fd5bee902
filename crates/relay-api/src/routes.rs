//! # Routes
//!
//! Axum router configuration for the relay.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - POST /create-order - Create a checkout preference
/// - GET  /api/verify-payment/{id} - Synchronous payment lookup
/// - POST /webhook - Mercado Pago notifications (raw body, always 200)
/// - GET  /health - Health check
pub fn create_router(state: AppState) -> Router {
    // The storefront calls the relay from the browser
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/verify-payment/{payment_id}", get(handlers::verify_payment));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // Checkout
        .route("/create-order", post(handlers::create_order))
        // Webhook (handler takes the raw body)
        .route("/webhook", post(handlers::webhook))
        // API
        .nest("/api", api_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use relay_core::testing::ScriptedProvider;
    use std::sync::Arc;

    fn server() -> TestServer {
        let state = AppState::with_provider(
            AppConfig::default(),
            Arc::new(ScriptedProvider::new()),
            None,
        );
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_root_is_health() {
        server().get("/").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route() {
        server()
            .get("/api/v1/products")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_rejects_get() {
        server()
            .get("/webhook")
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}
