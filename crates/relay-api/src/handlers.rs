//! # Request Handlers
//!
//! Axum request handlers for the relay: checkout creation, webhook
//! acknowledgment and synchronous payment verification.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use relay_core::{CheckoutRequest, PaymentError};
use relay_mercadopago::{PipelineOutcome, WebhookHeaders, REQUEST_ID_HEADER, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create order request (the whole body is optional)
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Items to purchase; empty means the catalog's default product
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Payer email (optional, prefilled on the checkout page)
    #[serde(default)]
    pub payer_email: Option<String>,
    /// Storefront order reference (generated when absent)
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Item in create order request
#[derive(Debug, Deserialize)]
pub struct OrderItem {
    /// Product ID
    pub product_id: String,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Create order response
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// Preference ID
    pub id: String,
    /// Live checkout URL
    pub init_point: String,
    /// Sandbox checkout URL
    pub sandbox_init_point: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a payment error onto a response, keeping the storefront-facing message
fn payment_error_to_response(error: &str, err: PaymentError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse::new(error).with_details(err.to_string())),
    )
}

/// Webhook acknowledgment
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Verification result
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub status: String,
    pub amount: f64,
    pub payer_email: Option<String>,
}

/// Verification failure
#[derive(Debug, Serialize)]
pub struct VerifyPaymentError {
    pub verified: bool,
    pub error: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "mp-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider.provider_name(),
        "sandbox": state.provider.is_sandbox(),
        "webhook_signatures": state.webhooks.verifier().is_enabled(),
    }))
}

/// Create a checkout preference
#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let request: CreateOrderRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateOrderRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            payment_error_to_response(
                "Solicitud invalida",
                PaymentError::InvalidRequest(e.to_string()),
            )
        })?
    };

    let mut checkout = CheckoutRequest::new(state.back_urls()).with_external_reference(
        request
            .external_reference
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    );

    if let Some(url) = state.config.notification_url() {
        checkout = checkout.with_notification_url(url);
    }

    if let Some(email) = &request.payer_email {
        checkout = checkout.with_payer_email(email.clone());
    }

    if request.items.is_empty() {
        let product = state.catalog.default_product().ok_or_else(|| {
            warn!(
                default_product = ?state.catalog.default_product,
                "No active default product to sell"
            );
            payment_error_to_response(
                "Producto no disponible",
                PaymentError::InvalidRequest("no active default product".to_string()),
            )
        })?;
        checkout.add_product(product, 1);
    }

    for item in &request.items {
        if item.quantity == 0 {
            return Err(payment_error_to_response(
                "Cantidad invalida",
                PaymentError::InvalidRequest(format!(
                    "quantity must be at least 1 for {}",
                    item.product_id
                )),
            ));
        }

        let product = state.catalog.get(&item.product_id).ok_or_else(|| {
            payment_error_to_response(
                "Producto no encontrado",
                PaymentError::ProductNotFound {
                    product_id: item.product_id.clone(),
                },
            )
        })?;

        if !product.active {
            return Err(payment_error_to_response(
                "Producto no disponible",
                PaymentError::InvalidRequest(format!(
                    "product is not available: {}",
                    item.product_id
                )),
            ));
        }

        checkout.add_product(product, item.quantity);
    }

    info!(
        "Creating preference: {} items, total={:.2}, reference={:?}",
        checkout.item_count(),
        checkout.total(),
        checkout.external_reference
    );

    let session = state.provider.create_checkout(&checkout).await.map_err(|e| {
        error!("Failed to create preference: {}", e);
        payment_error_to_response(
            "Error al crear la preferencia de pago",
            PaymentError::CheckoutCreationFailed(e.to_string()),
        )
    })?;

    info!("Created preference: {}", session.id);

    Ok(Json(CreateOrderResponse {
        id: session.id,
        init_point: session.init_point,
        sandbox_init_point: session.sandbox_init_point,
    }))
}

/// Handle a Mercado Pago webhook.
///
/// Always answers `200 {"received": true}`; processing happens on a
/// detached task whose outcome only shows up in logs.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookAck>) {
    // Detached: the handle is dropped, the task runs to completion on its own
    drop(spawn_webhook(&state, &headers, &body));

    (StatusCode::OK, Json(WebhookAck { received: true }))
}

/// Start the ingestion pipeline for one webhook request
fn spawn_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> JoinHandle<PipelineOutcome> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let webhook_headers = WebhookHeaders::new(header(SIGNATURE_HEADER), header(REQUEST_ID_HEADER));

    state.webhooks.spawn(body.to_vec(), webhook_headers)
}

/// Look up a payment once and report whether it is approved
#[instrument(skip(state))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<VerifyPaymentResponse>, (StatusCode, Json<VerifyPaymentError>)> {
    let payment = state.provider.fetch_payment(&payment_id).await.map_err(|e| {
        warn!(payment_id = %payment_id, error = %e, "Payment verification failed");
        (
            StatusCode::NOT_FOUND,
            Json(VerifyPaymentError {
                verified: false,
                error: "Pago no encontrado".to_string(),
            }),
        )
    })?;

    info!(
        payment_id = %payment.id,
        status = %payment.status,
        "Payment verification"
    );

    Ok(Json(VerifyPaymentResponse {
        verified: payment.is_verified(),
        status: payment.status.to_string(),
        amount: payment.amount,
        payer_email: payment.payer_email,
    }))
}
