//! # relay-api
//!
//! HTTP API layer for mp-relay.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout preference creation
//! - Fast-ack webhook receiver with background reconciliation
//! - Synchronous payment verification
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/create-order` | Create checkout preference |
//! | POST | `/webhook` | Mercado Pago webhook |
//! | GET | `/api/verify-payment/{id}` | Verify payment |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
