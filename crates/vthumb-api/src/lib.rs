//! Axum HTTP API for the thumbnail engine.
//!
//! This crate provides:
//! - Thumbnail delivery with placeholder fallback
//! - Metadata lookup and explicit invalidation
//! - Diagnostic summaries for operator tooling
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
