//! Vision quality oracle.
//!
//! Sends an encoded still frame to a hosted vision model and reads back a
//! 0-100 quality judgment. The oracle is treated as unreliable: every
//! failure mode collapses into [`VisionVerdict::Unavailable`] so callers
//! never have to handle errors from it.

pub mod breaker;
pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use vthumb_models::VisionVerdict;

pub use breaker::{CircuitBreaker, CircuitState};
pub use client::{GeminiVisionOracle, OracleConfig};
pub use error::{OracleError, OracleResult};

/// Judges the visual quality of an encoded frame.
#[async_trait]
pub trait VisionOracle: Send + Sync {
    /// Score `jpeg`. `hint` gives the model context about the source.
    async fn judge(&self, jpeg: &[u8], hint: &str) -> VisionVerdict;
}

/// Oracle used when no vision backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOracle;

#[async_trait]
impl VisionOracle for DisabledOracle {
    async fn judge(&self, _jpeg: &[u8], _hint: &str) -> VisionVerdict {
        VisionVerdict::Unavailable
    }
}
