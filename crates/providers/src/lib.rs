//! Hosted chat engine implementations for Banter.
//!
//! All engines implement the `banter_core::ChatEngine` trait.

pub mod nlpcloud;

pub use nlpcloud::NlpCloudProvider;

use banter_core::engine::ChatEngine;
use banter_core::error::EngineError;
use std::sync::Arc;

/// Build the configured engine.
///
/// Fails fast when the API key or model is missing, so a misconfigured
/// server never starts listening.
pub fn build_from_config(
    config: &banter_config::AppConfig,
) -> Result<Arc<dyn ChatEngine>, EngineError> {
    let provider = NlpCloudProvider::from_config(&config.nlp)?;
    tracing::info!(model = %provider.model(), gpu = config.nlp.use_gpu, "Chat engine configured");
    Ok(Arc::new(provider))
}
