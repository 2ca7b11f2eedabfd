//! Capabilities the classifier depends on, kept behind traits so the
//! network-backed implementations can be swapped for fakes.

use async_trait::async_trait;
use hsmatch_core::LevelChoice;

use crate::AiError;

/// Turns texts into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;
}

/// Picks the best of `candidates` for `text`.
///
/// With a non-empty candidate list the returned label must be one of them.
#[async_trait]
pub trait CategoryClassifier: Send + Sync {
    async fn classify(&self, text: &str, candidates: &[String]) -> Result<LevelChoice, AiError>;
}

/// Lists the goods or services a free-text business description offers.
#[async_trait]
pub trait ItemExtractor: Send + Sync {
    async fn extract_items(&self, description: &str) -> Result<Vec<String>, AiError>;
}
