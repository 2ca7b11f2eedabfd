use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("item extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("classification of {item:?} timed out after {after:?}")]
    ClassificationTimeout { item: String, after: Duration },
}
