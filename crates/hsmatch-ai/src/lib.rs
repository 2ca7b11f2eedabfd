//! Classification layer: two independent paths down the HS taxonomy (embedding
//! similarity and LLM judgment), and the batch orchestrator that reconciles
//! them into a final code set.

mod error;
pub use error::AiError;

pub mod capability;
pub mod dual;
pub mod memo;
pub mod openai;
pub mod pipeline;
pub mod similarity;

#[cfg(test)]
mod testing;

pub use capability::{CategoryClassifier, Embedder, ItemExtractor};
pub use dual::DualClassifier;
pub use memo::MemoClassifier;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use pipeline::{BatchOrchestrator, BatchReport, EngineConfig};
pub use similarity::SimilarityCache;
