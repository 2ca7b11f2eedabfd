//! Cosine ranking over memoized embeddings.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use hsmatch_core::round_confidence;
use tracing::debug;

use crate::AiError;
use crate::capability::Embedder;

/// Ranks candidate labels against a query by cosine similarity.
///
/// Every text ever embedded is kept for the life of the cache, keyed by its
/// exact content. Taxonomy labels repeat across items and batches, so after
/// warm-up only new item texts reach the embedder.
pub struct SimilarityCache {
    embedder: Arc<dyn Embedder>,
    vectors: RwLock<HashMap<String, Arc<[f32]>>>,
}

impl SimilarityCache {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// The `top_n` candidates most similar to `query`, best first.
    ///
    /// Equal scores keep candidate order. Scores are rounded to 3 decimals and
    /// clamped into `[0, 1]`.
    pub async fn rank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<(String, f32)>, AiError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(query.to_string());
        texts.extend(candidates.iter().cloned());
        let vectors = self.vectors_for(&texts).await?;

        let (query_vec, candidate_vecs) = vectors
            .split_first()
            .ok_or_else(|| AiError::EmbeddingUnavailable("no query vector".into()))?;
        let mut scored: Vec<(usize, f32)> = candidate_vecs
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine(query_vec, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(i, score)| (candidates[i].clone(), round_confidence(score)))
            .collect())
    }

    /// Number of texts with a cached vector.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Vectors for `texts` in order, embedding the uncached ones in one call.
    async fn vectors_for(&self, texts: &[String]) -> Result<Vec<Arc<[f32]>>, AiError> {
        let missing: Vec<String> = {
            let cached = self.read();
            let mut seen = HashSet::new();
            texts
                .iter()
                .filter(|t| !cached.contains_key(t.as_str()) && seen.insert(t.as_str()))
                .cloned()
                .collect()
        };

        if !missing.is_empty() {
            let embedded = self.embedder.embed(&missing).await?;
            if embedded.len() != missing.len() {
                return Err(AiError::EmbeddingUnavailable(format!(
                    "asked for {} vectors, got {}",
                    missing.len(),
                    embedded.len()
                )));
            }
            let mut cached = self.vectors.write().unwrap_or_else(PoisonError::into_inner);
            for (text, vector) in missing.iter().zip(embedded) {
                cached.entry(text.clone()).or_insert_with(|| Arc::from(vector));
            }
            debug!(embedded = missing.len(), cached = cached.len(), "embedded new texts");
        }

        let cached = self.read();
        texts
            .iter()
            .map(|t| {
                cached
                    .get(t.as_str())
                    .cloned()
                    .ok_or_else(|| AiError::EmbeddingUnavailable(format!("no vector for {t:?}")))
            })
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<[f32]>>> {
        self.vectors.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cosine similarity; `0.0` for mismatched lengths or zero vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_finite() { sim } else { 0.0 }
}
