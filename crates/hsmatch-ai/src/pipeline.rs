//! Batch orchestration: extract items, classify them, resolve a final set.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use hsmatch_core::{IsicConstraint, ItemClassification, ItemStatus, StopRule, resolve};
use hsmatch_store::IsicTable;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AiError;
use crate::capability::ItemExtractor;
use crate::dual::DualClassifier;

/// Knobs for a batch run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items classified at the same time.
    pub concurrency: usize,
    /// Deadline per item; `None` waits indefinitely.
    pub item_timeout: Option<Duration>,
    pub stop_rule: StopRule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            item_timeout: None,
            stop_rule: StopRule::default(),
        }
    }
}

/// Everything one batch produced, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub description: String,
    /// Empty when the batch ran without an ISIC code.
    pub constraint: IsicConstraint,
    pub items: Vec<ItemClassification>,
    pub final_codes: Vec<String>,
    pub requested_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn timed_out(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::TimedOut)
            .count()
    }
}

pub struct BatchOrchestrator {
    extractor: Arc<dyn ItemExtractor>,
    classifier: DualClassifier,
    isic: Arc<IsicTable>,
    config: EngineConfig,
}

impl BatchOrchestrator {
    pub fn new(
        extractor: Arc<dyn ItemExtractor>,
        classifier: DualClassifier,
        isic: Arc<IsicTable>,
        config: EngineConfig,
    ) -> Self {
        Self {
            extractor,
            classifier,
            isic,
            config,
        }
    }

    /// Classify every item offered by `description` and resolve the final
    /// 10-digit code set.
    ///
    /// A blank `isic_code` resolves without the ISIC passes. Extraction and
    /// embedding failures fail the batch; LLM failures and item timeouts do not.
    pub async fn run_batch(
        &self,
        description: &str,
        isic_code: &str,
    ) -> Result<BatchReport, AiError> {
        let requested_at = Utc::now();
        let isic_code = isic_code.trim();
        let constraint = (!isic_code.is_empty()).then(|| self.isic.constraint(isic_code));

        let items = self.extractor.extract_items(description).await?;
        info!(items = items.len(), isic = isic_code, "extracted items");

        let classified: Vec<ItemClassification> = if items.is_empty() {
            Vec::new()
        } else {
            stream::iter(items)
                .map(|item| self.classify_item(item))
                .buffered(self.config.concurrency.max(1))
                .try_collect()
                .await?
        };

        let final_codes = resolve(&classified, constraint.as_ref(), self.config.stop_rule);
        let report = BatchReport {
            description: description.to_string(),
            constraint: constraint.unwrap_or_default(),
            items: classified,
            final_codes,
            requested_at,
        };
        info!(
            items = report.items.len(),
            timed_out = report.timed_out(),
            final_codes = report.final_codes.len(),
            "batch resolved"
        );
        Ok(report)
    }

    async fn classify_item(&self, item: String) -> Result<ItemClassification, AiError> {
        let Some(limit) = self.config.item_timeout else {
            return self.classifier.classify(&item).await;
        };
        match tokio::time::timeout(limit, self.classifier.classify(&item)).await {
            Ok(result) => result,
            Err(_) => {
                let err = AiError::ClassificationTimeout {
                    item: item.clone(),
                    after: limit,
                };
                warn!(error = %err, "item dropped from consensus");
                Ok(ItemClassification::timed_out(item))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityCache;
    use crate::testing::*;
    use std::collections::HashMap;

    fn orchestrator(
        extractor: Arc<FakeExtractor>,
        embedder: Arc<FakeEmbedder>,
        llm: Arc<FakeClassifier>,
        config: EngineConfig,
    ) -> BatchOrchestrator {
        let (store, _) = reference_store();
        let similarity = Arc::new(SimilarityCache::new(embedder));
        let isic = Arc::new(IsicTable::new(HashMap::from([(
            "C2620".to_string(),
            vec!["8471607000".to_string(), "8471300000".to_string()],
        )])));
        BatchOrchestrator::new(
            extractor,
            DualClassifier::new(store, similarity, llm),
            isic,
            config,
        )
    }

    #[tokio::test]
    async fn wireless_mouse_agreement() {
        let engine = orchestrator(
            FakeExtractor::items(&[MOUSE_ITEM]),
            mouse_embedder(),
            FakeClassifier::preferring(&mouse_path()),
            EngineConfig::default(),
        );

        let report = engine.run_batch("We sell computer peripherals.", "").await.unwrap();

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].item, MOUSE_ITEM);
        assert_eq!(report.final_codes, vec!["8471607000", "8471609000"]);
        assert!(report.constraint.is_empty());
        assert_eq!(report.constraint.code, "");
    }

    #[tokio::test]
    async fn isic_constraint_narrows_codes() {
        let engine = orchestrator(
            FakeExtractor::items(&[MOUSE_ITEM]),
            mouse_embedder(),
            FakeClassifier::preferring(&mouse_path()),
            EngineConfig::default(),
        );

        let report = engine.run_batch("peripherals", "C2620").await.unwrap();

        assert_eq!(report.constraint.hs04, vec!["8471"]);
        // The first ISIC pass keeps LLM codes whose heading is in the ISIC
        // set and that the embedding path also chose.
        assert_eq!(report.final_codes, vec!["8471607000", "8471609000"]);
    }

    #[tokio::test]
    async fn unknown_isic_still_resolves() {
        let engine = orchestrator(
            FakeExtractor::items(&[MOUSE_ITEM]),
            mouse_embedder(),
            FakeClassifier::preferring(&mouse_path()),
            EngineConfig::default(),
        );

        let report = engine.run_batch("peripherals", "Z9999").await.unwrap();

        assert_eq!(report.constraint.code, "Z9999");
        assert!(report.constraint.is_empty());
        assert_eq!(report.final_codes, vec!["8471607000", "8471609000"]);
    }

    #[tokio::test]
    async fn zero_items_is_an_empty_report() {
        let embedder = FakeEmbedder::new();
        let llm = FakeClassifier::preferring(&[]);
        let engine = orchestrator(
            FakeExtractor::items(&[]),
            embedder.clone(),
            llm.clone(),
            EngineConfig::default(),
        );

        let report = engine.run_batch("We are a holding company.", "").await.unwrap();

        assert!(report.items.is_empty());
        assert!(report.final_codes.is_empty());
        assert_eq!(embedder.calls(), 0);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_fails_batch() {
        let engine = orchestrator(
            FakeExtractor::failing(),
            FakeEmbedder::new(),
            FakeClassifier::preferring(&[]),
            EngineConfig::default(),
        );
        let err = engine.run_batch("anything", "").await.unwrap_err();
        assert!(matches!(err, AiError::ExtractionUnavailable(_)));
    }

    #[tokio::test]
    async fn embedding_failure_fails_batch() {
        let engine = orchestrator(
            FakeExtractor::items(&[MOUSE_ITEM, "keyboard"]),
            FakeEmbedder::failing(),
            FakeClassifier::preferring(&mouse_path()),
            EngineConfig::default(),
        );
        let err = engine.run_batch("peripherals", "").await.unwrap_err();
        assert!(matches!(err, AiError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn items_keep_extraction_order() {
        let items = ["a", "b", "c", "d", "e", "f"];
        let engine = orchestrator(
            FakeExtractor::items(&items),
            FakeEmbedder::new(),
            FakeClassifier::preferring(&[]),
            EngineConfig {
                concurrency: 3,
                ..EngineConfig::default()
            },
        );
        let report = engine.run_batch("letters", "").await.unwrap();
        let order: Vec<_> = report.items.iter().map(|i| i.item.as_str()).collect();
        assert_eq!(order, items);
    }

    #[tokio::test]
    async fn slow_item_times_out_without_aborting_siblings() {
        let engine = orchestrator(
            FakeExtractor::items(&[SLOW_ITEM, MOUSE_ITEM]),
            mouse_embedder(),
            FakeClassifier::slow_on(&mouse_path(), Duration::from_secs(5)),
            EngineConfig {
                item_timeout: Some(Duration::from_millis(100)),
                ..EngineConfig::default()
            },
        );

        let report = engine.run_batch("peripherals", "").await.unwrap();

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].item, SLOW_ITEM);
        assert_eq!(report.items[0].status, ItemStatus::TimedOut);
        assert!(!report.items[0].has_candidates());
        assert_eq!(report.items[1].status, ItemStatus::Classified);
        assert_eq!(report.timed_out(), 1);
        assert_eq!(report.final_codes, vec!["8471607000", "8471609000"]);
    }

    #[tokio::test]
    async fn report_serializes_for_audit() {
        let engine = orchestrator(
            FakeExtractor::items(&[MOUSE_ITEM]),
            mouse_embedder(),
            FakeClassifier::preferring(&mouse_path()),
            EngineConfig::default(),
        );
        let report = engine.run_batch("peripherals", "C2620").await.unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["embedding"]["kind"], "Emb");
        assert_eq!(json["items"][0]["status"], "classified");
        assert_eq!(json["constraint"]["code"], "C2620");

        let back: BatchReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.final_codes, report.final_codes);
    }
}
