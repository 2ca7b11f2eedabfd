//! Two independent walks down the HS taxonomy for one item.
//!
//! Each path picks a section, then a chapter within that section, a heading
//! within that chapter, and finally a tariff line label within that heading.
//! The embedding path ranks candidates by similarity; the LLM path asks the
//! classifier. The paths never see each other's choices.

use std::collections::HashSet;
use std::sync::Arc;

use hsmatch_core::{ItemClassification, ItemStatus, LevelChoice, PathKind, PathResult};
use hsmatch_store::TaxonomyStore;
use tracing::{debug, warn};

use crate::AiError;
use crate::capability::CategoryClassifier;
use crate::similarity::SimilarityCache;

#[derive(Debug, Clone, Copy)]
enum Level {
    Section,
    Chapter,
    Heading,
    Leaf,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::Chapter => "chapter",
            Self::Heading => "heading",
            Self::Leaf => "leaf",
        }
    }
}

pub struct DualClassifier {
    store: Arc<TaxonomyStore>,
    similarity: Arc<SimilarityCache>,
    classifier: Arc<dyn CategoryClassifier>,
}

impl DualClassifier {
    pub fn new(
        store: Arc<TaxonomyStore>,
        similarity: Arc<SimilarityCache>,
        classifier: Arc<dyn CategoryClassifier>,
    ) -> Self {
        Self {
            store,
            similarity,
            classifier,
        }
    }

    /// Run both paths for `item` concurrently.
    ///
    /// LLM failures degrade single levels; embedding failures abort the item.
    pub async fn classify(&self, item: &str) -> Result<ItemClassification, AiError> {
        let (embedding, llm) = tokio::join!(
            self.walk(PathKind::Embedding, item),
            self.walk(PathKind::Llm, item)
        );
        Ok(ItemClassification {
            item: item.to_string(),
            embedding: embedding?,
            llm: llm?,
            status: ItemStatus::Classified,
        })
    }

    async fn walk(&self, kind: PathKind, item: &str) -> Result<PathResult, AiError> {
        let mut path = PathResult::empty(kind);

        let sections = owned(self.store.section_candidates().iter().copied());
        path.section = self.choose(kind, Level::Section, item, &sections).await?;

        let chapters = owned(self.store.chapters_of(&path.section.label));
        path.chapter = self.choose(kind, Level::Chapter, item, &chapters).await?;
        path.hs02 = self.store.code_to_two_digit(&path.chapter.label);

        let headings = owned(self.store.headings_of(&path.hs02).iter().map(|h| h.label.as_str()));
        path.heading = self.choose(kind, Level::Heading, item, &headings).await?;
        path.hs04 = if path.heading.is_empty() {
            None
        } else {
            self.store
                .heading_label_to_four_digit(&path.hs02, &path.heading.label)
        };

        let lines = match &path.hs04 {
            Some(code) => self.store.hs10_leaves_of(code).await,
            None => Vec::new(),
        };
        let mut seen = HashSet::new();
        let leaf_labels = owned(
            lines
                .iter()
                .map(|e| e.label.as_str())
                .filter(|label| seen.insert(*label)),
        );
        path.leaf = self.choose(kind, Level::Leaf, item, &leaf_labels).await?;
        if !path.leaf.is_empty() {
            path.hs10 = lines
                .iter()
                .filter(|e| e.label == path.leaf.label)
                .map(|e| e.code.clone())
                .collect();
        }

        debug!(
            item,
            path = kind.as_str(),
            hs02 = %path.hs02,
            hs04 = ?path.hs04,
            codes = path.hs10.len(),
            "path complete"
        );
        Ok(path)
    }

    /// One level's choice. An empty candidate list skips the call and yields
    /// the empty choice, as does any LLM failure.
    async fn choose(
        &self,
        kind: PathKind,
        level: Level,
        item: &str,
        candidates: &[String],
    ) -> Result<LevelChoice, AiError> {
        if candidates.is_empty() {
            debug!(item, path = kind.as_str(), level = level.as_str(), "no candidates");
            return Ok(LevelChoice::empty());
        }

        let choice = match kind {
            PathKind::Embedding => self
                .similarity
                .rank(item, candidates, 1)
                .await?
                .into_iter()
                .next()
                .map(|(label, score)| LevelChoice::new(label, score))
                .unwrap_or_default(),
            PathKind::Llm => match self.classifier.classify(item, candidates).await {
                Ok(choice) if candidates.contains(&choice.label) => {
                    LevelChoice::new(choice.label, choice.confidence)
                }
                Ok(choice) => {
                    warn!(
                        item,
                        level = level.as_str(),
                        label = %choice.label,
                        "classifier answered outside the candidates"
                    );
                    LevelChoice::empty()
                }
                Err(e) => {
                    warn!(
                        item,
                        level = level.as_str(),
                        error = %e,
                        "LLM level failed, continuing empty"
                    );
                    LevelChoice::empty()
                }
            },
        };

        debug!(
            item,
            path = kind.as_str(),
            level = level.as_str(),
            label = %choice.label,
            confidence = choice.confidence,
            "level chosen"
        );
        Ok(choice)
    }
}

fn owned<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    labels.into_iter().map(str::to_string).collect()
}
