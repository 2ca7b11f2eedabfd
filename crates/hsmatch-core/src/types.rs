//! Shared classification types passed between the store, the classifier, and
//! the consensus resolver.

use serde::{Deserialize, Serialize};

use crate::codes;
use crate::taxonomy::UNKNOWN_CHAPTER;

/// Which of the two independent strategies produced a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    /// Cosine similarity between item and label embeddings.
    #[serde(rename = "Emb")]
    Embedding,
    /// LLM judgment restricted to a candidate list.
    #[serde(rename = "LLM")]
    Llm,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "Emb",
            Self::Llm => "LLM",
        }
    }
}

/// A label chosen at one taxonomy level, with its confidence.
///
/// An empty label with confidence `0.0` marks a degraded level: the level
/// had no candidates, or the classifier failed for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelChoice {
    pub label: String,
    pub confidence: f32,
}

impl LevelChoice {
    /// Build a choice, rounding the confidence to 3 decimals in `[0, 1]`.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: codes::round_confidence(confidence),
        }
    }

    /// The degraded choice: no label, zero confidence.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }
}

/// One path's walk down the four taxonomy levels for a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub kind: PathKind,
    pub section: LevelChoice,
    pub chapter: LevelChoice,
    /// 2-digit chapter code; `"00"` when the chapter label is unmapped.
    pub hs02: String,
    pub heading: LevelChoice,
    /// 4-digit heading code, `None` when the heading label did not resolve.
    pub hs04: Option<String>,
    pub leaf: LevelChoice,
    /// Every 10-digit code whose display label equals `leaf.label`.
    pub hs10: Vec<String>,
}

impl PathResult {
    /// A path with nothing chosen at any level.
    pub fn empty(kind: PathKind) -> Self {
        Self {
            kind,
            section: LevelChoice::empty(),
            chapter: LevelChoice::empty(),
            hs02: UNKNOWN_CHAPTER.to_string(),
            heading: LevelChoice::empty(),
            hs04: None,
            leaf: LevelChoice::empty(),
            hs10: Vec::new(),
        }
    }
}

/// Whether an item made it through classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Classified,
    /// The per-item deadline expired; both paths are empty.
    TimedOut,
}

/// Both classification paths for one extracted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemClassification {
    pub item: String,
    pub embedding: PathResult,
    pub llm: PathResult,
    pub status: ItemStatus,
}

impl ItemClassification {
    /// Placeholder for an item whose classification did not finish in time.
    pub fn timed_out(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            embedding: PathResult::empty(PathKind::Embedding),
            llm: PathResult::empty(PathKind::Llm),
            status: ItemStatus::TimedOut,
        }
    }

    /// Whether either path produced at least one 10-digit candidate.
    pub fn has_candidates(&self) -> bool {
        !self.embedding.hs10.is_empty() || !self.llm.hs10.is_empty()
    }
}

/// One 10-digit tariff line under a 4-digit heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hs10Entry {
    pub code: String,
    /// Display text of the 2-digit chapter.
    pub chapter_label: String,
    /// Display text of the 4-digit heading.
    pub heading_label: String,
    /// Display text of the 10-digit line. Several codes may share it.
    pub label: String,
}

/// HS prefixes implied by an ISIC industry code.
///
/// Used only as a tie-break signal in consensus. An unknown ISIC code gives
/// an empty constraint, which filters nothing in but is still "present".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsicConstraint {
    pub code: String,
    /// Sorted, deduplicated 10-digit codes.
    pub total: Vec<String>,
    /// Sorted, deduplicated 2-digit prefixes of `total`.
    pub hs02: Vec<String>,
    /// Sorted, deduplicated 4-digit prefixes of `total`.
    pub hs04: Vec<String>,
}

impl IsicConstraint {
    /// Derive the prefix sets from a list of 10-digit codes.
    pub fn from_codes(code: impl Into<String>, codes: &[String]) -> Self {
        let mut total: Vec<String> = codes.to_vec();
        total.sort();
        total.dedup();

        let mut hs02: Vec<String> = total
            .iter()
            .filter_map(|c| codes::two_digit(c))
            .map(str::to_string)
            .collect();
        hs02.dedup();

        let mut hs04: Vec<String> = total
            .iter()
            .filter_map(|c| codes::four_digit(c))
            .map(str::to_string)
            .collect();
        hs04.dedup();

        Self {
            code: code.into(),
            total,
            hs02,
            hs04,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}
