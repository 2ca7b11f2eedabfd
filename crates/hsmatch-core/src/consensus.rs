//! Consensus resolution across per-item classification paths.
//!
//! Only LLM-path 10-digit candidates can enter the result. The embedding path
//! and the optional ISIC constraint decide *which* of them enter, through a
//! cascade of agreement conditions that loosen pass by pass:
//!
//! | pass | with ISIC constraint                           | without constraint          |
//! |------|------------------------------------------------|-----------------------------|
//! | 1    | hs04 ∈ ISIC hs04 and code ∈ Emb HS10 list      | code ∈ Emb HS10 list        |
//! | 2    | hs04 ∈ ISIC hs04 and hs04 = Emb HS04           | hs04 = Emb HS04             |
//! | 3    | hs02 ∈ ISIC hs02                               | hs02 = Emb HS02             |
//! | 4    | hs04 = Emb HS04                                | unconditional               |
//! | 5    | unconditional                                  | (none)                      |
//!
//! Codes accumulate across passes into one set. After each pass the
//! [`StopRule`] decides whether enough codes were found.

use std::collections::BTreeSet;

use tracing::debug;

use crate::codes::{four_digit, two_digit};
use crate::types::{IsicConstraint, ItemClassification};

/// When the cascade may stop before its final unconditional pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopRule {
    /// Stop once the number of distinct codes reaches the number of items.
    ///
    /// A batch can meet this while some items contribute nothing, if other
    /// items contribute several codes.
    #[default]
    CodeCount,
    /// Stop once every item with at least one LLM-path candidate has
    /// contributed a code.
    EveryItem,
}

/// Agreement condition applied to one LLM-path candidate of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    IsicHeadingAndEmbCode,
    IsicHeadingAndEmbHeading,
    IsicChapter,
    EmbCode,
    EmbHeading,
    EmbChapter,
    Always,
}

const CONSTRAINED: [Condition; 5] = [
    Condition::IsicHeadingAndEmbCode,
    Condition::IsicHeadingAndEmbHeading,
    Condition::IsicChapter,
    Condition::EmbHeading,
    Condition::Always,
];

const UNCONSTRAINED: [Condition; 4] = [
    Condition::EmbCode,
    Condition::EmbHeading,
    Condition::EmbChapter,
    Condition::Always,
];

impl Condition {
    fn holds(self, code: &str, item: &ItemClassification, isic: &IsicConstraint) -> bool {
        let emb = &item.embedding;
        let in_isic_hs04 = || four_digit(code).is_some_and(|p| isic.hs04.iter().any(|h| h == p));
        let emb_heading = || four_digit(code).is_some_and(|p| emb.hs04.as_deref() == Some(p));

        match self {
            Self::IsicHeadingAndEmbCode => in_isic_hs04() && emb.hs10.iter().any(|c| c == code),
            Self::IsicHeadingAndEmbHeading => in_isic_hs04() && emb_heading(),
            Self::IsicChapter => two_digit(code).is_some_and(|p| isic.hs02.iter().any(|h| h == p)),
            Self::EmbCode => emb.hs10.iter().any(|c| c == code),
            Self::EmbHeading => emb_heading(),
            Self::EmbChapter => two_digit(code) == Some(emb.hs02.as_str()),
            Self::Always => true,
        }
    }
}

/// Reconcile a batch of item classifications into one set of 10-digit codes.
///
/// `constraint` selects the cascade: `Some` (even if empty) uses the
/// five-pass ISIC cascade, `None` the four-pass one. The result is sorted and
/// always a subset of the union of the items' LLM-path candidates.
pub fn resolve(
    items: &[ItemClassification],
    constraint: Option<&IsicConstraint>,
    rule: StopRule,
) -> Vec<String> {
    let empty = IsicConstraint::default();
    let (isic, passes): (&IsicConstraint, &[Condition]) = match constraint {
        Some(c) => (c, &CONSTRAINED[..]),
        None => (&empty, &UNCONSTRAINED[..]),
    };

    let mut found: BTreeSet<String> = BTreeSet::new();
    let mut contributed = vec![false; items.len()];

    for (pass, condition) in passes.iter().enumerate() {
        for (idx, item) in items.iter().enumerate() {
            for code in &item.llm.hs10 {
                if condition.holds(code, item, isic) {
                    found.insert(code.clone());
                    contributed[idx] = true;
                }
            }
        }

        debug!(pass = pass + 1, ?condition, codes = found.len(), "consensus pass");
        if stop(rule, items, &found, &contributed) {
            break;
        }
    }

    found.into_iter().collect()
}

fn stop(
    rule: StopRule,
    items: &[ItemClassification],
    found: &BTreeSet<String>,
    contributed: &[bool],
) -> bool {
    match rule {
        StopRule::CodeCount => found.len() >= items.len(),
        StopRule::EveryItem => items
            .iter()
            .zip(contributed)
            .all(|(item, done)| *done || item.llm.hs10.is_empty()),
    }
}
