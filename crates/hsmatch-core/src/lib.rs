pub mod codes;
pub mod consensus;
pub mod taxonomy;
pub mod types;

pub use codes::{four_digit, round_confidence, two_digit};
pub use consensus::{StopRule, resolve};
pub use taxonomy::{chapter_label, chapters_of, code_to_two_digit, section_candidates};
pub use types::{
    Hs10Entry, IsicConstraint, ItemClassification, ItemStatus, LevelChoice, PathKind, PathResult,
};
