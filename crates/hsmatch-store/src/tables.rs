//! On-disk reference tables.
//!
//! Each table is a JSON object keyed by the parent code. List elements are
//! single-key objects (`{"8471": "label"}`), so list order is preserved and
//! the code sits next to its label.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use hsmatch_core::Hs10Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

pub const HEADINGS_FILE: &str = "headings.json";
pub const LEAVES_FILE: &str = "hs10.json";
pub const ISIC_FILE: &str = "isic.json";

/// A 4-digit heading under a 2-digit chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub label: String,
    pub code: String,
}

impl Heading {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// Labels attached to one 10-digit code in `hs10.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeafLabels {
    #[serde(rename = "HS_2_kor")]
    chapter: String,
    #[serde(rename = "HS_4_kor")]
    heading: String,
    #[serde(rename = "HS_10_kor")]
    leaf: String,
}

type HeadingsFile = HashMap<String, Vec<BTreeMap<String, String>>>;
type LeavesFile = BTreeMap<String, Vec<BTreeMap<String, LeafLabels>>>;

/// Headings per chapter and cached tariff lines per heading.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub headings: HashMap<String, Vec<Heading>>,
    pub leaves: BTreeMap<String, Vec<Hs10Entry>>,
}

impl ReferenceTables {
    pub fn from_parts(
        headings: HashMap<String, Vec<Heading>>,
        leaves: BTreeMap<String, Vec<Hs10Entry>>,
    ) -> Self {
        Self { headings, leaves }
    }

    /// Load `headings.json` and `hs10.json` from `dir`. Missing files give
    /// empty tables; malformed files are an error.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let headings = match read_optional(&dir.join(HEADINGS_FILE))? {
            Some(text) => decode_headings(&text)?,
            None => HashMap::new(),
        };
        let leaves = match read_optional(&dir.join(LEAVES_FILE))? {
            Some(text) => decode_leaves(&text)?,
            None => BTreeMap::new(),
        };
        debug!(
            chapters = headings.len(),
            cached_headings = leaves.len(),
            "loaded reference tables"
        );
        Ok(Self { headings, leaves })
    }
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "reference file absent, starting empty");
            Ok(None)
        }
        Err(source) => Err(StoreError::Io {
            path: PathBuf::from(path),
            source,
        }),
    }
}

pub(crate) fn decode_headings(text: &str) -> Result<HashMap<String, Vec<Heading>>, StoreError> {
    let raw: HeadingsFile = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|(chapter, items)| {
            let headings = items
                .into_iter()
                .flat_map(|item| item.into_iter().map(|(code, label)| Heading { label, code }))
                .collect();
            (chapter, headings)
        })
        .collect())
}

pub(crate) fn decode_leaves(text: &str) -> Result<BTreeMap<String, Vec<Hs10Entry>>, StoreError> {
    let raw: LeavesFile = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|(heading, items)| {
            let entries = items
                .into_iter()
                .flat_map(|item| {
                    item.into_iter().map(|(code, labels)| Hs10Entry {
                        code,
                        chapter_label: labels.chapter,
                        heading_label: labels.heading,
                        label: labels.leaf,
                    })
                })
                .collect();
            (heading, entries)
        })
        .collect())
}

pub(crate) fn encode_leaves(
    leaves: &BTreeMap<String, Vec<Hs10Entry>>,
) -> Result<String, StoreError> {
    let raw: LeavesFile = leaves
        .iter()
        .map(|(heading, entries)| {
            let items = entries
                .iter()
                .map(|e| {
                    BTreeMap::from([(
                        e.code.clone(),
                        LeafLabels {
                            chapter: e.chapter_label.clone(),
                            heading: e.heading_label.clone(),
                            leaf: e.label.clone(),
                        },
                    )])
                })
                .collect();
            (heading.clone(), items)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, label: &str) -> Hs10Entry {
        Hs10Entry {
            code: code.into(),
            chapter_label: "원자로ㆍ보일러ㆍ기계류".into(),
            heading_label: "자동자료처리기계".into(),
            label: label.into(),
        }
    }

    #[test]
    fn headings_keep_file_order() {
        let json = r#"{"84": [{"8471": "Computers"}, {"8414": "Pumps and fans"}]}"#;
        let headings = decode_headings(json).unwrap();
        assert_eq!(
            headings["84"],
            vec![Heading::new("Computers", "8471"), Heading::new("Pumps and fans", "8414")]
        );
    }

    #[test]
    fn leaves_decode_labels() {
        let json = r#"{"8471": [{"8471300000": {
            "HS_2_kor": "ch", "HS_4_kor": "hd", "HS_10_kor": "portable"
        }}]}"#;
        let leaves = decode_leaves(json).unwrap();
        let e = &leaves["8471"][0];
        assert_eq!(e.code, "8471300000");
        assert_eq!(e.chapter_label, "ch");
        assert_eq!(e.heading_label, "hd");
        assert_eq!(e.label, "portable");
    }

    #[test]
    fn leaves_survive_encode_and_decode() {
        let leaves = BTreeMap::from([(
            "8471".to_string(),
            vec![entry("8471300000", "휴대용"), entry("8471490000", "기타")],
        )]);
        let text = encode_leaves(&leaves).unwrap();
        assert_eq!(decode_leaves(&text).unwrap(), leaves);
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tables = ReferenceTables::load(dir.path()).unwrap();
        assert!(tables.headings.is_empty());
        assert!(tables.leaves.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HEADINGS_FILE), "[not an object").unwrap();
        let err = ReferenceTables::load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
