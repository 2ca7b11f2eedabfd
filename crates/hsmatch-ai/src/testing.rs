//! In-crate fakes for the network capabilities and the leaf source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hsmatch_core::{Hs10Entry, LevelChoice, taxonomy};
use hsmatch_store::{Heading, LeafSource, ReferenceTables, StoreError, TaxonomyStore};

use crate::AiError;
use crate::capability::{CategoryClassifier, Embedder, ItemExtractor};

// ── Embedder ──

/// Texts registered with [`with`](FakeEmbedder::with) get their vector; every
/// other text maps to `[0, 1]`.
pub struct FakeEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    fail: bool,
    calls: AtomicUsize,
    embedded: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            vectors: Mutex::new(HashMap::new()),
            fail: false,
            calls: AtomicUsize::new(0),
            embedded: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            vectors: Mutex::new(HashMap::new()),
            fail: true,
            calls: AtomicUsize::new(0),
            embedded: AtomicUsize::new(0),
        })
    }

    pub fn with(self: Arc<Self>, text: &str, vector: &[f32]) -> Arc<Self> {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector.to_vec());
        self
    }

    /// Give every text in `texts` the vector `[1, 0]`, so they rank as a
    /// perfect match for each other and as unrelated to everything else.
    pub fn aligned(self: Arc<Self>, texts: &[&str]) -> Arc<Self> {
        texts.iter().fold(self, |e, t| e.with(t, &[1.0, 0.0]))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embedded_texts(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AiError::EmbeddingUnavailable("embedder offline".into()));
        }
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        let vectors = self.vectors.lock().unwrap();
        Ok(texts
            .iter()
            .map(|t| vectors.get(t).cloned().unwrap_or_else(|| vec![0.0, 1.0]))
            .collect())
    }
}

// ── Classifier ──

/// Picks the first candidate found in its preferred list, and fails when
/// none is there.
pub struct FakeClassifier {
    preferred: Vec<String>,
    off_list: bool,
    /// Reported as-is, without rounding.
    confidence: f32,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn preferring(labels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            preferred: labels.iter().map(|s| s.to_string()).collect(),
            off_list: false,
            confidence: 0.9,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Like [`preferring`](Self::preferring), but reports `confidence`
    /// unrounded.
    pub fn raw_confidence(labels: &[&str], confidence: f32) -> Arc<Self> {
        Arc::new(Self {
            preferred: labels.iter().map(|s| s.to_string()).collect(),
            off_list: false,
            confidence,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Always answers with a label that is not a candidate.
    pub fn off_list() -> Arc<Self> {
        Arc::new(Self {
            preferred: Vec::new(),
            off_list: true,
            confidence: 0.9,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Like [`preferring`](Self::preferring), but sleeps before answering
    /// whenever the text is [`SLOW_ITEM`].
    pub fn slow_on(labels: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            preferred: labels.iter().map(|s| s.to_string()).collect(),
            off_list: false,
            confidence: 0.9,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub const SLOW_ITEM: &str = "slow item";

#[async_trait]
impl CategoryClassifier for FakeClassifier {
    async fn classify(&self, text: &str, candidates: &[String]) -> Result<LevelChoice, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() && text == SLOW_ITEM {
            tokio::time::sleep(self.delay).await;
        }
        if self.off_list {
            return Ok(LevelChoice::new("not a candidate", 0.9));
        }
        let label = candidates
            .iter()
            .find(|c| self.preferred.contains(c))
            .ok_or_else(|| {
                AiError::ClassificationUnavailable(format!("no preferred label for {text:?}"))
            })?;
        Ok(LevelChoice {
            label: label.clone(),
            confidence: self.confidence,
        })
    }
}

// ── Extractor ──

pub struct FakeExtractor {
    items: Result<Vec<String>, String>,
}

impl FakeExtractor {
    pub fn items(items: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            items: Ok(items.iter().map(|s| s.to_string()).collect()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            items: Err("extractor offline".into()),
        })
    }
}

#[async_trait]
impl ItemExtractor for FakeExtractor {
    async fn extract_items(&self, _description: &str) -> Result<Vec<String>, AiError> {
        self.items.clone().map_err(AiError::ExtractionUnavailable)
    }
}

// ── Reference data ──

pub struct FakeLeaves {
    lines: HashMap<String, Vec<Hs10Entry>>,
    calls: AtomicUsize,
}

impl FakeLeaves {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeafSource for FakeLeaves {
    async fn fetch_leaves(&self, four_digit: &str) -> Result<Vec<Hs10Entry>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lines.get(four_digit).cloned().unwrap_or_default())
    }
}

pub const MACHINERY_HEADING: &str = "Automatic data processing machines and units thereof";
pub const PUMP_HEADING: &str = "Pumps for liquids";
pub const PHONE_HEADING: &str = "Telephone sets";
pub const MOUSE_LINE: &str = "Input units: mouse";
pub const LAPTOP_LINE: &str = "Portable automatic data processing machines";
pub const HANDSET_LINE: &str = "Smartphones";

pub fn machinery_section() -> &'static str {
    taxonomy::section_candidates()[11]
}

pub fn chapter(two_digit: &str) -> &'static str {
    taxonomy::chapter_label(two_digit).unwrap_or_default()
}

fn line(code: &str, label: &str) -> Hs10Entry {
    Hs10Entry {
        code: code.to_string(),
        chapter_label: "machinery".to_string(),
        heading_label: "heading".to_string(),
        label: label.to_string(),
    }
}

/// A small reference world: headings for chapters 84 and 85 and tariff lines
/// for 8471 and 8517, where two mouse codes share one label.
pub fn reference_store() -> (Arc<TaxonomyStore>, Arc<FakeLeaves>) {
    let headings = HashMap::from([
        (
            "84".to_string(),
            vec![
                Heading::new(PUMP_HEADING, "8413"),
                Heading::new(MACHINERY_HEADING, "8471"),
            ],
        ),
        ("85".to_string(), vec![Heading::new(PHONE_HEADING, "8517")]),
    ]);
    let leaves = Arc::new(FakeLeaves {
        lines: HashMap::from([
            (
                "8471".to_string(),
                vec![
                    line("8471300000", LAPTOP_LINE),
                    line("8471607000", MOUSE_LINE),
                    line("8471609000", MOUSE_LINE),
                ],
            ),
            ("8517".to_string(), vec![line("8517130000", HANDSET_LINE)]),
        ]),
        calls: AtomicUsize::new(0),
    });
    let tables = ReferenceTables::from_parts(headings, Default::default());
    let store = Arc::new(TaxonomyStore::in_memory(tables, leaves.clone()));
    (store, leaves)
}

/// Every label on the path from the machinery section to the mouse lines.
pub fn mouse_path() -> Vec<&'static str> {
    vec![machinery_section(), chapter("84"), MACHINERY_HEADING, MOUSE_LINE]
}

pub const MOUSE_ITEM: &str = "wireless mouse";

/// An embedder under which [`MOUSE_ITEM`] matches every label on [`mouse_path`].
pub fn mouse_embedder() -> Arc<FakeEmbedder> {
    let mut texts = mouse_path();
    texts.push(MOUSE_ITEM);
    FakeEmbedder::new().aligned(&texts)
}
