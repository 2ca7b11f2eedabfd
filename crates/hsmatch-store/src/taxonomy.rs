//! Taxonomy lookups for all four HS levels.
//!
//! Sections and chapters come from the fixed tables in `hsmatch-core`. Headings
//! are loaded once from `headings.json`. Tariff lines are cached per heading
//! and fetched from a [`LeafSource`] on a miss, then written back to
//! `hs10.json` so the next run starts warm.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use hsmatch_core::codes::is_heading_code;
use hsmatch_core::{Hs10Entry, taxonomy};
use tracing::{debug, info, warn};

use crate::StoreError;
use crate::tables::{self, Heading, ReferenceTables};

/// Where tariff lines come from when a heading is not cached.
#[async_trait]
pub trait LeafSource: Send + Sync {
    async fn fetch_leaves(&self, four_digit: &str) -> Result<Vec<Hs10Entry>, StoreError>;
}

/// Reference store for the HS hierarchy.
///
/// Safe to share across tasks. Concurrent misses for the same heading
/// trigger a single fetch; the others wait and read the cached result.
pub struct TaxonomyStore {
    headings: HashMap<String, Vec<Heading>>,
    leaves: RwLock<BTreeMap<String, Vec<Hs10Entry>>>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    persist_lock: tokio::sync::Mutex<()>,
    leaves_path: Option<PathBuf>,
    source: Arc<dyn LeafSource>,
}

impl TaxonomyStore {
    /// A store that never touches disk.
    pub fn in_memory(tables: ReferenceTables, source: Arc<dyn LeafSource>) -> Self {
        Self {
            headings: tables.headings,
            leaves: RwLock::new(tables.leaves),
            inflight: Mutex::new(HashMap::new()),
            persist_lock: tokio::sync::Mutex::new(()),
            leaves_path: None,
            source,
        }
    }

    /// Load the tables from `data_dir` and persist fetched leaves back there.
    pub fn open(data_dir: &Path, source: Arc<dyn LeafSource>) -> Result<Self, StoreError> {
        let tables = ReferenceTables::load(data_dir)?;
        info!(
            dir = %data_dir.display(),
            chapters = tables.headings.len(),
            cached_headings = tables.leaves.len(),
            "opened taxonomy store"
        );
        let mut store = Self::in_memory(tables, source);
        store.leaves_path = Some(data_dir.join(tables::LEAVES_FILE));
        Ok(store)
    }

    // ── Sections and chapters ──

    pub fn section_candidates(&self) -> &'static [&'static str] {
        taxonomy::section_candidates()
    }

    pub fn chapters_of(&self, section_label: &str) -> Vec<&'static str> {
        taxonomy::chapters_of(section_label)
    }

    pub fn code_to_two_digit(&self, chapter_label: &str) -> String {
        taxonomy::code_to_two_digit(chapter_label)
    }

    // ── Headings ──

    /// Headings under a chapter, empty for an unknown chapter.
    pub fn headings_of(&self, two_digit: &str) -> &[Heading] {
        self.headings
            .get(two_digit)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Like [`headings_of`](Self::headings_of), but an unknown chapter is an error.
    pub fn chapter_headings(&self, two_digit: &str) -> Result<&[Heading], StoreError> {
        self.headings
            .get(two_digit)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownTaxonomyKey(two_digit.to_string()))
    }

    /// Resolve a heading label under a chapter to its 4-digit code.
    pub fn heading_label_to_four_digit(&self, two_digit: &str, label: &str) -> Option<String> {
        self.headings_of(two_digit)
            .iter()
            .find(|h| h.label == label)
            .map(|h| h.code.clone())
    }

    // ── Tariff lines ──

    /// Tariff lines under a heading, fetching and caching them on a miss.
    ///
    /// Never fails: a fetch error or an invalid code yields an empty list.
    /// Failed fetches are not cached, so a later call retries.
    pub async fn hs10_leaves_of(&self, four_digit: &str) -> Vec<Hs10Entry> {
        if !is_heading_code(four_digit) {
            debug!(code = four_digit, "not a heading code, skipping leaf lookup");
            return Vec::new();
        }
        if let Some(hit) = self.cached(four_digit) {
            return hit;
        }

        let gate = self.gate(four_digit);
        let _held = gate.lock().await;

        // Another task may have filled the slot while we waited.
        if let Some(hit) = self.cached(four_digit) {
            return hit;
        }

        let result = match self.source.fetch_leaves(four_digit).await {
            Ok(fetched) => {
                let total = fetched.len();
                let entries: Vec<Hs10Entry> = fetched
                    .into_iter()
                    .filter(|e| e.code.starts_with(four_digit))
                    .collect();
                if entries.len() < total {
                    warn!(
                        code = four_digit,
                        dropped = total - entries.len(),
                        "source returned lines outside the heading"
                    );
                }
                info!(code = four_digit, lines = entries.len(), "cached tariff lines");
                self.write_leaves()
                    .insert(four_digit.to_string(), entries.clone());
                self.persist().await;
                entries
            }
            Err(e) => {
                warn!(code = four_digit, error = %e, "tariff line fetch failed");
                Vec::new()
            }
        };

        self.release(four_digit, &gate);
        result
    }

    /// Headings whose tariff lines are currently cached, in code order.
    pub fn cached_leaf_codes(&self) -> Vec<String> {
        self.read_leaves().keys().cloned().collect()
    }

    fn cached(&self, four_digit: &str) -> Option<Vec<Hs10Entry>> {
        self.read_leaves().get(four_digit).cloned()
    }

    /// Drop the gate for `four_digit` unless another task still holds or
    /// waits on it; waiters must keep serializing on the same gate.
    fn release(&self, four_digit: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map, one is ours.
        let last = Arc::strong_count(gate) == 2
            && inflight
                .get(four_digit)
                .is_some_and(|current| Arc::ptr_eq(current, gate));
        if last {
            inflight.remove(four_digit);
        }
    }

    fn gate(&self, four_digit: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight
            .entry(four_digit.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn read_leaves(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<Hs10Entry>>> {
        self.leaves.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_leaves(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<Hs10Entry>>> {
        self.leaves.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the whole leaf table back to disk. Failures are logged only.
    async fn persist(&self) {
        let Some(path) = &self.leaves_path else {
            return;
        };
        let _guard = self.persist_lock.lock().await;

        let snapshot = tables::encode_leaves(&self.read_leaves());
        let text = match snapshot {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "could not encode tariff line cache");
                return;
            }
        };

        let tmp = path.with_extension("json.tmp");
        let written = match tokio::fs::write(&tmp, text).await {
            Ok(()) => tokio::fs::rename(&tmp, path).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => debug!(path = %path.display(), "persisted tariff line cache"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not persist tariff line cache")
            }
        }
    }
}
