//! Bounded memo in front of a category classifier.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use hsmatch_core::LevelChoice;
use tracing::trace;

use crate::AiError;
use crate::capability::CategoryClassifier;

pub const DEFAULT_MEMO_CAPACITY: usize = 16_384;

type Key = (String, Vec<String>);

#[derive(Default)]
struct Memo {
    answers: HashMap<Key, LevelChoice>,
    order: VecDeque<Key>,
}

/// Remembers answers by `(text, candidates)` and evicts the oldest entry
/// once `capacity` is reached. Errors pass through and are not remembered.
pub struct MemoClassifier {
    inner: Arc<dyn CategoryClassifier>,
    capacity: usize,
    memo: Mutex<Memo>,
}

impl MemoClassifier {
    pub fn new(inner: Arc<dyn CategoryClassifier>, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Memo> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CategoryClassifier for MemoClassifier {
    async fn classify(&self, text: &str, candidates: &[String]) -> Result<LevelChoice, AiError> {
        let key: Key = (text.to_string(), candidates.to_vec());
        let cached = self.lock().answers.get(&key).cloned();
        if let Some(hit) = cached {
            trace!(text, "classification memo hit");
            return Ok(hit);
        }

        let choice = self.inner.classify(text, candidates).await?;

        let mut memo = self.lock();
        if !memo.answers.contains_key(&key) {
            while memo.order.len() >= self.capacity {
                if let Some(oldest) = memo.order.pop_front() {
                    memo.answers.remove(&oldest);
                }
            }
            memo.order.push_back(key.clone());
        }
        memo.answers.insert(key, choice.clone());
        Ok(choice)
    }
}
