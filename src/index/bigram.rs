//! 2-gram inverted index: 2-byte key -> posting list of word ids.
//!
//! Gram overlap is necessary but not sufficient for a substring match, so the
//! evaluator re-verifies every candidate against the actual word. Deleted ids
//! linger in the postings until `purge` runs; the evaluator re-filters through
//! the dictionary's deletion flag.

use crate::index::bitset::IdBitSet;
use crate::index::types::{word_grams, Gram, WordId};
use ahash::AHashMap;

#[derive(Debug, Default)]
pub struct BigramIndex {
    postings: AHashMap<Gram, IdBitSet>,
}

impl BigramIndex {
    pub fn new() -> Self {
        Self {
            postings: AHashMap::new(),
        }
    }

    pub fn gram_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Register every unique 2-gram of `word` under `id`.
    /// Words shorter than 2 bytes contribute nothing.
    pub fn register(&mut self, word: &str, id: WordId) {
        for gram in word_grams(word.as_bytes()) {
            self.postings.entry(gram).or_default().insert(id);
        }
    }

    pub fn lookup(&self, gram: Gram) -> Option<&IdBitSet> {
        self.postings.get(&gram)
    }

    /// Install a fully-built posting list (snapshot load path).
    pub fn insert_posting(&mut self, gram: Gram, ids: IdBitSet) {
        self.postings.insert(gram, ids);
    }

    /// Merge a worker-local gram map produced by the parallel build phase.
    pub fn absorb(&mut self, local: AHashMap<Gram, Vec<WordId>>) {
        for (gram, ids) in local {
            let posting = self.postings.entry(gram).or_default();
            for id in ids {
                posting.insert(id);
            }
        }
    }

    /// Drop ids rejected by `is_live`, then drop empty gram keys.
    pub fn purge<F: Fn(WordId) -> bool>(&mut self, is_live: F) {
        for posting in self.postings.values_mut() {
            let dead: Vec<WordId> = posting.iter().filter(|&id| !is_live(id)).collect();
            for id in dead {
                posting.remove(id);
            }
        }
        self.postings.retain(|_, posting| !posting.is_empty());
    }

    /// Iterate (gram, posting) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Gram, &IdBitSet)> {
        self.postings.iter().map(|(&g, p)| (g, p))
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }
}
