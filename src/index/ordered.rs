//! Ordered sets with stop-early prefix scans.
//!
//! Backed by `BTreeSet`s, so a prefix enumeration positions at the lower
//! bound in O(log n) and then walks only actual matches. [`OrderedStrIndex`]
//! holds surface words (interner handles); [`OrderedByteIndex`] holds raw
//! byte keys, which the suffix index needs because the byte-wise reversal of
//! a multi-byte word is not necessarily valid UTF-8.

use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct OrderedStrIndex {
    words: BTreeSet<Arc<str>>,
}

impl OrderedStrIndex {
    pub fn new() -> Self {
        Self {
            words: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn insert(&mut self, word: Arc<str>) -> bool {
        self.words.insert(word)
    }

    pub fn remove(&mut self, word: &str) -> bool {
        self.words.remove(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Iterate all entries in lexicographic (raw byte) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|w| w.as_ref())
    }

    /// Iterate entries starting with `prefix`, in order, stopping at the
    /// first entry that no longer shares the prefix.
    pub fn scan_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.words
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|w| w.as_ref())
            .take_while(move |w| w.as_bytes().starts_with(prefix.as_bytes()))
    }

    /// Merge another set in (used by the parallel build merge phase).
    pub fn absorb(&mut self, other: BTreeSet<Arc<str>>) {
        self.words.extend(other);
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

/// Ordered set of raw byte keys, same contract as [`OrderedStrIndex`].
#[derive(Debug, Default, Clone)]
pub struct OrderedByteIndex {
    keys: BTreeSet<Arc<[u8]>>,
}

impl OrderedByteIndex {
    pub fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn insert(&mut self, key: Arc<[u8]>) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.keys.contains(key)
    }

    /// Iterate all keys in byte-lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.keys.iter().map(|k| k.as_ref())
    }

    /// Iterate keys starting with `prefix`, in order, stopping at the first
    /// key that no longer shares the prefix.
    pub fn scan_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.keys
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|k| k.as_ref())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// Merge another set in (used by the parallel build merge phase).
    pub fn absorb(&mut self, other: BTreeSet<Arc<[u8]>>) {
        self.keys.extend(other);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
