//! Authoritative record store: word <-> id with logical deletion flags.
//!
//! Records are never removed physically. `by_word` and the id-slot table are
//! two views of the same records and stay consistent by construction: the
//! record itself lives in the slot, `by_word` maps the interned word to its
//! id.

pub mod interner;

pub use interner::Interner;

use crate::index::types::WordId;
use ahash::AHashMap;
use std::sync::Arc;

/// The canonical entry: `(id, word, deleted)`.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: WordId,
    pub word: Arc<str>,
    pub deleted: bool,
}

impl Record {
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

#[derive(Debug, Default)]
pub struct Dictionary {
    by_word: AHashMap<Arc<str>, WordId>,
    /// Slot per id; ids are dense but gaps can appear across restarts.
    slots: Vec<Option<Record>>,
    next_id: WordId,
    active: usize,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records, deleted included.
    pub fn len(&self) -> usize {
        self.by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_word.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Next id the monotonic counter would assign.
    pub fn next_id(&self) -> WordId {
        self.next_id
    }

    /// Insert a record under an explicit id (bulk load / incremental add).
    ///
    /// Returns false without touching anything if the word or the id is
    /// already taken; the loader treats that as a malformed input line.
    pub fn insert_new(&mut self, word: Arc<str>, id: WordId, deleted: bool) -> bool {
        if self.by_word.contains_key(word.as_ref()) {
            return false;
        }
        let slot = id as usize;
        if slot < self.slots.len() && self.slots[slot].is_some() {
            return false;
        }
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }

        self.by_word.insert(Arc::clone(&word), id);
        self.slots[slot] = Some(Record { id, word, deleted });
        self.next_id = self.next_id.max(id + 1);
        if !deleted {
            self.active += 1;
        }
        true
    }

    pub fn get_by_word(&self, word: &str) -> Option<&Record> {
        let id = *self.by_word.get(word)?;
        self.get_by_id(id)
    }

    pub fn get_by_id(&self, id: WordId) -> Option<&Record> {
        self.slots.get(id as usize)?.as_ref()
    }

    /// Set the deletion flag. Returns false if the id is unknown or the
    /// record is already deleted.
    pub fn mark_deleted(&mut self, id: WordId) -> bool {
        match self.slots.get_mut(id as usize).and_then(|s| s.as_mut()) {
            Some(record) if !record.deleted => {
                record.deleted = true;
                self.active -= 1;
                true
            }
            _ => false,
        }
    }

    /// Clear the deletion flag. Returns false if the id is unknown or the
    /// record is already active.
    pub fn mark_active(&mut self, id: WordId) -> bool {
        match self.slots.get_mut(id as usize).and_then(|s| s.as_mut()) {
            Some(record) if record.deleted => {
                record.deleted = false;
                self.active += 1;
                true
            }
            _ => false,
        }
    }

    /// All records in ascending id order, deleted included.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Active records in ascending id order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Record> {
        self.iter().filter(|r| r.is_active())
    }

    /// Smallest and largest assigned id, if any records exist.
    pub fn id_envelope(&self) -> Option<(WordId, WordId)> {
        let min = self.iter().next()?.id;
        let max = self.slots.iter().rev().find_map(|s| s.as_ref())?.id;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_of(words: &[(&str, WordId, bool)]) -> Dictionary {
        let mut dict = Dictionary::new();
        for &(w, id, deleted) in words {
            assert!(dict.insert_new(Arc::from(w), id, deleted));
        }
        dict
    }

    #[test]
    fn test_views_are_consistent() {
        let dict = dict_of(&[("apple", 0, false), ("banana", 1, true)]);

        let by_word = dict.get_by_word("apple").unwrap();
        let by_id = dict.get_by_id(0).unwrap();
        assert_eq!(by_word.id, by_id.id);
        assert_eq!(by_word.word, by_id.word);
        assert_eq!(by_word.deleted, by_id.deleted);

        assert!(dict.get_by_id(1).unwrap().deleted);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.active_count(), 1);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut dict = dict_of(&[("apple", 0, false)]);
        assert!(!dict.insert_new(Arc::from("apple"), 5, false));
        assert!(!dict.insert_new(Arc::from("pear"), 0, false));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.next_id(), 1);
    }

    #[test]
    fn test_next_id_tracks_gaps() {
        let dict = dict_of(&[("apple", 0, false), ("pear", 7, false)]);
        assert_eq!(dict.next_id(), 8);
        assert_eq!(dict.id_envelope(), Some((0, 7)));
    }

    #[test]
    fn test_mark_flags() {
        let mut dict = dict_of(&[("apple", 0, false)]);

        assert!(dict.mark_deleted(0));
        assert!(!dict.mark_deleted(0)); // already deleted
        assert!(!dict.mark_deleted(99)); // unknown id
        assert_eq!(dict.active_count(), 0);

        assert!(dict.mark_active(0));
        assert!(!dict.mark_active(0)); // already active
        assert_eq!(dict.active_count(), 1);
    }

    #[test]
    fn test_iteration_order() {
        let dict = dict_of(&[("pear", 3, false), ("apple", 0, true), ("fig", 1, false)]);
        let ids: Vec<WordId> = dict.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        let active: Vec<WordId> = dict.iter_active().map(|r| r.id).collect();
        assert_eq!(active, vec![1, 3]);
    }

    #[test]
    fn test_empty_envelope() {
        let dict = Dictionary::new();
        assert_eq!(dict.id_envelope(), None);
    }
}
