//! Canonical storage of word payloads.
//!
//! Every word held anywhere in the engine is an `Arc<str>` handle into this
//! interner, so the dictionary, the ordered indices, and the BK-tree all
//! share one copy of each surface form. Entries live for the engine's
//! lifetime; the interner is owned by the engine rather than living in a
//! process-wide global.

use ahash::AHashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Interner {
    strings: AHashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            strings: AHashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Return the canonical handle for `s`, copying it into owned storage on
    /// first sight.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let handle: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&handle));
        handle
    }

    /// Approximate heap footprint in bytes.
    pub fn approx_bytes(&self) -> usize {
        self.strings
            .iter()
            .map(|s| s.len() + std::mem::size_of::<Arc<str>>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups() {
        let mut interner = Interner::new();
        let a = interner.intern("apple");
        let b = interner.intern("apple");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_distinct() {
        let mut interner = Interner::new();
        let a = interner.intern("apple");
        let b = interner.intern("banana");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }
}
