//! Index statistics and cross-index validation.

use crate::dict::{Dictionary, Interner};
use crate::index::build::{reversed, Indexes};
use crate::index::types::word_grams;

/// Cardinalities and an approximate memory figure for the whole engine.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub records: usize,
    pub active: usize,
    pub deleted: usize,
    pub interned: usize,
    pub prefix_entries: usize,
    pub suffix_entries: usize,
    pub gram_keys: usize,
    pub length_buckets: usize,
    pub bktree_nodes: usize,
    pub approx_bytes: usize,
}

impl EngineStats {
    pub fn collect(dict: &Dictionary, interner: &Interner, indexes: &Indexes) -> Self {
        let interner_bytes = interner.approx_bytes();
        // Rough per-entry overheads; this is a report, not an allocator audit.
        let approx_bytes = interner_bytes
            + dict.len() * 48
            + (indexes.prefix.len() + indexes.suffix.len()) * 32
            + indexes.bigrams.gram_count() * 160
            + indexes.lengths.bucket_count() * 160
            + indexes.bktree.len() * 96;

        Self {
            records: dict.len(),
            active: dict.active_count(),
            deleted: dict.len() - dict.active_count(),
            interned: interner.len(),
            prefix_entries: indexes.prefix.len(),
            suffix_entries: indexes.suffix.len(),
            gram_keys: indexes.bigrams.gram_count(),
            length_buckets: indexes.lengths.bucket_count(),
            bktree_nodes: indexes.bktree.len(),
            approx_bytes,
        }
    }

    pub fn print(&self) {
        println!("Records:        {} ({} active, {} deleted)", self.records, self.active, self.deleted);
        println!("Interned words: {}", self.interned);
        println!("Prefix index:   {} entries", self.prefix_entries);
        println!("Suffix index:   {} entries", self.suffix_entries);
        println!("2-gram index:   {} keys", self.gram_keys);
        println!("Length index:   {} buckets", self.length_buckets);
        println!("BK-tree:        {} nodes", self.bktree_nodes);
        println!(
            "Memory (approx): {:.1} MB",
            self.approx_bytes as f64 / 1024.0 / 1024.0
        );
    }
}

/// Mismatch counts from a validation pass. All zeros on a healthy engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Active words missing from the prefix index.
    pub prefix_missing: usize,
    /// Prefix entries with no active record behind them.
    pub prefix_stale: usize,
    /// Active words whose reversed form is missing from the suffix index.
    pub suffix_missing: usize,
    /// Suffix entries with no active record behind them.
    pub suffix_stale: usize,
    /// Active words missing from their length bucket.
    pub length_missing: usize,
    /// Length-bucket ids that do not match an active record of that length.
    pub length_stale: usize,
    /// Active posting ids whose word does not contain the gram.
    pub gram_mismatch: usize,
    /// Active words the BK-tree cannot find at distance 0.
    pub bktree_missing: usize,
    /// BK-tree edges whose label disagrees with the metric.
    pub bktree_bad_edges: usize,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.prefix_missing
            + self.prefix_stale
            + self.suffix_missing
            + self.suffix_stale
            + self.length_missing
            + self.length_stale
            + self.gram_mismatch
            + self.bktree_missing
            + self.bktree_bad_edges
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    pub fn print(&self) {
        if self.is_clean() {
            println!("All indices consistent.");
            return;
        }
        println!("Found {} inconsistencies:", self.total());
        let rows = [
            ("prefix entries missing", self.prefix_missing),
            ("prefix entries stale", self.prefix_stale),
            ("suffix entries missing", self.suffix_missing),
            ("suffix entries stale", self.suffix_stale),
            ("length entries missing", self.length_missing),
            ("length entries stale", self.length_stale),
            ("gram postings mismatched", self.gram_mismatch),
            ("bk-tree words missing", self.bktree_missing),
            ("bk-tree edges mislabeled", self.bktree_bad_edges),
        ];
        for (label, count) in rows {
            if count > 0 {
                println!("  {label}: {count}");
            }
        }
    }
}

/// Cross-check every index against the dictionary. Never mutates; deleted
/// ids lingering in the 2-gram postings or the BK-tree are expected and not
/// counted as mismatches.
pub fn validate(dict: &Dictionary, indexes: &Indexes) -> ValidationReport {
    let mut report = ValidationReport::default();

    for record in dict.iter_active() {
        let word = record.word.as_ref();
        if !indexes.prefix.contains(word) {
            report.prefix_missing += 1;
        }
        if !indexes.suffix.contains(&reversed(word)) {
            report.suffix_missing += 1;
        }
        let in_bucket = indexes
            .lengths
            .lookup(word.len())
            .map(|b| b.contains(record.id))
            .unwrap_or(false);
        if !in_bucket {
            report.length_missing += 1;
        }
        if indexes.bktree.search(word.as_bytes(), 0, false) != vec![(record.id, 0)] {
            report.bktree_missing += 1;
        }
    }

    for entry in indexes.prefix.iter() {
        let live = dict.get_by_word(entry).map(|r| r.is_active()).unwrap_or(false);
        if !live {
            report.prefix_stale += 1;
        }
    }

    for entry in indexes.suffix.iter() {
        let surface: Vec<u8> = entry.iter().rev().copied().collect();
        let live = std::str::from_utf8(&surface)
            .ok()
            .and_then(|word| dict.get_by_word(word))
            .map(|r| r.is_active())
            .unwrap_or(false);
        if !live {
            report.suffix_stale += 1;
        }
    }

    for (len, bucket) in indexes.lengths.iter() {
        for id in bucket.iter() {
            let ok = dict
                .get_by_id(id)
                .map(|r| r.is_active() && r.word.len() == len)
                .unwrap_or(false);
            if !ok {
                report.length_stale += 1;
            }
        }
    }

    for (gram, posting) in indexes.bigrams.iter() {
        for id in posting.iter() {
            if let Some(record) = dict.get_by_id(id) {
                if record.is_active() && !word_grams(record.word.as_bytes()).contains(&gram) {
                    report.gram_mismatch += 1;
                }
            }
        }
    }

    report.bktree_bad_edges = indexes.bktree.check_edges();

    report
}
