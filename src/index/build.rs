//! Index construction: bulk build from a record stream, plus the incremental
//! add/delete/restore paths that keep every index consistent online.
//!
//! Bulk build order matters: dictionary and interner first, then the length
//! buckets (keys pre-reserved), then the prefix/suffix sets and the 2-gram
//! postings in a parallel phase with worker-local structures merged serially,
//! and finally the BK-tree. The BK-tree is order-sensitive (merging two trees
//! is not defined), so it is always built serially, in batches.

use crate::dict::{Dictionary, Interner};
use crate::index::bigram::BigramIndex;
use crate::index::bktree::BkTree;
use crate::index::bitset::IdBitSet;
use crate::index::length::LengthIndex;
use crate::index::ordered::{OrderedByteIndex, OrderedStrIndex};
use crate::index::snapshot::SnapshotIndexes;
use crate::index::types::{word_grams, EngineConfig, Gram, WordId};
use crate::store::RawRecord;
use crate::utils::distance::damerau_levenshtein;
use crate::utils::progress::{ProgressBar, ProgressStyle};
use ahash::AHashMap;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The five cooperating indices.
pub struct Indexes {
    /// Active words, byte-lexicographic.
    pub prefix: OrderedStrIndex,
    /// Byte-reversed forms of active words (not necessarily valid UTF-8).
    pub suffix: OrderedByteIndex,
    /// 2-gram postings (lazily holds deleted ids until purge/rebuild).
    pub bigrams: BigramIndex,
    /// Length buckets.
    pub lengths: LengthIndex,
    /// Edit-distance tree (lazily holds deleted words until rebuild).
    pub bktree: BkTree,
}

impl Indexes {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            prefix: OrderedStrIndex::new(),
            suffix: OrderedByteIndex::new(),
            bigrams: BigramIndex::new(),
            lengths: LengthIndex::new(),
            bktree: BkTree::new(damerau_levenshtein, config.max_distance),
        }
    }
}

/// Byte-wise reversed image of a word, used as the suffix-index key.
/// suffix(w) == prefix(reversed(w)). The result of reversing a multi-byte
/// word need not be valid UTF-8, so the key is raw bytes; reversing a key
/// again restores the surface word.
pub fn reversed(word: &str) -> Arc<[u8]> {
    let rev: Vec<u8> = word.as_bytes().iter().rev().copied().collect();
    Arc::from(rev)
}

/// Everything a bulk build produces.
pub struct BuildOutput {
    pub dict: Dictionary,
    pub interner: Interner,
    pub indexes: Indexes,
}

/// Worker-local structures for the parallel phase; merged serially.
#[derive(Default)]
struct LocalIndexes {
    prefix: BTreeSet<Arc<str>>,
    suffix: BTreeSet<Arc<[u8]>>,
    grams: AHashMap<Gram, Vec<WordId>>,
}

/// Outcome of an incremental add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New record created under this id.
    Added(WordId),
    /// Word existed but was deleted; the flag was cleared.
    Restored(WordId),
    /// Word already active; the id counter was not touched.
    Unchanged(WordId),
}

/// Build the dictionary, interner, and all five indices from a record
/// stream (active and deleted records mixed, last-wins already applied).
///
/// `preloaded` carries snapshot-restored indices: with an `LTC2` snapshot the
/// prefix/suffix/2-gram/length phases are skipped entirely, with `LTC1` only
/// the ordered sets are. The dictionary and the BK-tree are always built from
/// the records.
pub fn bulk_build(
    records: &[RawRecord],
    config: &EngineConfig,
    preloaded: Option<SnapshotIndexes>,
) -> BuildOutput {
    bulk_build_with(records, config, preloaded, Interner::new())
}

/// [`bulk_build`] with a caller-provided interner, so handles created while
/// loading a snapshot are shared with the dictionary built here.
pub fn bulk_build_with(
    records: &[RawRecord],
    config: &EngineConfig,
    preloaded: Option<SnapshotIndexes>,
    mut interner: Interner,
) -> BuildOutput {
    let mut dict = Dictionary::new();
    let mut indexes = Indexes::new(config);

    for r in records {
        let word = interner.intern(&r.word);
        if !dict.insert_new(word, r.id, r.deleted) {
            eprintln!(
                "warning: conflicting record {},{} ignored during build",
                r.id, r.word
            );
        }
    }

    let active: Vec<(Arc<str>, WordId)> = dict
        .iter_active()
        .map(|r| (Arc::clone(&r.word), r.id))
        .collect();

    let mut skip_sets = false;
    let mut skip_grams = false;
    if let Some(snap) = preloaded {
        indexes.prefix = snap.prefix;
        indexes.suffix = snap.suffix;
        skip_sets = true;
        if let Some((bigrams, lengths)) = snap.grams {
            indexes.bigrams = bigrams;
            indexes.lengths = lengths;
            skip_grams = true;
        }
    }

    if !skip_grams {
        indexes.lengths.reserve(active.iter().map(|(w, _)| w.len()));
        for (word, id) in &active {
            indexes.lengths.insert(word.len(), *id);
        }
    }

    if !skip_sets || !skip_grams {
        // Parallel phase: each worker fills local structures over its chunk;
        // nothing shared is mutated until the serial merge below.
        let locals: Vec<LocalIndexes> = active
            .par_chunks(config.build_chunk.max(1))
            .map(|chunk| {
                let mut local = LocalIndexes::default();
                for (word, id) in chunk {
                    if !skip_sets {
                        local.prefix.insert(Arc::clone(word));
                        local.suffix.insert(reversed(word));
                    }
                    if !skip_grams {
                        for gram in word_grams(word.as_bytes()) {
                            local.grams.entry(gram).or_default().push(*id);
                        }
                    }
                }
                local
            })
            .collect();

        for local in locals {
            indexes.prefix.absorb(local.prefix);
            indexes.suffix.absorb(local.suffix);
            indexes.bigrams.absorb(local.grams);
        }
    }

    // BK-tree: serial, batched, with a progress checkpoint per batch.
    let pb = ProgressBar::new(active.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .expect("static template")
            .progress_chars("=> "),
    );
    pb.set_message("Building distance tree");
    indexes.bktree.insert_batch(
        active.iter().map(|(w, id)| (Arc::clone(w), *id)),
        config.bktree_batch,
        |n| pb.set_position(n as u64),
    );
    pb.finish_and_clear();

    BuildOutput {
        dict,
        interner,
        indexes,
    }
}

fn index_word(indexes: &mut Indexes, word: &Arc<str>, id: WordId) {
    indexes.prefix.insert(Arc::clone(word));
    indexes.suffix.insert(reversed(word));
    indexes.lengths.insert(word.len(), id);
    indexes.bigrams.register(word, id);
    indexes.bktree.insert(Arc::clone(word), id);
}

/// Incremental add of a single word: a fresh record under the next id, or a
/// restore when the word exists deleted, or a no-op when it is already
/// active (the id counter is not advanced in either of the latter cases).
pub fn add_word(
    dict: &mut Dictionary,
    interner: &mut Interner,
    indexes: &mut Indexes,
    word: &str,
) -> AddOutcome {
    if let Some(record) = dict.get_by_word(word) {
        let id = record.id;
        return if record.deleted {
            restore_word(dict, indexes, id);
            AddOutcome::Restored(id)
        } else {
            AddOutcome::Unchanged(id)
        };
    }

    let id = dict.next_id();
    let handle = interner.intern(word);
    dict.insert_new(Arc::clone(&handle), id, false);
    index_word(indexes, &handle, id);
    AddOutcome::Added(id)
}

/// Incremental delete: set the flag and remove the word's footprint from the
/// prefix, suffix, and length indices. The 2-gram postings and the BK-tree
/// keep the word until the next purge or rebuild, so query paths re-filter
/// through the deletion flag.
pub fn delete_word(dict: &mut Dictionary, indexes: &mut Indexes, id: WordId) -> bool {
    let word = match dict.get_by_id(id) {
        Some(record) if record.is_active() => Arc::clone(&record.word),
        _ => return false,
    };

    dict.mark_deleted(id);
    indexes.prefix.remove(&word);
    indexes.suffix.remove(&reversed(&word));
    indexes.lengths.remove(word.len(), id);
    true
}

/// Incremental restore: clear the flag and re-insert into every index.
/// Re-registering the 2-grams is idempotent and covers the case where an
/// `optimize` ran while the word was deleted.
pub fn restore_word(dict: &mut Dictionary, indexes: &mut Indexes, id: WordId) -> bool {
    let word = match dict.get_by_id(id) {
        Some(record) if record.deleted => Arc::clone(&record.word),
        _ => return false,
    };

    dict.mark_active(id);
    indexes.prefix.insert(Arc::clone(&word));
    indexes.suffix.insert(reversed(&word));
    indexes.lengths.insert(word.len(), id);
    indexes.bigrams.register(&word, id);
    indexes.bktree.insert(word, id);
    true
}

/// Purge deleted ids from the 2-gram postings (dropping emptied gram keys)
/// and drop empty length buckets. The BK-tree is left to the next rebuild.
pub fn optimize(dict: &Dictionary, indexes: &mut Indexes) {
    let live: IdBitSet = dict.iter_active().map(|r| r.id).collect();
    indexes.bigrams.purge(|id| live.contains(id));
    indexes.lengths.drop_empty();
}
