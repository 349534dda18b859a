//! Query execution.
//!
//! The executor reads the dictionary and the indices, never mutates them,
//! and returns id hits plus the elapsed time. Index structures may lazily
//! hold deleted ids (2-gram postings, BK-tree), so every path re-checks the
//! deletion flag before an id is emitted.
//!
//! Candidate-set composition (boolean and complex queries) runs on
//! `RoaringBitmap`s; the per-index posting lists stay bit-sets.

use crate::dict::Dictionary;
use crate::index::bitset::IdBitSet;
use crate::index::build::{reversed, Indexes};
use crate::index::types::{bytes_to_gram, EngineConfig, WordId};
use crate::query::cache::QueryCache;
use crate::query::parser::{Query, Term};
use memchr::{memchr, memmem};
use roaring::RoaringBitmap;
use std::time::{Duration, Instant};

/// One query hit. `distance` is set by similarity searches only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: WordId,
    pub distance: Option<u32>,
}

/// Result of a query: hits, latency, and the out-of-band signals.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub hits: Vec<Hit>,
    pub elapsed: Duration,
    /// The deadline fired; `hits` may be partial.
    pub timed_out: bool,
    /// An id-range request lay entirely outside the observed id envelope.
    pub out_of_range: bool,
}

/// Deadline bookkeeping threaded through the scan loops.
struct ExecState {
    deadline: Instant,
    timed_out: bool,
    out_of_range: bool,
}

impl ExecState {
    /// True once the deadline has passed; sticky.
    fn expired(&mut self) -> bool {
        if !self.timed_out && Instant::now() >= self.deadline {
            self.timed_out = true;
        }
        self.timed_out
    }
}

/// How many loop iterations between deadline checks.
const DEADLINE_STRIDE: usize = 1024;

pub struct QueryExecutor<'a> {
    dict: &'a Dictionary,
    indexes: &'a Indexes,
    config: &'a EngineConfig,
    cache: &'a QueryCache,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        dict: &'a Dictionary,
        indexes: &'a Indexes,
        config: &'a EngineConfig,
        cache: &'a QueryCache,
    ) -> Self {
        Self {
            dict,
            indexes,
            config,
            cache,
        }
    }

    /// Execute a query. Hits are ascending by id, except similarity results
    /// which are ordered by distance then id (an exact hit comes first).
    pub fn execute(&self, query: &Query) -> QueryOutcome {
        let started = Instant::now();
        let mut state = ExecState {
            deadline: started + self.config.query_timeout(),
            timed_out: false,
            out_of_range: false,
        };

        let hits = match query {
            Query::Similar {
                word,
                max_distance,
                exhaustive,
            } => {
                let max_d = max_distance.unwrap_or(self.config.default_sim_distance);
                self.similar_hits(word, max_d, *exhaustive)
            }
            other => {
                let ids = self.eval_ids(other, &mut state);
                self.finish(ids)
            }
        };

        QueryOutcome {
            hits,
            elapsed: started.elapsed(),
            timed_out: state.timed_out,
            out_of_range: state.out_of_range,
        }
    }

    /// Final active-filter: lazy index structures may surface deleted ids.
    fn finish(&self, ids: RoaringBitmap) -> Vec<Hit> {
        ids.iter()
            .filter(|&id| self.is_active(id))
            .map(|id| Hit { id, distance: None })
            .collect()
    }

    fn is_active(&self, id: WordId) -> bool {
        self.dict.get_by_id(id).map(|r| r.is_active()).unwrap_or(false)
    }

    fn eval_ids(&self, query: &Query, state: &mut ExecState) -> RoaringBitmap {
        match query {
            Query::Exact(word) => self.exact_ids(word),
            Query::Prefix(prefix) => self.prefix_ids(prefix),
            Query::Suffix(suffix) => self.suffix_ids(suffix),
            Query::Substring(needle) => self.substring_ids(needle, state),
            Query::Length { min, max } => self.length_ids(*min, *max),
            Query::IdRange { min, max } => self.id_range_ids(*min, *max, state),
            Query::All(keys) => self.all_ids(keys, state),
            Query::Any(keys) => self.any_ids(keys, state),
            Query::Without(key) => self.without_ids(key, state),
            Query::Complex { terms, .. } => self.complex_ids(terms, state),
            Query::Similar { .. } => unreachable!("similarity is handled in execute"),
        }
    }

    fn exact_ids(&self, word: &str) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        if let Some(record) = self.dict.get_by_word(word) {
            out.insert(record.id);
        }
        out
    }

    fn prefix_ids(&self, prefix: &str) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for word in self.indexes.prefix.scan_prefix(prefix) {
            if let Some(record) = self.dict.get_by_word(word) {
                out.insert(record.id);
            }
        }
        out
    }

    /// suffix(s) == prefix(reverse(s)) on the reversed-word set.
    fn suffix_ids(&self, suffix: &str) -> RoaringBitmap {
        let key = reversed(suffix);
        let mut out = RoaringBitmap::new();
        for entry in self.indexes.suffix.scan_prefix(&key) {
            // Reversing the key again restores the surface word's bytes,
            // which are valid UTF-8 even when the key itself is not.
            let surface: Vec<u8> = entry.iter().rev().copied().collect();
            let Ok(word) = std::str::from_utf8(&surface) else {
                continue;
            };
            if let Some(record) = self.dict.get_by_word(word) {
                out.insert(record.id);
            }
        }
        out
    }

    fn substring_ids(&self, needle: &str, state: &mut ExecState) -> RoaringBitmap {
        let bytes = needle.as_bytes();
        match bytes.len() {
            0 => RoaringBitmap::new(),
            1 => self.single_byte_substring(bytes[0], state),
            _ => self.gram_substring(bytes, state),
        }
    }

    /// Single-byte needles have no 2-gram; scan the active records.
    fn single_byte_substring(&self, byte: u8, state: &mut ExecState) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for (i, record) in self.dict.iter_active().enumerate() {
            if i % DEADLINE_STRIDE == 0 && state.expired() {
                break;
            }
            if memchr(byte, record.word.as_bytes()).is_some() {
                out.insert(record.id);
            }
        }
        out
    }

    /// Intersect the posting lists of the needle's 2-grams, then verify each
    /// survivor: gram overlap is necessary but not sufficient.
    fn gram_substring(&self, needle: &[u8], state: &mut ExecState) -> RoaringBitmap {
        let mut candidates: Option<IdBitSet> = None;
        for window in needle.windows(2) {
            let gram = bytes_to_gram(window[0], window[1]);
            let Some(posting) = self.indexes.bigrams.lookup(gram) else {
                return RoaringBitmap::new();
            };
            match &mut candidates {
                Some(set) => {
                    set.intersect_with(posting);
                    if set.is_empty() {
                        return RoaringBitmap::new();
                    }
                }
                None => candidates = Some(posting.clone()),
            }
        }

        let candidates = candidates.unwrap_or_default();
        let finder = memmem::Finder::new(needle);
        let mut out = RoaringBitmap::new();
        for (i, id) in candidates.iter().enumerate() {
            if i % DEADLINE_STRIDE == 0 && state.expired() {
                break;
            }
            if let Some(record) = self.dict.get_by_id(id) {
                if finder.find(record.word.as_bytes()).is_some() {
                    out.insert(id);
                }
            }
        }
        out
    }

    fn similar_hits(&self, word: &str, max_distance: u32, exhaustive: bool) -> Vec<Hit> {
        let max_distance = max_distance.min(self.config.max_distance);
        let raw = self.cache.get_or_compute(word, max_distance, exhaustive, || {
            self.indexes.bktree.search(word.as_bytes(), max_distance, exhaustive)
        });

        // Tree results are already (distance, id)-sorted; dropping inactive
        // entries preserves the order.
        raw.iter()
            .filter(|(id, _)| self.is_active(*id))
            .map(|&(id, d)| Hit {
                id,
                distance: Some(d),
            })
            .collect()
    }

    fn length_ids(&self, min: usize, max: usize) -> RoaringBitmap {
        self.indexes.lengths.range(min, max).iter().collect()
    }

    fn id_range_ids(&self, min: WordId, max: WordId, state: &mut ExecState) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        match self.dict.id_envelope() {
            Some((lo, hi)) if min <= hi && max >= lo => {
                for id in min.max(lo)..=max.min(hi) {
                    if self.dict.get_by_id(id).is_some() {
                        out.insert(id);
                    }
                }
            }
            _ => state.out_of_range = true,
        }
        out
    }

    fn all_active_ids(&self) -> RoaringBitmap {
        self.dict.iter_active().map(|r| r.id).collect()
    }

    /// Linear scan of the active records for one contained keyword.
    fn contains_scan(&self, key: &str, state: &mut ExecState) -> RoaringBitmap {
        let finder = memmem::Finder::new(key.as_bytes());
        let mut out = RoaringBitmap::new();
        for (i, record) in self.dict.iter_active().enumerate() {
            if i % DEADLINE_STRIDE == 0 && state.expired() {
                break;
            }
            if finder.find(record.word.as_bytes()).is_some() {
                out.insert(record.id);
            }
        }
        out
    }

    fn all_ids(&self, keys: &[String], state: &mut ExecState) -> RoaringBitmap {
        let mut result: Option<RoaringBitmap> = None;
        for key in keys {
            let matching = self.contains_scan(key, state);
            result = Some(match result {
                Some(acc) => acc & matching,
                None => matching,
            });
            if result.as_ref().is_some_and(|r| r.is_empty()) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    fn any_ids(&self, keys: &[String], state: &mut ExecState) -> RoaringBitmap {
        let mut result = RoaringBitmap::new();
        for key in keys {
            result |= self.contains_scan(key, state);
        }
        result
    }

    fn without_ids(&self, key: &str, state: &mut ExecState) -> RoaringBitmap {
        let mut result = self.all_active_ids();
        result -= self.contains_scan(key, state);
        result
    }

    /// Evaluate terms left-to-right, AND-combining, short-circuiting on an
    /// empty intermediate set. A leading `not` starts from all active ids.
    fn complex_ids(&self, terms: &[Term], state: &mut ExecState) -> RoaringBitmap {
        let mut candidates: Option<RoaringBitmap> = None;

        for term in terms {
            if state.expired() {
                break;
            }

            let next = match term {
                Term::Without(key) => {
                    let matching = self.contains_scan(key, state);
                    let mut base = candidates.take().unwrap_or_else(|| self.all_active_ids());
                    base -= matching;
                    base
                }
                Term::Prefix(p) => {
                    let set = self.prefix_ids(p);
                    Self::combine(candidates.take(), set)
                }
                Term::Suffix(s) => {
                    let set = self.suffix_ids(s);
                    Self::combine(candidates.take(), set)
                }
                Term::Substring(k) => {
                    let set = self.substring_ids(k, state);
                    Self::combine(candidates.take(), set)
                }
                Term::Length { min, max } => {
                    let set = self.length_ids(*min, *max);
                    Self::combine(candidates.take(), set)
                }
                Term::IdRange { min, max } => {
                    let set = self.id_range_ids(*min, *max, state);
                    Self::combine(candidates.take(), set)
                }
                Term::Similar { word, max_distance } => {
                    let max_d = max_distance.unwrap_or(self.config.default_sim_distance);
                    let set: RoaringBitmap = self
                        .similar_hits(word, max_d, false)
                        .into_iter()
                        .map(|hit| hit.id)
                        .collect();
                    Self::combine(candidates.take(), set)
                }
            };

            if next.is_empty() {
                return RoaringBitmap::new();
            }
            candidates = Some(next);
        }

        candidates.unwrap_or_default()
    }

    fn combine(candidates: Option<RoaringBitmap>, set: RoaringBitmap) -> RoaringBitmap {
        match candidates {
            Some(acc) => acc & set,
            None => set,
        }
    }
}
