//! BK-tree over a bounded edit-distance metric.
//!
//! Nodes live in an arena `Vec` and are addressed by `u32` index; each node
//! keeps a distance -> arena-index child map. An edge labeled `d` means the
//! child's word is at distance exactly `d` from the parent's, which lets a
//! search prune children outside `[d - max_d, d + max_d]` by the triangle
//! inequality.
//!
//! Deleted words stay in the tree until the next full rebuild; callers must
//! re-check the dictionary's deletion flag on every hit.

use crate::index::types::WordId;
use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Distance function between two byte strings under a cutoff.
pub type DistanceFn = fn(&[u8], &[u8], u32) -> u32;

/// Walk depth at which an insert is abandoned. Real dictionaries produce
/// depths in the low tens; hitting this means something is badly wrong and
/// dropping one insert beats crashing or looping.
const MAX_INSERT_DEPTH: usize = 1024;

#[derive(Debug)]
struct BkNode {
    word: Arc<str>,
    id: WordId,
    children: AHashMap<u32, u32>,
}

pub struct BkTree {
    nodes: Vec<BkNode>,
    metric: DistanceFn,
    max_distance: u32,
}

impl BkTree {
    /// `max_distance` caps every search cutoff; larger requests are clamped.
    pub fn new(metric: DistanceFn, max_distance: u32) -> Self {
        Self {
            nodes: Vec::new(),
            metric,
            max_distance,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Reset the arena.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Insert `(word, id)`. A word already present (distance 0 to some node)
    /// has that node's id overwritten. Returns false only when the depth
    /// guard aborts the insert.
    pub fn insert(&mut self, word: Arc<str>, id: WordId) -> bool {
        if self.nodes.is_empty() {
            self.nodes.push(BkNode {
                word,
                id,
                children: AHashMap::new(),
            });
            return true;
        }

        let mut cur = 0usize;
        for _ in 0..MAX_INSERT_DEPTH {
            // The distance to a node is needed exactly to label the edge;
            // max(len, len) bounds it, so this cutoff never truncates.
            let limit = word.len().max(self.nodes[cur].word.len()) as u32;
            let d = (self.metric)(word.as_bytes(), self.nodes[cur].word.as_bytes(), limit);

            if d == 0 {
                self.nodes[cur].id = id;
                return true;
            }

            match self.nodes[cur].children.get(&d) {
                Some(&child) => cur = child as usize,
                None => {
                    let idx = self.nodes.len() as u32;
                    self.nodes.push(BkNode {
                        word,
                        id,
                        children: AHashMap::new(),
                    });
                    self.nodes[cur].children.insert(d, idx);
                    return true;
                }
            }
        }

        eprintln!(
            "warning: bk-tree insert of {:?} exceeded depth {}, dropped",
            word, MAX_INSERT_DEPTH
        );
        false
    }

    /// Insert `(word, id)` pairs in order, invoking `checkpoint` with the
    /// running count after every `batch` inserts.
    pub fn insert_batch<I, F>(&mut self, pairs: I, batch: usize, mut checkpoint: F)
    where
        I: IntoIterator<Item = (Arc<str>, WordId)>,
        F: FnMut(usize),
    {
        let batch = batch.max(1);
        let mut inserted = 0usize;
        for (word, id) in pairs {
            self.insert(word, id);
            inserted += 1;
            if inserted % batch == 0 {
                checkpoint(inserted);
            }
        }
    }

    /// Find all `(id, distance)` with distance to `query` at most `max_d`
    /// (clamped to the configured cap).
    ///
    /// Results are sorted by distance ascending, ties by id ascending, so an
    /// exact hit is always first. `exhaustive` widens the child-label window
    /// by one on each side, trading work for recall of degenerate layouts.
    pub fn search(&self, query: &[u8], max_d: u32, exhaustive: bool) -> Vec<(WordId, u32)> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let max_d = max_d.min(self.max_distance);
        let mut hits = Vec::new();
        let mut frontier = VecDeque::new();
        frontier.push_back(0u32);

        while let Some(idx) = frontier.pop_front() {
            let node = &self.nodes[idx as usize];
            let d = (self.metric)(query, node.word.as_bytes(), max_d + 1);

            if d <= max_d {
                hits.push((node.id, d));
            }

            let mut lo = d.saturating_sub(max_d).max(1);
            let mut hi = d + max_d;
            if exhaustive {
                lo = lo.saturating_sub(1).max(1);
                hi += 1;
            }

            for (&label, &child) in &node.children {
                if label >= lo && label <= hi {
                    frontier.push_back(child);
                }
            }
        }

        hits.sort_unstable_by_key(|&(id, d)| (d, id));
        hits
    }

    /// Count edges whose label disagrees with the metric (0 on a healthy
    /// tree). Used by index validation.
    pub fn check_edges(&self) -> usize {
        let mut bad = 0;
        for node in &self.nodes {
            for (&label, &child) in &node.children {
                let child = &self.nodes[child as usize];
                let limit = node.word.len().max(child.word.len()) as u32;
                let d = (self.metric)(node.word.as_bytes(), child.word.as_bytes(), limit);
                if d != label {
                    bad += 1;
                }
            }
        }
        bad
    }

    /// Iterate every `(word, id)` held by the tree, including entries for
    /// deleted words that have not been rebuilt away yet.
    pub fn iter(&self) -> impl Iterator<Item = (&str, WordId)> {
        self.nodes.iter().map(|n| (n.word.as_ref(), n.id))
    }
}

impl std::fmt::Debug for BkTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BkTree")
            .field("nodes", &self.nodes.len())
            .field("max_distance", &self.max_distance)
            .finish()
    }
}
