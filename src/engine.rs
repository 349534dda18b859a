//! The engine: one owner for the dictionary, interner, indices, query cache,
//! and the append-only log handle.
//!
//! Single-writer, single-reader: mutations and queries alternate on one
//! thread, so a query observes exactly the effects of the mutations issued
//! before it. The only parallelism lives inside the bulk index build.
//!
//! Shutdown is structured: the log handle syncs on drop, and a clean
//! `shutdown()` additionally writes the index snapshot so the next start can
//! skip most of the rebuild.

use crate::dict::{Dictionary, Interner, Record};
use crate::index::build::{self, BuildOutput, Indexes};
use crate::index::snapshot;
use crate::index::stats::{self, EngineStats, ValidationReport};
use crate::index::types::{EngineConfig, WordId};
use crate::query::{QueryCache, QueryExecutor, QueryOutcome};
use crate::store::{self, LogWriter, RawRecord};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

pub use crate::index::build::AddOutcome;

pub struct Engine {
    config: EngineConfig,
    dict: Dictionary,
    interner: Interner,
    indexes: Indexes,
    cache: QueryCache,
    log: Option<LogWriter>,
    log_path: Option<PathBuf>,
}

impl Engine {
    /// An empty in-memory engine with no backing log.
    pub fn new(config: EngineConfig) -> Self {
        let cache = QueryCache::new(config.sim_cache_size);
        let BuildOutput {
            dict,
            interner,
            indexes,
        } = build::bulk_build(&[], &config, None);
        Self {
            config,
            dict,
            interner,
            indexes,
            cache,
            log: None,
            log_path: None,
        }
    }

    /// Open (or create) a log file and build the engine from it, taking the
    /// snapshot fast path when a usable `<log>.cache` exists.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        let summary = store::load_log(path)?;
        if summary.malformed > 0 {
            eprintln!(
                "warning: skipped {} malformed line(s) in {}",
                summary.malformed,
                path.display()
            );
        }

        // One interner serves both the snapshot load and the record pass, so
        // snapshot-restored prefix entries share handles with the dictionary.
        let mut interner = Interner::new();
        let preloaded = if config.use_snapshot && path.exists() {
            let log_mtime = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            snapshot::load(&snapshot::snapshot_path(path), log_mtime, &mut interner)
        } else {
            None
        };

        let BuildOutput {
            dict,
            interner,
            indexes,
        } = build::bulk_build_with(&summary.records, &config, preloaded, interner);

        let log = LogWriter::open_append(path)?;
        let cache = QueryCache::new(config.sim_cache_size);

        Ok(Self {
            config,
            dict,
            interner,
            indexes,
            cache,
            log: Some(log),
            log_path: Some(path.to_path_buf()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    fn check_word(word: &str) -> Result<()> {
        if word.is_empty() {
            bail!("word must be non-empty");
        }
        if word.contains(',') || word.chars().any(|c| c.is_control()) {
            bail!("word {word:?} contains characters the log format cannot carry");
        }
        Ok(())
    }

    fn append(&mut self, id: WordId, word: &str, deleted: bool) -> Result<()> {
        if let Some(log) = self.log.as_mut() {
            log.append(id, word, deleted)?;
        }
        Ok(())
    }

    /// Add a word: a new record, a restore of a deleted one, or a no-op when
    /// it is already active. Appends a log line for the first two.
    pub fn add(&mut self, word: &str) -> Result<AddOutcome> {
        Self::check_word(word)?;
        let outcome = build::add_word(&mut self.dict, &mut self.interner, &mut self.indexes, word);
        match outcome {
            AddOutcome::Added(id) | AddOutcome::Restored(id) => {
                self.cache.clear();
                self.append(id, word, false)?;
            }
            AddOutcome::Unchanged(_) => {}
        }
        Ok(outcome)
    }

    /// Logically delete a record. Returns false when the id is unknown or
    /// already deleted.
    pub fn delete(&mut self, id: WordId) -> Result<bool> {
        let word = match self.dict.get_by_id(id) {
            Some(record) if record.is_active() => record.word.to_string(),
            _ => return Ok(false),
        };
        build::delete_word(&mut self.dict, &mut self.indexes, id);
        self.cache.clear();
        self.append(id, &word, true)?;
        Ok(true)
    }

    /// Restore a deleted record. Returns false when the id is unknown or
    /// already active.
    pub fn undelete(&mut self, id: WordId) -> Result<bool> {
        let word = match self.dict.get_by_id(id) {
            Some(record) if record.deleted => record.word.to_string(),
            _ => return Ok(false),
        };
        build::restore_word(&mut self.dict, &mut self.indexes, id);
        self.cache.clear();
        self.append(id, &word, false)?;
        Ok(true)
    }

    /// Rebuild every index from scratch: from the log when one is attached,
    /// otherwise from the in-memory records. Drops deleted words out of the
    /// lazy structures.
    pub fn rebuild(&mut self) -> Result<()> {
        let records: Vec<RawRecord> = match &self.log_path {
            Some(path) => store::load_log(path)?.records,
            None => self
                .dict
                .iter()
                .map(|r| RawRecord {
                    id: r.id,
                    word: r.word.to_string(),
                    deleted: r.deleted,
                })
                .collect(),
        };

        let BuildOutput {
            dict,
            interner,
            indexes,
        } = build::bulk_build(&records, &self.config, None);
        self.dict = dict;
        self.interner = interner;
        self.indexes = indexes;
        self.cache.clear();
        Ok(())
    }

    /// Purge deleted ids from the 2-gram postings and drop empty length
    /// buckets. The BK-tree is left to the next rebuild.
    pub fn optimize(&mut self) {
        build::optimize(&self.dict, &mut self.indexes);
        self.cache.clear();
    }

    /// Execute a parsed query. Read-only.
    pub fn query(&self, query: &crate::query::Query) -> QueryOutcome {
        QueryExecutor::new(&self.dict, &self.indexes, &self.config, &self.cache).execute(query)
    }

    /// Cross-check the indices against the dictionary. Read-only.
    pub fn validate(&self) -> ValidationReport {
        stats::validate(&self.dict, &self.indexes)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats::collect(&self.dict, &self.interner, &self.indexes)
    }

    /// Active records in ascending id order.
    pub fn list_active(&self) -> Vec<&Record> {
        self.dict.iter_active().collect()
    }

    /// All records in ascending id order, deleted included.
    pub fn list_all(&self) -> Vec<&Record> {
        self.dict.iter().collect()
    }

    /// Active records in lexicographic order.
    pub fn list_alpha(&self) -> Vec<&Record> {
        self.indexes
            .prefix
            .iter()
            .filter_map(|w| self.dict.get_by_word(w))
            .collect()
    }

    /// Write the index snapshot next to the log.
    pub fn save_snapshot(&self) -> Result<()> {
        let path = self
            .log_path
            .as_ref()
            .context("engine has no backing log to snapshot against")?;
        snapshot::save(&snapshot::snapshot_path(path), &self.indexes)
    }

    /// Clean shutdown: snapshot (when configured and backed by a log), then
    /// sync and close the log handle.
    pub fn shutdown(mut self) -> Result<()> {
        if self.config.use_snapshot && self.log_path.is_some() {
            self.save_snapshot()?;
        }
        drop(self.log.take()); // dropping the writer syncs the log
        Ok(())
    }
}
