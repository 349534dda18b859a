//! Append-only text log and synthetic data generator.
//!
//! The log is line-oriented UTF-8: a literal header line, then one
//! `<id>,<word>,<flag>` record per line. Every mutation appends a line, so a
//! word's history is a sequence of lines sharing an id and the last line wins
//! on load. A missing or empty file is an empty engine.

use crate::index::types::WordId;
use crate::utils::progress::{ProgressBar, ProgressStyle};
use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Literal first line of every log file.
pub const LOG_HEADER: &str = "ID,単語,削除フラグ";

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: WordId,
    pub word: String,
    pub deleted: bool,
}

/// Result of loading a log file.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Last-line-wins records, ascending by id.
    pub records: Vec<RawRecord>,
    /// Total data lines seen (header excluded).
    pub lines: usize,
    /// Lines that failed to parse and were skipped.
    pub malformed: usize,
}

fn parse_line(line: &str) -> Option<RawRecord> {
    let mut parts = line.splitn(3, ',');
    let id: WordId = parts.next()?.parse().ok()?;
    let word = parts.next()?;
    let flag = parts.next()?;
    if word.is_empty() {
        return None;
    }
    let deleted = match flag {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    Some(RawRecord {
        id,
        word: word.to_string(),
        deleted,
    })
}

/// Load a log file. Malformed lines are counted, reported by the caller, and
/// skipped; they never abort the load.
pub fn load_log(path: &Path) -> Result<LoadSummary> {
    if !path.exists() {
        return Ok(LoadSummary::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file {}", path.display()))?;

    let mut summary = LoadSummary::default();
    let mut latest: AHashMap<WordId, RawRecord> = AHashMap::new();

    for (i, line) in content.lines().enumerate() {
        if i == 0 && line == LOG_HEADER {
            continue;
        }
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;
        match parse_line(line) {
            Some(record) => {
                latest.insert(record.id, record);
            }
            None => summary.malformed += 1,
        }
    }

    summary.records = latest.into_values().collect();
    summary.records.sort_unstable_by_key(|r| r.id);
    Ok(summary)
}

/// Append-mode handle on the log, held open for the session.
///
/// Each append is written and fsynced before returning; dropping the writer
/// is the structured-shutdown point and syncs once more, best-effort.
#[derive(Debug)]
pub struct LogWriter {
    file: File,
    path: PathBuf,
}

impl LogWriter {
    /// Open `path` for appending, creating it with the header line first if
    /// it does not exist yet.
    pub fn open_append(path: &Path) -> Result<Self> {
        let fresh = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        if fresh {
            writeln!(file, "{LOG_HEADER}").context("Failed to write log header")?;
            file.sync_data().context("Failed to sync log header")?;
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record line and fsync it.
    pub fn append(&mut self, id: WordId, word: &str, deleted: bool) -> Result<()> {
        let flag = u8::from(deleted);
        writeln!(self.file, "{id},{word},{flag}")
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.file
            .sync_data()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.file.sync_data();
    }
}

/// Write a fresh log of `count` distinct synthetic lowercase words.
///
/// Word lengths are drawn uniformly from `[min_len, max_len]`. A fixed seed
/// makes the corpus reproducible.
pub fn generate_log(
    path: &Path,
    count: usize,
    min_len: usize,
    max_len: usize,
    seed: Option<u64>,
) -> Result<()> {
    anyhow::ensure!(min_len >= 1, "minimum word length must be at least 1");
    anyhow::ensure!(min_len <= max_len, "inverted length range");

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .expect("static template")
            .progress_chars("=> "),
    );
    pb.set_message("Generating words");

    let mut seen: AHashSet<String> = AHashSet::with_capacity(count);
    let mut words: Vec<String> = Vec::with_capacity(count);
    while words.len() < count {
        let len = rng.gen_range(min_len..=max_len);
        let word: String = (0..len)
            .map(|_| (b'a' + rng.gen_range(0..26u8)) as char)
            .collect();
        if seen.insert(word.clone()) {
            words.push(word);
            pb.inc(1);
        }
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{LOG_HEADER}")?;
    for (id, word) in words.iter().enumerate() {
        writeln!(writer, "{id},{word},0")?;
    }
    writer.flush().context("Failed to flush generated log")?;
    pb.finish_and_clear();

    Ok(())
}
