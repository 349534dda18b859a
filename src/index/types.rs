use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Unique identifier for a word in the dictionary
pub type WordId = u32;

/// A 2-gram is a 2-byte sequence stored as u16
pub type Gram = u16;

/// Convert 2 bytes to a gram
#[inline]
pub fn bytes_to_gram(b0: u8, b1: u8) -> Gram {
    ((b0 as u16) << 8) | (b1 as u16)
}

/// Convert a gram back to bytes
#[inline]
pub fn gram_to_bytes(g: Gram) -> [u8; 2] {
    [(g >> 8) as u8, (g & 0xFF) as u8]
}

/// Extract the set of unique 2-grams of a word.
///
/// Words shorter than 2 bytes contribute nothing. Duplicate grams within the
/// same word are counted once. The result is sorted.
pub fn word_grams(word: &[u8]) -> Vec<Gram> {
    if word.len() < 2 {
        return Vec::new();
    }

    let mut grams: Vec<Gram> = word
        .windows(2)
        .map(|w| bytes_to_gram(w[0], w[1]))
        .collect();
    grams.sort_unstable();
    grams.dedup();
    grams
}

/// Configuration for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default similarity cutoff when `sim` is given no distance
    #[serde(default = "default_sim_distance")]
    pub default_sim_distance: u32,
    /// Hard cap on similarity cutoffs; larger requests are clamped
    #[serde(default = "default_max_distance")]
    pub max_distance: u32,
    /// BK-tree bulk-insert batch size (checkpoint granularity)
    #[serde(default = "default_bktree_batch")]
    pub bktree_batch: usize,
    /// Records per worker chunk in the parallel build phases
    #[serde(default = "default_build_chunk")]
    pub build_chunk: usize,
    /// Per-query timeout in milliseconds, honored best-effort
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Whether to read/write the binary snapshot next to the text log
    #[serde(default = "default_use_snapshot")]
    pub use_snapshot: bool,
    /// Capacity of the similarity-result cache
    #[serde(default = "default_sim_cache_size")]
    pub sim_cache_size: usize,
}

fn default_sim_distance() -> u32 {
    2
}

fn default_max_distance() -> u32 {
    10
}

fn default_bktree_batch() -> usize {
    1000
}

fn default_build_chunk() -> usize {
    8192
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_use_snapshot() -> bool {
    true
}

fn default_sim_cache_size() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_sim_distance: default_sim_distance(),
            max_distance: default_max_distance(),
            bktree_batch: default_bktree_batch(),
            build_chunk: default_build_chunk(),
            query_timeout_ms: default_query_timeout_ms(),
            use_snapshot: default_use_snapshot(),
            sim_cache_size: default_sim_cache_size(),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gram_roundtrip() {
        let g = bytes_to_gram(b'a', b'z');
        assert_eq!(gram_to_bytes(g), [b'a', b'z']);
    }

    #[test]
    fn test_word_grams_short_words() {
        assert!(word_grams(b"").is_empty());
        assert!(word_grams(b"a").is_empty());
        assert_eq!(word_grams(b"ab").len(), 1);
    }

    #[test]
    fn test_word_grams_dedup() {
        // "aaa" has "aa" twice; counted once.
        assert_eq!(word_grams(b"aaa"), vec![bytes_to_gram(b'a', b'a')]);
        // "banana": ba, an, na, an, na -> 3 unique
        assert_eq!(word_grams(b"banana").len(), 3);
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_sim_distance, 2);
        assert_eq!(config.max_distance, 10);
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
    }
}
