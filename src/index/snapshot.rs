//! Binary snapshot of the rebuildable indices.
//!
//! The snapshot lives next to the text log as `<log>.cache` and exists purely
//! to make cold starts fast: on load it replaces the prefix/suffix set build
//! (`LTC1`) or additionally the 2-gram and length index builds (`LTC2`). The
//! dictionary and the BK-tree are always rebuilt from the log.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic            4 bytes, "LTC1" | "LTC2"
//! prefix set       u32 count, then per string: u16 length + raw bytes
//! suffix set       same encoding
//! (LTC2) 2-grams   u32 gram count, per gram: u16 length + bytes,
//!                  u32 id count, u32 * count ids
//! (LTC2) lengths   u32 bucket count, per bucket: u16 length,
//!                  u32 id count, u32 * count ids
//! ```
//!
//! A snapshot is usable only when its mtime is strictly newer than the text
//! log's. Any structural mismatch makes the whole file unusable; the caller
//! falls back to a full rebuild.

use crate::dict::Interner;
use crate::index::bigram::BigramIndex;
use crate::index::bitset::IdBitSet;
use crate::index::build::Indexes;
use crate::index::length::LengthIndex;
use crate::index::ordered::{OrderedByteIndex, OrderedStrIndex};
use crate::index::types::{bytes_to_gram, gram_to_bytes};
use crate::utils::encoding::{write_u16_le, write_u32_le, ByteReader};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

const MAGIC_V1: &[u8; 4] = b"LTC1";
const MAGIC_V2: &[u8; 4] = b"LTC2";

/// Indices restored from a snapshot. `grams` is `None` for `LTC1` files.
pub struct SnapshotIndexes {
    pub prefix: OrderedStrIndex,
    pub suffix: OrderedByteIndex,
    pub grams: Option<(BigramIndex, LengthIndex)>,
}

/// Sibling cache path for a log file: `<log>.cache`.
pub fn snapshot_path(log_path: &Path) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(".cache");
    PathBuf::from(name)
}

fn write_str_set<W: Write>(writer: &mut W, set: &OrderedStrIndex) -> Result<()> {
    write_u32_le(writer, set.len() as u32)?;
    for word in set.iter() {
        let len = u16::try_from(word.len()).context("word too long for snapshot")?;
        write_u16_le(writer, len)?;
        writer.write_all(word.as_bytes())?;
    }
    Ok(())
}

fn write_byte_set<W: Write>(writer: &mut W, set: &OrderedByteIndex) -> Result<()> {
    write_u32_le(writer, set.len() as u32)?;
    for key in set.iter() {
        let len = u16::try_from(key.len()).context("key too long for snapshot")?;
        write_u16_le(writer, len)?;
        writer.write_all(key)?;
    }
    Ok(())
}

fn write_postings<W: Write>(writer: &mut W, ids: &IdBitSet) -> Result<()> {
    write_u32_le(writer, ids.len() as u32)?;
    for id in ids.iter() {
        write_u32_le(writer, id)?;
    }
    Ok(())
}

/// Write an `LTC2` snapshot of the four rebuildable indices.
pub fn save(path: &Path, indexes: &Indexes) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC_V2)?;
    write_str_set(&mut writer, &indexes.prefix)?;
    write_byte_set(&mut writer, &indexes.suffix)?;

    // Grams sorted for deterministic output.
    let mut grams: Vec<_> = indexes.bigrams.iter().collect();
    grams.sort_unstable_by_key(|(g, _)| *g);
    write_u32_le(&mut writer, grams.len() as u32)?;
    for (gram, ids) in grams {
        write_u16_le(&mut writer, 2)?;
        writer.write_all(&gram_to_bytes(gram))?;
        write_postings(&mut writer, ids)?;
    }

    let buckets: Vec<_> = indexes.lengths.iter().collect();
    write_u32_le(&mut writer, buckets.len() as u32)?;
    for (len, ids) in buckets {
        let len = u16::try_from(len).context("bucket length too large for snapshot")?;
        write_u16_le(&mut writer, len)?;
        write_postings(&mut writer, ids)?;
    }

    writer.flush().context("Failed to flush snapshot")?;
    Ok(())
}

fn read_str_set(reader: &mut ByteReader<'_>, interner: &mut Interner) -> Option<OrderedStrIndex> {
    let count = reader.read_u32_le()?;
    let mut set = OrderedStrIndex::new();
    for _ in 0..count {
        let len = reader.read_u16_le()? as usize;
        let bytes = reader.read_bytes(len)?;
        let word = std::str::from_utf8(bytes).ok()?;
        set.insert(interner.intern(word));
    }
    Some(set)
}

fn read_byte_set(reader: &mut ByteReader<'_>) -> Option<OrderedByteIndex> {
    let count = reader.read_u32_le()?;
    let mut set = OrderedByteIndex::new();
    for _ in 0..count {
        let len = reader.read_u16_le()? as usize;
        let bytes = reader.read_bytes(len)?;
        set.insert(Arc::from(bytes));
    }
    Some(set)
}

fn read_postings(reader: &mut ByteReader<'_>) -> Option<IdBitSet> {
    let count = reader.read_u32_le()?;
    let mut ids = IdBitSet::new();
    for _ in 0..count {
        ids.insert(reader.read_u32_le()?);
    }
    Some(ids)
}

fn parse(buf: &[u8], interner: &mut Interner) -> Option<SnapshotIndexes> {
    let mut reader = ByteReader::new(buf);
    let magic = reader.read_bytes(4)?;
    let v2 = match magic {
        m if m == MAGIC_V1 => false,
        m if m == MAGIC_V2 => true,
        _ => return None,
    };

    // Prefix entries are canonical surface words and go through the
    // interner; suffix entries are byte-reversed keys, not UTF-8.
    let prefix = read_str_set(&mut reader, interner)?;
    let suffix = read_byte_set(&mut reader)?;

    let grams = if v2 {
        let gram_count = reader.read_u32_le()?;
        let mut bigrams = BigramIndex::new();
        for _ in 0..gram_count {
            let len = reader.read_u16_le()? as usize;
            if len != 2 {
                return None;
            }
            let bytes = reader.read_bytes(2)?;
            let gram = bytes_to_gram(bytes[0], bytes[1]);
            bigrams.insert_posting(gram, read_postings(&mut reader)?);
        }

        let bucket_count = reader.read_u32_le()?;
        let mut lengths = LengthIndex::new();
        for _ in 0..bucket_count {
            let len = reader.read_u16_le()? as usize;
            lengths.insert_bucket(len, read_postings(&mut reader)?);
        }
        Some((bigrams, lengths))
    } else {
        None
    };

    if reader.remaining() != 0 {
        return None;
    }

    Some(SnapshotIndexes {
        prefix,
        suffix,
        grams,
    })
}

/// Try to load a snapshot. Returns `None` (after logging why) whenever the
/// file is absent, older than the log, or structurally unusable; the caller
/// then rebuilds from the text log.
pub fn load(path: &Path, log_mtime: SystemTime, interner: &mut Interner) -> Option<SnapshotIndexes> {
    let file = File::open(path).ok()?;

    let snap_mtime = file.metadata().ok()?.modified().ok()?;
    if snap_mtime <= log_mtime {
        eprintln!(
            "snapshot {} is not newer than the log, rebuilding",
            path.display()
        );
        return None;
    }

    // Safety: the mapping is read-only and private to this load.
    let mmap = unsafe { Mmap::map(&file) }.ok()?;
    match parse(&mmap, interner) {
        Some(snapshot) => Some(snapshot),
        None => {
            eprintln!("snapshot {} is unusable, rebuilding", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::{bulk_build, reversed};
    use crate::index::types::{word_grams, EngineConfig};
    use crate::store::RawRecord;
    use std::time::Duration;
    use tempfile::TempDir;

    fn build_sample() -> crate::index::build::BuildOutput {
        // "café" exercises the suffix set: its byte-reversed key is not UTF-8.
        let records: Vec<RawRecord> =
            ["apple", "applet", "banana", "cat", "cart", "ab", "a", "café"]
                .iter()
                .enumerate()
                .map(|(i, w)| RawRecord {
                    id: i as u32,
                    word: w.to_string(),
                    deleted: false,
                })
                .collect();
        bulk_build(&records, &EngineConfig::default(), None)
    }

    fn past() -> SystemTime {
        SystemTime::now() - Duration::from_secs(3600)
    }

    fn future() -> SystemTime {
        SystemTime::now() + Duration::from_secs(3600)
    }

    #[test]
    fn test_snapshot_path() {
        assert_eq!(
            snapshot_path(Path::new("/tmp/words.csv")),
            PathBuf::from("/tmp/words.csv.cache")
        );
    }

    #[test]
    fn test_roundtrip() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");

        save(&path, &out.indexes).unwrap();

        let mut interner = Interner::new();
        let snap = load(&path, past(), &mut interner).expect("snapshot should load");

        assert_eq!(
            snap.prefix.iter().collect::<Vec<_>>(),
            out.indexes.prefix.iter().collect::<Vec<_>>()
        );
        assert_eq!(
            snap.suffix.iter().collect::<Vec<_>>(),
            out.indexes.suffix.iter().collect::<Vec<_>>()
        );

        let (bigrams, lengths) = snap.grams.expect("LTC2 carries grams");
        assert_eq!(bigrams.gram_count(), out.indexes.bigrams.gram_count());
        for gram in word_grams(b"applet") {
            assert_eq!(
                bigrams.lookup(gram).unwrap().iter().collect::<Vec<_>>(),
                out.indexes.bigrams.lookup(gram).unwrap().iter().collect::<Vec<_>>()
            );
        }
        for (len, bucket) in out.indexes.lengths.iter() {
            assert_eq!(
                lengths.lookup(len).unwrap().iter().collect::<Vec<_>>(),
                bucket.iter().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_prefix_entries_are_interned() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");
        save(&path, &out.indexes).unwrap();

        let mut interner = Interner::new();
        let _snap = load(&path, past(), &mut interner).unwrap();
        assert_eq!(interner.len(), out.indexes.prefix.len());
    }

    #[test]
    fn test_stale_snapshot_rejected() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");
        save(&path, &out.indexes).unwrap();

        let mut interner = Interner::new();
        // Log claims to be newer than the snapshot.
        assert!(load(&path, future(), &mut interner).is_none());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");
        std::fs::write(&path, b"NOPE\x00\x00\x00\x00").unwrap();

        let mut interner = Interner::new();
        assert!(load(&path, past(), &mut interner).is_none());
    }

    #[test]
    fn test_truncated_snapshot_rejected() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");
        save(&path, &out.indexes).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let mut interner = Interner::new();
        assert!(load(&path, past(), &mut interner).is_none());
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");
        save(&path, &out.indexes).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(b"junk");
        std::fs::write(&path, &bytes).unwrap();

        let mut interner = Interner::new();
        assert!(load(&path, past(), &mut interner).is_none());
    }

    #[test]
    fn test_v1_snapshot_loads_sets_only() {
        let out = build_sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.csv.cache");

        // Hand-encode an LTC1 file: magic + the two sets.
        let mut buf: Vec<u8> = Vec::new();
        buf.extend_from_slice(MAGIC_V1);
        write_u32_le(&mut buf, out.indexes.prefix.len() as u32).unwrap();
        for word in out.indexes.prefix.iter() {
            write_u16_le(&mut buf, word.len() as u16).unwrap();
            buf.extend_from_slice(word.as_bytes());
        }
        write_u32_le(&mut buf, out.indexes.suffix.len() as u32).unwrap();
        for key in out.indexes.suffix.iter() {
            write_u16_le(&mut buf, key.len() as u16).unwrap();
            buf.extend_from_slice(key);
        }
        std::fs::write(&path, &buf).unwrap();

        let mut interner = Interner::new();
        let snap = load(&path, past(), &mut interner).expect("v1 snapshot should load");
        assert!(snap.grams.is_none());
        assert!(snap.prefix.contains("apple"));
        assert!(snap.suffix.contains(&reversed("banana")));
    }
}
