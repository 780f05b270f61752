// src/output.rs
//! Output files: one record per community, the skip log, and the atomic write primitive.
//!
//! Every file is staged as `<file>.tmp` and renamed into place, so a reader (or a resumed run)
//! never observes a truncated file.

use crate::model::{ScoredRecord, SkipRecord};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RECORDS_DIR: &str = "records";
pub const SKIPPED_FILE: &str = "skipped.jsonl";
pub const METRICS_FILE: &str = "metrics.prom";

/// Write `bytes` to `path` via a staged `.tmp` sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// File-name-safe form of a community key. A key that had to be altered gets a short SHA-256
/// suffix of the original, so distinct keys never share a record file ("c++" vs "c__").
pub fn sanitize_id(id: &str) -> String {
    let s: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if s == id && !s.is_empty() {
        return s;
    }
    let digest = Sha256::digest(id.as_bytes());
    let mut out = s;
    out.push('~');
    for b in digest.iter().take(4) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub fn record_path(records_dir: &Path, community_id: &str) -> PathBuf {
    records_dir.join(format!("{}.jsonl", sanitize_id(community_id)))
}

pub fn write_record(records_dir: &Path, record: &ScoredRecord) -> Result<PathBuf> {
    let path = record_path(records_dir, &record.community_id);
    let mut line = serde_json::to_vec(record).context("serializing scored record")?;
    line.push(b'\n');
    write_atomic(&path, &line).with_context(|| format!("writing record {}", path.display()))?;
    debug!(target: "keywords::output", path = %path.display(), "record written");
    Ok(path)
}

/// First record line of `path`, if the file exists and parses.
pub fn read_record(path: &Path) -> Option<ScoredRecord> {
    let content = fs::read_to_string(path).ok()?;
    let line = content.lines().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

/// A community is done iff its record file holds a valid record with at least one keyword.
pub fn is_done(records_dir: &Path, community_id: &str) -> bool {
    read_record(&record_path(records_dir, community_id)).is_some_and(|r| !r.is_empty())
}

pub fn write_skipped(output_dir: &Path, skipped: &[SkipRecord]) -> Result<()> {
    let mut buf = Vec::new();
    for s in skipped {
        serde_json::to_writer(&mut buf, s).context("serializing skip record")?;
        buf.push(b'\n');
    }
    let path = output_dir.join(SKIPPED_FILE);
    write_atomic(&path, &buf).with_context(|| format!("writing {}", path.display()))
}

/// Record files of a directory, sorted by name. Staged `.tmp` leftovers are ignored.
pub fn list_records(records_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let entries = fs::read_dir(records_dir)
        .with_context(|| format!("listing records in {}", records_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "jsonl") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Keyword, Provenance, Source};

    fn record(id: &str, keywords: usize) -> ScoredRecord {
        let mut r = ScoredRecord {
            community_id: id.into(),
            name: id.into(),
            keywords: (0..keywords)
                .map(|i| Keyword {
                    term: format!("term{i}"),
                    weight: 0.0,
                    score: 1.0,
                    source: Provenance::single(Source::Description),
                    display: None,
                })
                .collect(),
            theme_summary: None,
        };
        r.renormalize();
        r
    }

    #[test]
    fn atomic_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!dir.path().join("nested").join("a.json.tmp").exists());
    }

    #[test]
    fn resume_requires_a_non_empty_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), &record("cars", 2)).unwrap();
        assert!(is_done(dir.path(), "cars"));

        write_record(dir.path(), &record("empty", 0)).unwrap();
        assert!(!is_done(dir.path(), "empty"));

        fs::write(record_path(dir.path(), "broken"), b"{\"community_id\":").unwrap();
        assert!(!is_done(dir.path(), "broken"));
        assert!(!is_done(dir.path(), "missing"));
    }

    #[test]
    fn ids_are_file_safe() {
        assert_eq!(sanitize_id("pastlives"), "pastlives");
        assert_eq!(sanitize_id("c__"), "c__");
        let plus = sanitize_id("c++");
        assert!(plus.starts_with("c__~") && plus.len() == "c__~".len() + 8, "{plus}");
        assert_ne!(sanitize_id("Cars"), sanitize_id("cars"));
        assert!(sanitize_id("").starts_with('~'));
        assert!(sanitize_id("Past.Lives/x")
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-~".contains(c)));
    }

    #[test]
    fn altered_keys_get_their_own_record_file() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), &record("c++", 2)).unwrap();
        write_record(dir.path(), &record("c__", 3)).unwrap();
        assert_ne!(record_path(dir.path(), "c++"), record_path(dir.path(), "c__"));
        let a = read_record(&record_path(dir.path(), "c++")).unwrap();
        let b = read_record(&record_path(dir.path(), "c__")).unwrap();
        assert_eq!(a.community_id, "c++");
        assert_eq!(b.community_id, "c__");
    }
}
