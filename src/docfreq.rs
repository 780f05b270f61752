// src/docfreq.rs
//! Corpus-wide document frequency tables.
//!
//! A `DocFreqTable` is immutable once built. `extend` returns a new table with a bumped version
//! and refuses documents whose key is already counted, so nothing is ever double-counted.
//! Tables carry a SHA-256 hash of the `allowed_keys` subset they were built for; loading a cache
//! built for a different subset fails with `DocFreqError::SubsetMismatch`.

use crate::output::write_atomic;
use crate::text::{ngram_set, TextKind, Tokenizer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// On-disk format revision.
pub const CACHE_FORMAT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corpus {
    Descriptions,
    Posts,
}

impl Corpus {
    pub fn cache_file_name(&self) -> &'static str {
        match self {
            Corpus::Descriptions => "df_descriptions.json",
            Corpus::Posts => "df_posts.json",
        }
    }

    pub fn text_kind(&self) -> TextKind {
        match self {
            Corpus::Descriptions => TextKind::Description,
            Corpus::Posts => TextKind::PostTitle,
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Corpus::Descriptions => "descriptions",
            Corpus::Posts => "posts",
        })
    }
}

#[derive(Debug, Error)]
pub enum DocFreqError {
    #[error("{corpus} cache was built for a different document subset (cached {cached:?}, current {current:?})")]
    SubsetMismatch {
        corpus: Corpus,
        cached: Option<String>,
        current: Option<String>,
    },
    #[error("extension overlaps {count} already-counted document(s), first `{first}`")]
    Overlap { count: usize, first: String },
    #[error("cache holds a {found} table, expected {expected}")]
    CorpusMismatch { expected: Corpus, found: Corpus },
    #[error("unsupported cache format {0}")]
    FormatVersion(u32),
    #[error("cache I/O at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache decode at {}: {source}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A tokenized document: its canonical key and the distinct n-grams it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub key: String,
    pub grams: BTreeSet<String>,
}

impl Document {
    /// Tokenize every text of one document and collect its distinct n-grams.
    pub fn from_texts<'a, I>(key: impl Into<String>, texts: I, tokenizer: &Tokenizer, kind: TextKind) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max_n = tokenizer.config().max_ngram;
        let mut grams = BTreeSet::new();
        for t in texts {
            grams.extend(ngram_set(&tokenizer.tokenize(t, kind), max_n));
        }
        Self {
            key: key.into(),
            grams,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocFreqTable {
    format: u32,
    corpus: Corpus,
    version: u32,
    subset_hash: Option<String>,
    doc_keys: BTreeSet<String>,
    counts: BTreeMap<String, u32>,
}

/// SHA-256 over the sorted key set (one key per line), hex encoded. `None` = unrestricted.
pub fn subset_hash(allowed: Option<&BTreeSet<String>>) -> Option<String> {
    let keys = allowed?;
    let mut hasher = Sha256::new();
    for k in keys {
        hasher.update(k.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Some(out)
}

/// Group documents by key (union of grams), dropping keys outside `allowed`.
fn group_documents<'a, I>(docs: I, allowed: Option<&BTreeSet<String>>) -> BTreeMap<String, BTreeSet<&'a str>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut grouped: BTreeMap<String, BTreeSet<&'a str>> = BTreeMap::new();
    for d in docs {
        if allowed.is_some_and(|a| !a.contains(&d.key)) {
            continue;
        }
        grouped
            .entry(d.key.clone())
            .or_default()
            .extend(d.grams.iter().map(String::as_str));
    }
    grouped
}

impl DocFreqTable {
    /// Count, for every n-gram, the number of distinct document keys containing it.
    pub fn build<'a, I>(corpus: Corpus, docs: I, allowed: Option<&BTreeSet<String>>) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let grouped = group_documents(docs, allowed);
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for grams in grouped.values() {
            for g in grams {
                *counts.entry((*g).to_string()).or_insert(0) += 1;
            }
        }
        let table = Self {
            format: CACHE_FORMAT,
            corpus,
            version: 1,
            subset_hash: subset_hash(allowed),
            doc_keys: grouped.into_keys().collect(),
            counts,
        };
        info!(
            target: "keywords::docfreq",
            corpus = %corpus,
            docs = table.n_docs(),
            grams = table.n_grams(),
            "built document-frequency table"
        );
        table
    }

    /// New table counting `docs` on top of this one. Fails if any document key was already
    /// counted. The result carries the subset hash of `allowed`.
    pub fn extend<'a, I>(&self, docs: I, allowed: Option<&BTreeSet<String>>) -> Result<Self, DocFreqError>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let grouped = group_documents(docs, allowed);
        let overlapping: Vec<&String> = grouped
            .keys()
            .filter(|k| self.doc_keys.contains(*k))
            .collect();
        if let Some(first) = overlapping.first() {
            return Err(DocFreqError::Overlap {
                count: overlapping.len(),
                first: (*first).clone(),
            });
        }

        let mut next = self.clone();
        for (key, grams) in grouped {
            for g in grams {
                *next.counts.entry(g.to_string()).or_insert(0) += 1;
            }
            next.doc_keys.insert(key);
        }
        next.version = self.version + 1;
        next.subset_hash = subset_hash(allowed);
        debug!(
            target: "keywords::docfreq",
            corpus = %self.corpus,
            version = next.version,
            added = next.n_docs() - self.n_docs(),
            "extended document-frequency table"
        );
        Ok(next)
    }

    pub fn corpus(&self) -> Corpus {
        self.corpus
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn subset(&self) -> Option<&str> {
        self.subset_hash.as_deref()
    }

    pub fn doc_keys(&self) -> &BTreeSet<String> {
        &self.doc_keys
    }

    pub fn n_docs(&self) -> usize {
        self.doc_keys.len()
    }

    pub fn n_grams(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn df(&self, gram: &str) -> u32 {
        self.counts.get(gram).copied().unwrap_or(0)
    }

    /// `df / N`, or 0.0 for an empty table.
    pub fn df_ratio(&self, gram: &str) -> f64 {
        let n = self.n_docs();
        if n == 0 {
            0.0
        } else {
            self.df(gram) as f64 / n as f64
        }
    }

    /// Smoothed IDF: `ln((N+1)/(df+1)) + 1`.
    pub fn idf(&self, gram: &str) -> f64 {
        let n = self.n_docs() as f64;
        let df = self.df(gram) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// Damped IDF: `idf ^ power`, `power` in [0,1].
    pub fn idf_damped(&self, gram: &str, power: f64) -> f64 {
        self.idf(gram).max(0.0).powf(power.clamp(0.0, 1.0))
    }

    /// True when both tables hold identical counts over identical document keys.
    pub fn same_counts(&self, other: &DocFreqTable) -> bool {
        self.doc_keys == other.doc_keys && self.counts == other.counts
    }

    /// Persist atomically (staged `.tmp` file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), DocFreqError> {
        let bytes = serde_json::to_vec(self).map_err(|source| DocFreqError::Serde {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes).map_err(|source| DocFreqError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load without subset validation (for inspection and extension).
    pub fn load_unchecked(path: &Path, corpus: Corpus) -> Result<Self, DocFreqError> {
        let bytes = std::fs::read(path).map_err(|source| DocFreqError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: DocFreqTable =
            serde_json::from_slice(&bytes).map_err(|source| DocFreqError::Serde {
                path: path.to_path_buf(),
                source,
            })?;
        if table.format != CACHE_FORMAT {
            return Err(DocFreqError::FormatVersion(table.format));
        }
        if table.corpus != corpus {
            return Err(DocFreqError::CorpusMismatch {
                expected: corpus,
                found: table.corpus,
            });
        }
        Ok(table)
    }

    /// Load and verify that the cache was built for exactly the `allowed` subset.
    pub fn load(path: &Path, corpus: Corpus, allowed: Option<&BTreeSet<String>>) -> Result<Self, DocFreqError> {
        let table = Self::load_unchecked(path, corpus)?;
        let current = subset_hash(allowed);
        if table.subset_hash != current {
            return Err(DocFreqError::SubsetMismatch {
                corpus,
                cached: table.subset_hash,
                current,
            });
        }
        Ok(table)
    }

    /// Load a cache and extend it with the documents it has not counted yet.
    ///
    /// Every cached key must still belong to `allowed` (counts cannot be subtracted); otherwise
    /// the cache is rejected with `SubsetMismatch`.
    pub fn load_and_extend<'a, I>(
        path: &Path,
        corpus: Corpus,
        docs: I,
        allowed: Option<&BTreeSet<String>>,
    ) -> Result<Self, DocFreqError>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let cached = Self::load_unchecked(path, corpus)?;
        if let Some(a) = allowed {
            if !cached.doc_keys.is_subset(a) {
                return Err(DocFreqError::SubsetMismatch {
                    corpus,
                    cached: cached.subset_hash,
                    current: subset_hash(allowed),
                });
            }
        }
        let fresh: Vec<&Document> = docs
            .into_iter()
            .filter(|d| !cached.doc_keys.contains(&d.key))
            .collect();
        cached.extend(fresh, allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(key: &str, grams: &[&str]) -> Document {
        Document {
            key: key.into(),
            grams: grams.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn keys(ks: &[&str]) -> BTreeSet<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn counts_distinct_documents_by_key() {
        let docs = vec![
            doc("a", &["cars", "electric cars"]),
            doc("b", &["cars"]),
            doc("a", &["cars", "battery"]),
        ];
        let t = DocFreqTable::build(Corpus::Descriptions, &docs, None);
        assert_eq!(t.n_docs(), 2);
        assert_eq!(t.df("cars"), 2, "repeated key must not double count");
        assert_eq!(t.df("battery"), 1);
        assert_eq!(t.df("missing"), 0);
    }

    #[test]
    fn allowed_keys_restrict_counting() {
        let docs = vec![doc("a", &["x"]), doc("b", &["x"]), doc("c", &["x"])];
        let allowed = keys(&["a", "c"]);
        let t = DocFreqTable::build(Corpus::Descriptions, &docs, Some(&allowed));
        assert_eq!(t.df("x"), 2);
        assert_eq!(t.subset(), subset_hash(Some(&allowed)).as_deref());
    }

    #[test]
    fn idf_formula_and_damping() {
        let docs = vec![doc("a", &["x"]), doc("b", &["y"]), doc("c", &["x"])];
        let t = DocFreqTable::build(Corpus::Posts, &docs, None);
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((t.idf("x") - expected).abs() < 1e-12);
        assert!((t.idf_damped("x", 0.5) - expected.sqrt()).abs() < 1e-12);
        assert!((t.idf_damped("x", 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn extension_refuses_overlap() {
        let t = DocFreqTable::build(Corpus::Posts, &[doc("a", &["x"])], None);
        let err = t.extend(&[doc("a", &["y"]), doc("b", &["y"])], None).unwrap_err();
        assert!(matches!(err, DocFreqError::Overlap { count: 1, .. }));
    }

    #[test]
    fn extension_matches_scratch_build() {
        let first = vec![doc("a", &["x", "y"]), doc("b", &["y"])];
        let second = vec![doc("c", &["x", "z"]), doc("d", &["y", "z"])];
        let base = DocFreqTable::build(Corpus::Posts, &first, None);
        let extended = base.extend(&second, None).unwrap();
        let all: Vec<Document> = first.iter().chain(second.iter()).cloned().collect();
        let scratch = DocFreqTable::build(Corpus::Posts, &all, None);
        assert!(extended.same_counts(&scratch));
        assert_eq!(extended.version(), 2);
        assert_eq!(base.version(), 1, "extension leaves the original untouched");
    }

    #[test]
    fn cache_roundtrip_rejects_subset_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Corpus::Descriptions.cache_file_name());
        let allowed = keys(&["a"]);
        let t = DocFreqTable::build(Corpus::Descriptions, &[doc("a", &["x"])], Some(&allowed));
        t.save(&path).unwrap();

        let back = DocFreqTable::load(&path, Corpus::Descriptions, Some(&allowed)).unwrap();
        assert_eq!(back, t);

        let other = keys(&["a", "b"]);
        let err = DocFreqTable::load(&path, Corpus::Descriptions, Some(&other)).unwrap_err();
        assert!(matches!(err, DocFreqError::SubsetMismatch { .. }));

        let err = DocFreqTable::load(&path, Corpus::Posts, Some(&allowed)).unwrap_err();
        assert!(matches!(err, DocFreqError::CorpusMismatch { .. }));
    }

    #[test]
    fn load_and_extend_adds_only_new_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("df.json");
        let t = DocFreqTable::build(Corpus::Posts, &[doc("a", &["x"])], None);
        t.save(&path).unwrap();

        let docs = vec![doc("a", &["x"]), doc("b", &["x"])];
        let ext = DocFreqTable::load_and_extend(&path, Corpus::Posts, &docs, None).unwrap();
        assert_eq!(ext.df("x"), 2);
        assert_eq!(ext.version(), 2);

        let narrow = keys(&["b"]);
        let err = DocFreqTable::load_and_extend(&path, Corpus::Posts, &docs, Some(&narrow)).unwrap_err();
        assert!(matches!(err, DocFreqError::SubsetMismatch { .. }));
    }
}
