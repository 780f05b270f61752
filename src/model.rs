// src/model.rs
//! Core records: communities and posts coming in, scored terms and records going out.
//!
//! Input records are immutable for one scoring run. A `ScoredRecord` is produced once per
//! community and only touched again by the optional post-processing stages (rerank, cleanup),
//! each of which returns a fresh record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One community, after validation and key canonicalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Canonical key (lowercase, no `r/` prefix, no whitespace).
    pub id: String,
    /// Display name as delivered by the source (falls back to the raw name).
    pub display_name: String,
    /// Raw name string, e.g. "AlcoholLiverSupport".
    pub name: String,
    pub description: String,
    /// Opaque to scoring; carried through for downstream consumers.
    #[serde(default)]
    pub subscribers: Option<u64>,
}

/// One post title with its engagement signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub score: i64,
    pub comment_count: u64,
    pub created_at: Option<DateTime<Utc>>,
}

/// All posts of one community plus the optional anchor title hint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostBundle {
    pub community_id: String,
    /// Display title distinct from the canonical token, e.g. "Mazda CX-5".
    #[serde(default)]
    pub anchor_title: Option<String>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Where a term's score came from.
///
/// Declaration order is the tie-break priority: name > description > posts_composed > posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Name,
    Description,
    PostsComposed,
    Posts,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Name => "name",
            Source::Description => "description",
            Source::PostsComposed => "posts_composed",
            Source::Posts => "posts",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "name" => Some(Source::Name),
            "description" => Some(Source::Description),
            "posts_composed" => Some(Source::PostsComposed),
            "posts" => Some(Source::Posts),
            _ => None,
        }
    }

    /// Sources that only reflect post activity (targets of the theme penalty).
    pub fn is_posts_derived(&self) -> bool {
        matches!(self, Source::Posts | Source::PostsComposed)
    }
}

/// Sorted, de-duplicated set of contributing sources. Serialised as `"name+description"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Provenance(Vec<Source>);

impl Provenance {
    pub fn single(source: Source) -> Self {
        Self(vec![source])
    }

    pub fn insert(&mut self, source: Source) {
        if let Err(pos) = self.0.binary_search(&source) {
            self.0.insert(pos, source);
        }
    }

    pub fn merge(&mut self, other: &Provenance) {
        for s in &other.0 {
            self.insert(*s);
        }
    }

    pub fn contains(&self, source: Source) -> bool {
        self.0.binary_search(&source).is_ok()
    }

    /// Highest-priority source (smallest in declaration order).
    pub fn primary(&self) -> Option<Source> {
        self.0.first().copied()
    }

    pub fn sources(&self) -> &[Source] {
        &self.0
    }

    /// True when every contributing source is posts-derived.
    pub fn posts_only(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Source::is_posts_derived)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(Source::as_str).collect();
        f.write_str(&parts.join("+"))
    }
}

impl Serialize for Provenance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Provenance {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut out = Provenance::default();
        for part in raw.split('+') {
            let src = Source::parse(part)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown source `{part}`")))?;
            out.insert(src);
        }
        Ok(out)
    }
}

/// A candidate keyword before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Normalised, lowercase text (words separated by single spaces).
    pub text: String,
    pub word_count: usize,
    pub source: Source,
    /// Raw, non-negative score on the source's own scale.
    pub score: f64,
    /// Optional display-cased rendering ("Alcohol Liver Support").
    pub display: Option<String>,
}

impl Term {
    pub fn new(text: impl Into<String>, source: Source, score: f64) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self {
            text,
            word_count,
            source,
            score: score.max(0.0),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// One emitted keyword of a `ScoredRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    /// Normalised weight; weights of a non-empty record sum to 1.0.
    pub weight: f64,
    /// Merged score the weight was derived from.
    pub score: f64,
    pub source: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Per-community output record (one JSON line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub community_id: String,
    pub name: String,
    pub keywords: Vec<Keyword>,
    /// Theme text (whole name phrase + top description terms); the rerank-only mode reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_summary: Option<String>,
}

impl ScoredRecord {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn weight_sum(&self) -> f64 {
        self.keywords.iter().map(|k| k.weight).sum()
    }

    /// Re-sort by score and recompute weights so they sum to 1.0.
    ///
    /// Ordering: score desc, primary source priority, then term text. An all-zero record gets
    /// uniform weights.
    pub fn renormalize(&mut self) {
        sort_keywords(&mut self.keywords);
        let total: f64 = self.keywords.iter().map(|k| k.score.max(0.0)).sum();
        let n = self.keywords.len();
        for k in self.keywords.iter_mut() {
            k.score = k.score.max(0.0);
            k.weight = if total > 0.0 {
                k.score / total
            } else {
                1.0 / n as f64
            };
        }
    }
}

/// Deterministic keyword ordering shared by every stage.
pub fn sort_keywords(keywords: &mut [Keyword]) {
    keywords.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.primary().cmp(&b.source.primary()))
            .then_with(|| a.term.cmp(&b.term))
    });
}

/// A record that was dropped during ingestion, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// "community" or "post".
    pub kind: String,
    /// Canonical key if one could be derived, otherwise a positional hint.
    pub key: String,
    pub reason: String,
}

impl SkipRecord {
    pub fn community(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: "community".into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn post(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: "post".into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_serializes_in_priority_order() {
        let mut p = Provenance::single(Source::Posts);
        p.insert(Source::Name);
        p.insert(Source::Posts);
        assert_eq!(p.to_string(), "name+posts");
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"name+posts\"");

        let back: Provenance = serde_json::from_str("\"posts+description\"").unwrap();
        assert_eq!(back.primary(), Some(Source::Description));
        assert!(!back.posts_only());
    }

    #[test]
    fn renormalize_sums_to_one_and_orders_ties() {
        let mut rec = ScoredRecord {
            community_id: "x".into(),
            name: "x".into(),
            keywords: vec![
                Keyword {
                    term: "b".into(),
                    weight: 0.0,
                    score: 2.0,
                    source: Provenance::single(Source::Posts),
                    display: None,
                },
                Keyword {
                    term: "a".into(),
                    weight: 0.0,
                    score: 2.0,
                    source: Provenance::single(Source::Name),
                    display: None,
                },
                Keyword {
                    term: "c".into(),
                    weight: 0.0,
                    score: 1.0,
                    source: Provenance::single(Source::Description),
                    display: None,
                },
            ],
            theme_summary: None,
        };
        rec.renormalize();
        assert!((rec.weight_sum() - 1.0).abs() < 1e-9);
        assert_eq!(rec.keywords[0].term, "a");
        assert_eq!(rec.keywords[1].term, "b");
        assert!((rec.keywords[2].weight - 0.2).abs() < 1e-9);
    }

    #[test]
    fn all_zero_record_gets_uniform_weights() {
        let mut rec = ScoredRecord {
            community_id: "x".into(),
            name: "x".into(),
            keywords: vec![
                Keyword {
                    term: "a".into(),
                    weight: 0.0,
                    score: 0.0,
                    source: Provenance::single(Source::Posts),
                    display: None,
                },
                Keyword {
                    term: "b".into(),
                    weight: 0.0,
                    score: 0.0,
                    source: Provenance::single(Source::Posts),
                    display: None,
                },
            ],
            theme_summary: None,
        };
        rec.renormalize();
        assert!((rec.keywords[0].weight - 0.5).abs() < 1e-12);
    }
}
