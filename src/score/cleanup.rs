// src/score/cleanup.rs
//! Rule-based cleanup of a scored record.
//!
//! Runs on a canonically sorted copy of the keywords, so the result does not depend on the
//! incoming order (and therefore not on whether rerank ran before it).
//! Near-duplicates keep the best-ranked variant's text and the highest score, and union their
//! provenance.

use crate::config::CleanupConfig;
use crate::model::{sort_keywords, Keyword, ScoredRecord};
use crate::text::{alnum_key, has_non_latin, non_ascii_ratio};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use strsim::normalized_levenshtein;

const URLISH: &[&str] = &["http", "https", "www", "com", "amp", "nbsp"];
const MAX_TOKEN_CHARS: usize = 30;

static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{5,}").expect("digit regex"));

/// "big big problem" -> "big problem" (case-insensitive on adjacent words).
pub fn collapse_repeats(s: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for w in s.split_whitespace() {
        if out.last().is_some_and(|prev| prev.eq_ignore_ascii_case(w)) {
            continue;
        }
        out.push(w);
    }
    out.join(" ")
}

pub fn is_technical(term: &str) -> bool {
    term.split(|c: char| c.is_whitespace() || c == '.' || c == '/')
        .any(|tok| URLISH.contains(&tok) || tok.chars().count() > MAX_TOKEN_CHARS)
        || RE_DIGIT_RUN.is_match(term)
}

fn absorb(into: &mut Keyword, other: &Keyword) {
    into.score = into.score.max(other.score);
    into.source.merge(&other.source);
    if into.display.is_none() {
        into.display = other.display.clone();
    }
}

pub struct Cleanup<'a> {
    cfg: &'a CleanupConfig,
}

impl<'a> Cleanup<'a> {
    pub fn new(cfg: &'a CleanupConfig) -> Self {
        Self { cfg }
    }

    fn drop_term(&self, term: &str) -> bool {
        if self.cfg.drop_non_latin
            && (has_non_latin(term) || non_ascii_ratio(term) > self.cfg.max_non_ascii_ratio)
        {
            return true;
        }
        self.cfg.drop_technical && is_technical(term)
    }

    pub fn apply(&self, record: ScoredRecord) -> ScoredRecord {
        let mut out = record;
        let mut keywords = std::mem::take(&mut out.keywords);
        sort_keywords(&mut keywords);

        if self.cfg.collapse_repeats {
            for k in keywords.iter_mut() {
                k.term = collapse_repeats(&k.term);
                k.display = k.display.as_deref().map(collapse_repeats);
            }
        }

        keywords.retain(|k| !k.term.is_empty() && !self.drop_term(&k.term));

        // exact alnum-key duplicates; first seen is the best-ranked
        let mut kept: Vec<Keyword> = Vec::with_capacity(keywords.len());
        let mut by_key: BTreeMap<String, usize> = BTreeMap::new();
        for k in keywords {
            let key = if self.cfg.merge_near_duplicates {
                alnum_key(&k.term)
            } else {
                k.term.clone()
            };
            match by_key.get(&key) {
                Some(&idx) => absorb(&mut kept[idx], &k),
                None => {
                    by_key.insert(key, kept.len());
                    kept.push(k);
                }
            }
        }

        if let Some(threshold) = self.cfg.fuzzy_similarity {
            kept = fuzzy_merge(kept, threshold);
        }

        out.keywords = kept;
        out.renormalize();
        out
    }
}

/// Merge terms with equal word counts whose alnum keys are at least `threshold` similar.
fn fuzzy_merge(keywords: Vec<Keyword>, threshold: f64) -> Vec<Keyword> {
    let mut kept: Vec<(Keyword, String, usize)> = Vec::with_capacity(keywords.len());
    for k in keywords {
        let key = alnum_key(&k.term);
        let words = k.term.split_whitespace().count();
        let hit = kept.iter().position(|(_, other_key, other_words)| {
            *other_words == words && normalized_levenshtein(&key, other_key) >= threshold
        });
        match hit {
            Some(i) => absorb(&mut kept[i].0, &k),
            None => kept.push((k, key, words)),
        }
    }
    kept.into_iter().map(|(k, _, _)| k).collect()
}
