// src/text/ngrams.rs
//! Contiguous 1..=max_n grams over boundary-delimited runs of words.

use super::tokenizer::Piece;
use std::collections::{BTreeMap, BTreeSet};

/// All n-gram occurrences in document order (unigrams of a run first, then bigrams, ...).
/// No n-gram spans a `Piece::Boundary`.
pub fn extract_ngrams(pieces: &[Piece], max_n: usize) -> Vec<String> {
    let mut out = Vec::new();
    for run in pieces.split(|p| *p == Piece::Boundary) {
        let words: Vec<&str> = run.iter().filter_map(Piece::word).collect();
        for n in 1..=max_n.min(words.len()) {
            for window in words.windows(n) {
                out.push(window.join(" "));
            }
        }
    }
    out
}

/// Occurrence counts per n-gram.
pub fn ngram_counts(pieces: &[Piece], max_n: usize) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for g in extract_ngrams(pieces, max_n) {
        *counts.entry(g).or_insert(0) += 1;
    }
    counts
}

/// Distinct n-grams (document-frequency view).
pub fn ngram_set(pieces: &[Piece], max_n: usize) -> BTreeSet<String> {
    extract_ngrams(pieces, max_n).into_iter().collect()
}

/// Number of words in an n-gram key.
#[inline]
pub fn gram_len(gram: &str) -> usize {
    gram.split(' ').count()
}
