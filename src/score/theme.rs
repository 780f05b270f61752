// src/score/theme.rs
//! Community theme: the whole name phrase plus the top description terms.

use super::name::WholeName;
use crate::model::Term;
use crate::text::equivalence_words;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    /// Human-readable theme text, also the rerank reference ("Alcohol Liver Support, support group").
    pub summary: String,
    /// Singularised tokens of every theme phrase.
    pub tokens: BTreeSet<String>,
}

impl Theme {
    /// `description_terms` must already be ranked (score desc).
    pub fn build(whole: &WholeName, description_terms: &[Term], top_k: usize) -> Self {
        let mut phrases: Vec<&str> = Vec::new();
        if !whole.is_empty() {
            phrases.push(whole.display.as_str());
        }
        for t in description_terms.iter().take(top_k) {
            if !phrases.iter().any(|p| p.eq_ignore_ascii_case(&t.text)) {
                phrases.push(t.text.as_str());
            }
        }
        let tokens = phrases.iter().flat_map(|p| equivalence_words(p)).collect();
        Self {
            summary: phrases.join(", "),
            tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when the phrase shares at least one normalised token with the theme.
    pub fn overlaps(&self, phrase: &str) -> bool {
        equivalence_words(phrase)
            .iter()
            .any(|w| self.tokens.contains(w))
    }

    /// Share of the phrase's tokens found in the theme, in [0,1].
    pub fn similarity(&self, phrase: &str) -> f64 {
        let words = equivalence_words(phrase);
        if words.is_empty() {
            return 0.0;
        }
        let hits = words.iter().filter(|w| self.tokens.contains(*w)).count();
        hits as f64 / words.len() as f64
    }
}
