// src/score/compose.rs
//! Theme-anchored composite phrases: `"<anchor> <seed>"`.
//!
//! The anchor is the post source's display title when present ("Mazda CX-5"), otherwise the
//! community name. Seeds are strong multi-word post phrases. A composite is scored on the seed's
//! own TF-IDF scale:
//!
//! factor    = multiplier * clamp((1-alpha) + alpha * idf_eff(anchor), floor, cap)
//! composite = min(seed * factor, seed * max_ratio)
//!
//! Seeds lexically equivalent to the anchor ("past life" vs "Past Lives"), containing it, or
//! made of its own tokenized words ("mazda cx") are never composed.

use super::theme::Theme;
use super::tfidf::LocalTf;
use crate::config::{ComposeConfig, SeedSignal};
use crate::docfreq::DocFreqTable;
use crate::model::{Source, Term};
use crate::text::{equivalence_words, normalize_phrase, TextKind, Tokenizer};
use std::cmp::Ordering;
use tracing::debug;

/// Anchor phrases longer than this use their rarest token for the IDF lookup.
const MAX_ANCHOR_GRAM: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Normalised phrase ("mazda cx-5").
    pub text: String,
    /// Original casing ("Mazda CX-5").
    pub display: String,
    /// Tokenized words used for the corpus IDF lookup.
    words: Vec<String>,
}

impl Anchor {
    /// Prefer the post source's anchor title, else the community name.
    pub fn resolve(anchor_title: Option<&str>, name: &str, tokenizer: &Tokenizer) -> Option<Self> {
        let raw = anchor_title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| tokenizer.cased_words(name, TextKind::Name).join(" "));
        let text = normalize_phrase(&raw);
        if text.is_empty() {
            return None;
        }
        let display = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        Some(Self {
            words: tokenizer.words(&raw, TextKind::Name),
            text,
            display,
        })
    }

    /// Damped corpus IDF of the anchor phrase (or of its rarest token when it is long).
    pub fn idf_eff(&self, table: &DocFreqTable, power: f64) -> f64 {
        if self.words.is_empty() {
            return 1.0;
        }
        if self.words.len() <= MAX_ANCHOR_GRAM {
            return table.idf_damped(&self.words.join(" "), power);
        }
        self.words
            .iter()
            .map(|w| table.idf_damped(w, power))
            .fold(f64::MIN, f64::max)
    }

    /// Seed rejected for self-duplication: equivalent to the anchor, containing it, lying
    /// inside it, or opening with its trailing words. Checked against both the normalised
    /// anchor and its tokenized form ("mazda cx-5" and "mazda cx").
    pub fn conflicts_with(&self, seed: &str) -> bool {
        let seed = equivalence_words(seed);
        if seed.is_empty() {
            return false;
        }
        [
            equivalence_words(&self.text),
            equivalence_words(&self.words.join(" ")),
        ]
        .iter()
        .filter(|anchor| !anchor.is_empty())
        .any(|anchor| overlaps_anchor(anchor, &seed))
    }
}

fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn overlaps_anchor(anchor: &[String], seed: &[String]) -> bool {
    if contains_run(seed, anchor) || contains_run(anchor, seed) {
        return true;
    }
    // "mazda cx-5" + "cx winter tires" would stutter
    (1..anchor.len().min(seed.len()))
        .any(|k| anchor[anchor.len() - k..] == seed[..k])
}

/// `multiplier * clamp((1-alpha) + alpha * idf_eff, floor, cap)`.
pub fn anchor_factor(cfg: &ComposeConfig, idf_eff: f64) -> f64 {
    let raw = (1.0 - cfg.anchor_alpha) + cfg.anchor_alpha * idf_eff;
    cfg.anchor_multiplier * raw.clamp(cfg.anchor_floor, cfg.anchor_cap)
}

pub struct ComposeInput<'a> {
    pub anchor: &'a Anchor,
    /// Ranked posts TF-IDF terms of the community.
    pub posts_terms: &'a [Term],
    pub local_tf: &'a LocalTf,
    pub theme: &'a Theme,
    pub posts_table: &'a DocFreqTable,
    pub posts_power: f64,
}

fn seed_signal(cfg: &ComposeConfig, input: &ComposeInput<'_>, seed: &Term) -> f64 {
    match cfg.seed_signal {
        SeedSignal::LocalTf => input.local_tf.get(&seed.text).copied().unwrap_or(0.0),
        SeedSignal::Tfidf => seed.score,
        SeedSignal::ThemeBlend => {
            let w = cfg.theme_blend_weight.clamp(0.0, 1.0);
            seed.score * ((1.0 - w) + w * input.theme.similarity(&seed.text))
        }
    }
}

pub fn compose(cfg: &ComposeConfig, input: &ComposeInput<'_>) -> Vec<Term> {
    if !cfg.enabled || cfg.max_per_sub == 0 {
        return Vec::new();
    }

    let mut seeds: Vec<(&Term, f64)> = input
        .posts_terms
        .iter()
        .filter(|t| t.word_count >= cfg.seed_min_words && t.score >= cfg.min_seed_score)
        .map(|t| (t, seed_signal(cfg, input, t)))
        .collect();
    seeds.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.text.cmp(&b.0.text))
    });
    seeds.truncate(cfg.max_seeds);

    let idf = input.anchor.idf_eff(input.posts_table, input.posts_power);
    let factor = anchor_factor(cfg, idf);

    let mut out = Vec::new();
    let mut rejected = 0usize;
    for (seed, _) in seeds {
        if out.len() >= cfg.max_per_sub {
            break;
        }
        if input.anchor.conflicts_with(&seed.text) {
            rejected += 1;
            continue;
        }
        let score = (seed.score * factor).min(seed.score * cfg.max_ratio);
        let text = format!("{} {}", input.anchor.text, seed.text);
        let display = format!("{} {}", input.anchor.display, seed.text);
        out.push(Term::new(text, Source::PostsComposed, score).with_display(display));
    }

    debug!(
        target: "keywords::compose",
        anchor = %input.anchor.text,
        factor,
        composed = out.len(),
        rejected,
        "composed anchor phrases"
    );
    out
}
