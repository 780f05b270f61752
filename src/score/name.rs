// src/score/name.rs
//! Name-derived terms.
//!
//! Every 1..=3-gram of the tokenized name scores 1.0 / 1.5 / 2.5 times the name weight. The
//! whole name phrase (original casing, no stopword removal) also gets a fixed bonus on top, so
//! "Alcohol Liver Support" always outranks "alcohol", "liver" and "support". Known acronyms
//! among the name tokens inject their expansion as an extra candidate.

use crate::config::NameConfig;
use crate::model::{Source, Term};
use crate::text::{extract_ngrams, TextKind, Tokenizer};
use std::collections::BTreeMap;

/// Built-in acronym expansions; `[name.acronyms]` in config adds to or overrides them.
pub const BUILTIN_ACRONYMS: &[(&str, &str)] = &[
    ("fc", "football club"),
    ("ai", "artificial intelligence"),
    ("ml", "machine learning"),
    ("diy", "do it yourself"),
    ("wfh", "work from home"),
    ("ama", "ask me anything"),
    ("til", "today i learned"),
    ("eli5", "explain like im five"),
    ("nyc", "new york city"),
    ("uk", "united kingdom"),
    ("usa", "united states"),
    ("pc", "personal computer"),
    ("ev", "electric vehicle"),
    ("rpg", "role playing game"),
    ("fps", "first person shooter"),
    ("mma", "mixed martial arts"),
    ("nfl", "national football league"),
    ("nba", "national basketball association"),
];

pub fn acronym_table(cfg: &NameConfig) -> BTreeMap<String, String> {
    let mut table: BTreeMap<String, String> = BUILTIN_ACRONYMS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in &cfg.acronyms {
        let k = k.trim().to_lowercase();
        let v = v.trim().to_lowercase();
        if !k.is_empty() && !v.is_empty() {
            table.insert(k, v);
        }
    }
    table
}

/// The whole name phrase in two renderings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WholeName {
    /// Lowercase, single-spaced ("alcohol liver support").
    pub text: String,
    /// Original casing ("Alcohol Liver Support").
    pub display: String,
}

impl WholeName {
    pub fn from_name(name: &str, tokenizer: &Tokenizer) -> Self {
        let words = tokenizer.cased_words(name, TextKind::Name);
        let display = words.join(" ");
        Self {
            text: display.to_lowercase(),
            display,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NameScore {
    pub terms: Vec<Term>,
    pub whole: WholeName,
}

fn base_score(words: usize) -> f64 {
    match words {
        0 | 1 => 1.0,
        2 => 1.5,
        _ => 2.5,
    }
}

pub fn score_name(
    name: &str,
    tokenizer: &Tokenizer,
    cfg: &NameConfig,
    acronyms: &BTreeMap<String, String>,
) -> NameScore {
    let whole = WholeName::from_name(name, tokenizer);
    let max_n = tokenizer.config().max_ngram;
    let pieces = tokenizer.tokenize(name, TextKind::Name);

    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    for gram in extract_ngrams(&pieces, max_n) {
        let words = gram.split(' ').count();
        scores.entry(gram).or_insert(base_score(words) * cfg.weight);
    }

    for word in pieces.iter().filter_map(|p| p.word()) {
        if let Some(expanded) = acronyms.get(word) {
            let words = expanded.split(' ').count();
            scores
                .entry(expanded.clone())
                .or_insert(base_score(words) * cfg.weight);
        }
    }

    if !whole.is_empty() {
        let words = whole.text.split(' ').count();
        let boosted = base_score(words) * cfg.weight + cfg.whole_name_bonus;
        let entry = scores.entry(whole.text.clone()).or_insert(0.0);
        *entry = entry.max(boosted);
    }

    let terms = scores
        .into_iter()
        .map(|(text, score)| {
            let term = Term::new(text, Source::Name, score);
            if term.text == whole.text {
                term.with_display(whole.display.clone())
            } else {
                term
            }
        })
        .collect();
    NameScore { terms, whole }
}
