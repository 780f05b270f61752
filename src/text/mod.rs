// src/text/mod.rs
//! Text primitives: normalisation, tokenisation with boundary markers, segmentation,
//! stopword filtering and n-gram extraction.

pub mod ngrams;
pub mod segment;
pub mod stopwords;
pub mod tokenizer;

pub use ngrams::{extract_ngrams, ngram_counts, ngram_set};
pub use segment::{HeuristicSegmenter, NoOpSegmenter, Segmenter, SegmenterChain, StatisticalSegmenter};
pub use stopwords::StopwordFilter;
pub use tokenizer::{Piece, TextKind, Tokenizer};

use once_cell::sync::Lazy;
use regex::Regex;

/// Hard cap on characters fed into the tokenizer per text.
const MAX_TEXT_CHARS: usize = 20_000;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize raw text: decode HTML entities, strip tags, fold typographic quotes, collapse
/// whitespace. Line breaks survive as `\n` because they mark sentence boundaries.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, " ");

    let folded = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\r', "\n");

    let mut lines = Vec::new();
    for line in folded.split('\n') {
        let l = RE_WS.replace_all(line, " ");
        let l = l.trim();
        if !l.is_empty() {
            lines.push(l.to_string());
        }
    }
    let mut out = lines.join("\n");
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Lowercase phrase with single spaces, keeping intra-word hyphens ("Mazda  CX-5" -> "mazda cx-5").
pub fn normalize_phrase(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut words = Vec::new();
    for raw in lowered.split(|c: char| c.is_whitespace() || c == '_' || c == '/') {
        let w: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect();
        let w = w.trim_matches('-');
        if !w.is_empty() {
            words.push(w.to_string());
        }
    }
    words.join(" ")
}

/// Singular form used for lexical equivalence: the irregular "lives"-style plurals, then a
/// single trailing `s` (not `ss`) on words longer than three characters.
pub fn singularize(word: &str) -> String {
    match word {
        "lives" => return "life".into(),
        "wives" => return "wife".into(),
        "knives" => return "knife".into(),
        _ => {}
    }
    if word.chars().count() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Word keys used for lexical comparisons: lowercase alphanumeric words, singularised.
pub fn equivalence_words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(singularize)
        .collect()
}

/// Case/whitespace-insensitive equivalence tolerant of one trailing "s" per word and the
/// "lives" -> "life" plural ("Past Lives" ~ "past life").
pub fn lexically_equivalent(a: &str, b: &str) -> bool {
    let wa = equivalence_words(a);
    !wa.is_empty() && wa == equivalence_words(b)
}

/// Alphanumeric-only lowercase key used to detect near-duplicate spellings.
pub fn alnum_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Letters from Latin blocks (Basic Latin, Latin-1 Supplement, Extended-A/B, Extended Additional).
pub fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}')
}

/// True if any alphabetic character is outside the Latin script.
pub fn has_non_latin(s: &str) -> bool {
    s.chars().any(|c| c.is_alphabetic() && !is_latin_letter(c))
}

/// Share of non-ASCII characters among non-whitespace characters.
pub fn non_ascii_ratio(s: &str) -> f64 {
    let mut total = 0usize;
    let mut non_ascii = 0usize;
    for c in s.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if !c.is_ascii() {
            non_ascii += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        non_ascii as f64 / total as f64
    }
}
