// src/text/tokenizer.rs
//! Tokenizer producing normalized words interleaved with explicit boundary markers.
//!
//! A `Piece::Boundary` is emitted wherever a sentence/phrase break occurs or a token was removed
//! (stopword, number, too short, non-Latin). N-gram extraction never crosses a boundary, so two
//! words separated by a removed stopword can never form a "bridge gram".

use super::segment::SegmenterChain;
use super::stopwords::StopwordFilter;
use super::{has_non_latin, normalize_text};
use crate::config::TokenizerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Word(String),
    Boundary,
}

impl Piece {
    pub fn word(&self) -> Option<&str> {
        match self {
            Piece::Word(w) => Some(w),
            Piece::Boundary => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Name,
    Description,
    PostTitle,
}

/// Raw split result before filtering: original-cased words and phrase breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawPiece {
    Word(String),
    Break,
}

/// Characters that separate words inside one phrase.
fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '/' | '+' | '&' | '#' | '@' | '*' | '~' | '=')
}

#[derive(Debug, Default)]
pub struct Tokenizer {
    cfg: TokenizerConfig,
    stopwords: StopwordFilter,
    segmenter: SegmenterChain,
}

impl Tokenizer {
    pub fn new(cfg: TokenizerConfig, stopwords: StopwordFilter, segmenter: SegmenterChain) -> Self {
        Self {
            cfg,
            stopwords,
            segmenter,
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.cfg
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    /// Normalized words with boundary markers. Leading/trailing/repeated boundaries are collapsed.
    pub fn tokenize(&self, text: &str, kind: TextKind) -> Vec<Piece> {
        let mut out: Vec<Piece> = Vec::new();
        for raw in split_raw(&normalize_text(text)) {
            match raw {
                RawPiece::Break => push_boundary(&mut out),
                RawPiece::Word(w) => {
                    for sub in split_case_and_digits(&w) {
                        for word in self.segment_word(&sub, kind) {
                            if self.keep(&word) {
                                out.push(Piece::Word(word.to_lowercase()));
                            } else {
                                push_boundary(&mut out);
                            }
                        }
                    }
                }
            }
        }
        if out.last() == Some(&Piece::Boundary) {
            out.pop();
        }
        out
    }

    /// Words only (boundaries dropped). Convenient for token-set comparisons.
    pub fn words(&self, text: &str, kind: TextKind) -> Vec<String> {
        self.tokenize(text, kind)
            .into_iter()
            .filter_map(|p| match p {
                Piece::Word(w) => Some(w),
                Piece::Boundary => None,
            })
            .collect()
    }

    /// All words of `text` with original casing and no filtering (besides punctuation), after
    /// case/digit splitting and segmentation. Used for the whole-name phrase.
    pub fn cased_words(&self, text: &str, kind: TextKind) -> Vec<String> {
        let mut out = Vec::new();
        for raw in split_raw(&normalize_text(text)) {
            if let RawPiece::Word(w) = raw {
                for sub in split_case_and_digits(&w) {
                    out.extend(self.segment_word(&sub, kind));
                }
            }
        }
        out
    }

    /// Lowercase `sub`, segmenting long glued lowercase tokens where eligible. Segmented pieces
    /// come back lowercase; unsegmented tokens keep their original case in `cased_words` only.
    fn segment_word(&self, sub: &str, kind: TextKind) -> Vec<String> {
        let lower = sub.to_lowercase();
        let eligible = (kind == TextKind::Name || self.cfg.segment_all_kinds)
            && sub == lower
            && lower.chars().count() >= self.cfg.segment_min_len
            && lower.chars().all(|c| c.is_ascii_lowercase());
        if eligible {
            let pieces = self.segmenter.segment(&lower);
            if pieces.len() > 1 {
                return pieces;
            }
        }
        vec![sub.to_string()]
    }

    fn keep(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if lower.chars().all(|c| c.is_ascii_digit()) {
            return self.cfg.keep_numbers && lower.chars().count() >= self.cfg.min_token_len;
        }
        if lower.chars().count() < self.cfg.min_token_len {
            return false;
        }
        if self.cfg.drop_non_latin && has_non_latin(&lower) {
            return false;
        }
        !self.stopwords.contains(&lower)
    }
}

fn push_boundary(out: &mut Vec<Piece>) {
    if !out.is_empty() && out.last() != Some(&Piece::Boundary) {
        out.push(Piece::Boundary);
    }
}

/// Split normalized text into original-cased words and phrase breaks. Possessive `'s` is dropped
/// and remaining apostrophes are removed inside a word ("don't" -> "dont").
fn split_raw(text: &str) -> Vec<RawPiece> {
    let mut out = Vec::new();
    let mut cur = String::new();

    let flush = |cur: &mut String, out: &mut Vec<RawPiece>| {
        if cur.is_empty() {
            return;
        }
        let mut w = std::mem::take(cur);
        if w.ends_with("'s") || w.ends_with("'S") {
            w.truncate(w.len() - 2);
        }
        let w: String = w.chars().filter(|c| *c != '\'').collect();
        if !w.is_empty() {
            out.push(RawPiece::Word(w));
        }
    };

    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            cur.push(c);
        } else if is_word_separator(c) {
            flush(&mut cur, &mut out);
        } else {
            // sentence/phrase punctuation, line breaks and any other symbol (emoji, currency, ...)
            flush(&mut cur, &mut out);
            if out.last() != Some(&RawPiece::Break) {
                out.push(RawPiece::Break);
            }
        }
    }
    flush(&mut cur, &mut out);
    out
}

/// Split on camel/Pascal-case and letter/digit transitions, keeping acronym runs together
/// ("AlcoholLiverSupport" -> Alcohol Liver Support, "HTMLParser" -> HTML Parser, "CX5" -> CX 5).
pub fn split_case_and_digits(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && !cur.is_empty() {
            let p = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let split = (p.is_lowercase() && c.is_uppercase())
                || (p.is_uppercase() && c.is_uppercase() && next_lower)
                || (p.is_alphabetic() && c.is_numeric())
                || (p.is_numeric() && c.is_alphabetic());
            if split {
                out.push(std::mem::take(&mut cur));
            }
        }
        cur.push(c);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SegmenterKind, StopwordConfig};
    use std::collections::HashMap;

    fn tok() -> Tokenizer {
        Tokenizer::new(
            TokenizerConfig::default(),
            StopwordFilter::from_config(&StopwordConfig::default()),
            SegmenterChain::from_kind(SegmenterKind::Heuristic, HashMap::new()),
        )
    }

    fn render(pieces: &[Piece]) -> String {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Word(w) => w.as_str(),
                Piece::Boundary => "|",
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn removed_stopword_leaves_boundary() {
        let t = tok();
        let p = t.tokenize("Apples and Bananas.", TextKind::Description);
        assert_eq!(render(&p), "apples | bananas");
    }

    #[test]
    fn punctuation_numbers_and_symbols_break_phrases() {
        let t = tok();
        let p = t.tokenize(
            "Cabin air filter: <$10 and 1 minute of your time",
            TextKind::PostTitle,
        );
        assert_eq!(render(&p), "cabin air filter | minute | time");
    }

    #[test]
    fn camel_case_and_digits_split() {
        assert_eq!(
            split_case_and_digits("AlcoholLiverSupport"),
            vec!["Alcohol", "Liver", "Support"]
        );
        assert_eq!(split_case_and_digits("HTMLParser"), vec!["HTML", "Parser"]);
        assert_eq!(split_case_and_digits("CX5"), vec!["CX", "5"]);
        assert_eq!(split_case_and_digits("plain"), vec!["plain"]);
    }

    #[test]
    fn names_are_segmented_and_cased_words_keep_case() {
        let t = tok();
        assert_eq!(
            t.words("carrepairshop", TextKind::Name),
            vec!["car", "repair", "shop"]
        );
        assert_eq!(
            t.cased_words("AlcoholLiverSupport", TextKind::Name),
            vec!["Alcohol", "Liver", "Support"]
        );
        // descriptions are not segmented unless configured
        assert_eq!(
            t.words("carrepairshop", TextKind::Description),
            vec!["carrepairshop"]
        );
    }

    #[test]
    fn possessives_and_apostrophes() {
        let t = tok();
        assert_eq!(
            t.words("Reddit's favourite don't-care list", TextKind::Description),
            vec!["favourite", "care", "list"]
        );
    }

    #[test]
    fn non_latin_words_become_boundaries() {
        let t = tok();
        let p = t.tokenize("tokyo 東京 travel", TextKind::Description);
        assert_eq!(render(&p), "tokyo | travel");
    }
}
