// src/text/segment.rs
//! Glued-word segmentation ("alcoholliversupport" -> "alcohol liver support").
//!
//! Variants are tried in order of quality by `SegmenterChain`:
//! - `StatisticalSegmenter`: Viterbi over a unigram frequency lexicon (the run's own corpus
//!   counts, optionally merged with a lexicon file),
//! - `HeuristicSegmenter`: fewest-pieces cover over a compact built-in vocabulary,
//! - `NoOpSegmenter`: never splits.
//!
//! A failed segmentation always degrades to the original token.

use crate::config::SegmenterKind;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Pieces shorter than this are never accepted.
const MIN_PIECE_LEN: usize = 2;
/// A token seen at least this often in the lexicon counts as a real word and is kept whole.
const MIN_KNOWN_COUNT: u64 = 3;

pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Split `token` into sub-words, or `None` when no confident segmentation exists.
    fn segment(&self, token: &str) -> Option<Vec<String>>;
}

/// Viterbi segmentation maximising the summed log-probability of the pieces.
#[derive(Debug, Clone)]
pub struct StatisticalSegmenter {
    counts: HashMap<String, u64>,
    log_total: f64,
    max_word_len: usize,
}

impl StatisticalSegmenter {
    /// `None` when the lexicon is empty.
    pub fn from_counts(counts: HashMap<String, u64>) -> Option<Self> {
        let counts: HashMap<String, u64> = counts
            .into_iter()
            .filter(|(w, c)| *c > 0 && w.is_ascii() && w.len() >= MIN_PIECE_LEN)
            .collect();
        if counts.is_empty() {
            return None;
        }
        let total: u64 = counts.values().sum();
        let max_word_len = counts.keys().map(|w| w.len()).max().unwrap_or(0);
        Some(Self {
            counts,
            log_total: (total as f64).ln(),
            max_word_len,
        })
    }

    /// Read a `word<TAB>count` (or `word count`) lexicon file. Malformed lines are ignored.
    pub fn load_lexicon(path: &Path) -> Result<HashMap<String, u64>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading segmentation lexicon {}", path.display()))?;
        let mut out = HashMap::new();
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(word), Some(count)) = (parts.next(), parts.next()) else {
                continue;
            };
            if let Ok(c) = count.parse::<u64>() {
                *out.entry(word.to_lowercase()).or_insert(0) += c;
            }
        }
        Ok(out)
    }

    fn log_prob(&self, word: &str) -> Option<f64> {
        self.counts
            .get(word)
            .map(|&c| (c as f64).ln() - self.log_total)
    }
}

impl Segmenter for StatisticalSegmenter {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn segment(&self, token: &str) -> Option<Vec<String>> {
        if !token.is_ascii() || self.counts.get(token).copied().unwrap_or(0) >= MIN_KNOWN_COUNT {
            return None;
        }
        let n = token.len();
        // best[i] = (score, start of last piece) for token[..i]
        let mut best: Vec<Option<(f64, usize)>> = vec![None; n + 1];
        best[0] = Some((0.0, 0));
        for i in 1..=n {
            let lo = i.saturating_sub(self.max_word_len);
            for j in lo..i {
                if i - j < MIN_PIECE_LEN {
                    continue;
                }
                let Some((prev, _)) = best[j] else { continue };
                let Some(lp) = self.log_prob(&token[j..i]) else {
                    continue;
                };
                let cand = prev + lp;
                if best[i].map_or(true, |(s, _)| cand > s) {
                    best[i] = Some((cand, j));
                }
            }
        }
        backtrack(token, &best)
    }
}

fn backtrack<T: Copy>(token: &str, best: &[Option<(T, usize)>]) -> Option<Vec<String>> {
    let n = token.len();
    best[n]?;
    let mut pieces = Vec::new();
    let mut i = n;
    while i > 0 {
        let (_, j) = best[i]?;
        pieces.push(token[j..i].to_string());
        i = j;
    }
    pieces.reverse();
    (pieces.len() >= 2).then_some(pieces)
}

/// Built-in vocabulary for the heuristic splitter.
const HEURISTIC_VOCAB: &[&str] = &[
    "addiction", "advice", "air", "alcohol", "animal", "animals", "anime", "anxiety", "app",
    "apps", "art", "ask", "audio", "auto", "baby", "back", "bake", "baking", "ball", "bank",
    "bar", "base", "baseball", "basket", "basketball", "beauty", "beer", "bike", "bikes",
    "bird", "birds", "board", "boat", "body", "book", "books", "brain", "bread", "build",
    "building", "business", "buy", "cafe", "camp", "camping", "cancer", "car", "card",
    "cards", "care", "career", "cars", "cat", "cats", "chronic", "city", "climbing", "club",
    "code", "coding", "coffee", "coin", "coins", "college", "comic", "comics", "computer",
    "cook", "cooking", "craft", "crafts", "crypto", "cycling", "dad", "dance", "data",
    "dating", "deal", "deals", "depression", "design", "dev", "diet", "disease", "dog",
    "dogs", "drink", "drinks", "drive", "driving", "earth", "eat", "eating", "education",
    "electric", "energy", "engine", "engineering", "exchange", "family", "fan", "fans",
    "farm", "fashion", "film", "films", "finance", "fish", "fishing", "fit", "fitness",
    "fix", "food", "foot", "football", "free", "friend", "friends", "fun", "funny", "game",
    "games", "gaming", "garden", "gardening", "gear", "group", "guide", "gun", "guns",
    "hair", "hand", "health", "heart", "help", "hike", "hiking", "history", "hobby", "home",
    "horse", "house", "hunt", "hunting", "idea", "ideas", "job", "jobs", "keto", "kid",
    "kids", "kitchen", "know", "land", "language", "learn", "learning", "life", "light",
    "live", "liver", "lives", "local", "loss", "love", "machine", "make", "makeup", "man",
    "market", "meal", "media", "medical", "men", "mental", "meme", "memes", "metal", "mind",
    "model", "models", "mom", "money", "motor", "movie", "movies", "music", "nature", "net",
    "network", "news", "night", "office", "oil", "online", "pain", "paint", "painting",
    "parent", "parenting", "parents", "part", "parts", "past", "pet", "pets", "phone",
    "photo", "photography", "plant", "plants", "play", "player", "players", "poetry",
    "politics", "power", "pro", "program", "programming", "project", "projects", "rain",
    "read", "reading", "real", "recipe", "recipes", "recovery", "repair", "road", "rock",
    "room", "run", "running", "sale", "school", "science", "sea", "self", "sell", "shop",
    "show", "side", "skin", "sleep", "small", "soccer", "social", "software", "song",
    "songs", "sound", "space", "sport", "sports", "star", "stars", "state", "stock",
    "stocks", "store", "story", "stories", "student", "students", "study", "style",
    "support", "system", "talk", "tea", "team", "tech", "technology", "test", "theory",
    "tips", "tool", "tools", "town", "toy", "toys", "trade", "trading", "train", "training",
    "travel", "tree", "truck", "trucks", "video", "videos", "war", "watch", "water", "web",
    "weight", "wine", "women", "wood", "woodworking", "work", "working", "world", "write",
    "writing", "yoga", "young", "zone",
];

/// Fewest-pieces cover using only the built-in vocabulary.
#[derive(Debug, Clone)]
pub struct HeuristicSegmenter {
    vocab: HashSet<&'static str>,
    max_word_len: usize,
}

impl Default for HeuristicSegmenter {
    fn default() -> Self {
        let vocab: HashSet<&'static str> = HEURISTIC_VOCAB.iter().copied().collect();
        let max_word_len = vocab.iter().map(|w| w.len()).max().unwrap_or(0);
        Self {
            vocab,
            max_word_len,
        }
    }
}

impl Segmenter for HeuristicSegmenter {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn segment(&self, token: &str) -> Option<Vec<String>> {
        if !token.is_ascii() || self.vocab.contains(token) {
            return None;
        }
        let n = token.len();
        let mut best: Vec<Option<(usize, usize)>> = vec![None; n + 1];
        best[0] = Some((0, 0));
        for i in 1..=n {
            let lo = i.saturating_sub(self.max_word_len);
            for j in lo..i {
                if i - j < MIN_PIECE_LEN || !self.vocab.contains(&token[j..i]) {
                    continue;
                }
                let Some((pieces, _)) = best[j] else { continue };
                if best[i].map_or(true, |(p, _)| pieces + 1 < p) {
                    best[i] = Some((pieces + 1, j));
                }
            }
        }
        backtrack(token, &best)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSegmenter;

impl Segmenter for NoOpSegmenter {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn segment(&self, _token: &str) -> Option<Vec<String>> {
        None
    }
}

/// Ordered fallback chain of segmenters.
pub struct SegmenterChain {
    members: Vec<Box<dyn Segmenter>>,
}

impl std::fmt::Debug for SegmenterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|m| m.name()))
            .finish()
    }
}

impl Default for SegmenterChain {
    fn default() -> Self {
        Self::noop()
    }
}

impl SegmenterChain {
    pub fn new(members: Vec<Box<dyn Segmenter>>) -> Self {
        Self { members }
    }

    pub fn noop() -> Self {
        Self::new(vec![Box::new(NoOpSegmenter)])
    }

    /// Build the chain for `kind`. `lexicon` feeds the statistical variant; when it is empty
    /// the chain falls back deterministically to the next variant.
    pub fn from_kind(kind: SegmenterKind, lexicon: HashMap<String, u64>) -> Self {
        let mut members: Vec<Box<dyn Segmenter>> = Vec::new();
        match kind {
            SegmenterKind::Auto => {
                if let Some(s) = StatisticalSegmenter::from_counts(lexicon) {
                    members.push(Box::new(s));
                }
                members.push(Box::new(HeuristicSegmenter::default()));
            }
            SegmenterKind::Statistical => match StatisticalSegmenter::from_counts(lexicon) {
                Some(s) => members.push(Box::new(s)),
                None => {
                    warn!(target: "keywords::segment", "empty lexicon, statistical segmenter disabled");
                }
            },
            SegmenterKind::Heuristic => members.push(Box::new(HeuristicSegmenter::default())),
            SegmenterKind::None => {}
        }
        members.push(Box::new(NoOpSegmenter));
        Self { members }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    /// First accepted segmentation, or the original token.
    pub fn segment(&self, token: &str) -> Vec<String> {
        for m in &self.members {
            if let Some(pieces) = m.segment(token) {
                if pieces.len() >= 2 && pieces.iter().all(|p| p.len() >= MIN_PIECE_LEN) {
                    return pieces;
                }
            }
        }
        vec![token.to_string()]
    }
}
