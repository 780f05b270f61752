// src/text/stopwords.rs
//! Stopword sources, each toggled independently:
//! - static curated English list (plus community boilerplate),
//! - general-language frequency prior (very common content words),
//! - corpus-derived list (unigrams whose DF ratio in the current run exceeds a threshold).

use crate::config::StopwordConfig;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Curated function words and community boilerplate.
pub const STATIC_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren", "arent", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "cannot", "cant", "could", "couldnt", "did", "didnt",
    "do", "does", "doesnt", "doing", "dont", "down", "during", "each", "etc", "even", "ever",
    "every", "few", "for", "from", "further", "get", "gets", "got", "had", "hadnt", "has",
    "hasnt", "have", "havent", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "i", "id", "if", "im", "in", "into", "is", "isnt", "it",
    "its", "itself", "ive", "just", "let", "lets", "ll", "may", "me", "might", "more", "most",
    "much", "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "per", "re",
    "same", "shall", "she", "should", "shouldnt", "so", "some", "such", "than", "that",
    "thats", "the", "their", "theirs", "them", "themselves", "then", "there", "theres",
    "these", "they", "theyre", "this", "those", "through", "to", "too", "under", "until", "up",
    "upon", "us", "ve", "very", "via", "was", "wasnt", "we", "were", "werent", "what", "whats",
    "when", "where", "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
    "without", "wont", "would", "wouldnt", "yet", "you", "youd", "youll", "your", "youre",
    "yours", "yourself", "yourselves", "youve",
    // community boilerplate
    "community", "subreddit", "sub", "reddit", "welcome", "please", "rules", "rule", "post",
    "posts", "posting", "official", "place", "dedicated", "discussion", "discuss", "related",
    "anything", "everything", "something", "stuff", "thing", "things", "feel", "free", "join",
    "share", "sharing", "r", "u",
];

/// High-frequency general-language content words. Aggressive; disabled by default.
pub const GENERAL_PRIOR: &[&str] = &[
    "good", "great", "new", "old", "best", "better", "people", "person", "time", "times",
    "like", "make", "made", "know", "think", "want", "need", "use", "used", "using", "way",
    "day", "days", "year", "years", "first", "last", "one", "two", "really", "well", "back",
    "still", "see", "look", "going", "go", "come", "take", "right", "little", "big", "lot",
    "lots", "many", "say", "said", "today", "anyone", "someone", "everyone", "question",
    "questions", "help", "guys", "guy",
];

/// Resolved stopword set for one run.
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    words: HashSet<String>,
    corpus_derived: usize,
}

impl StopwordFilter {
    pub fn from_config(cfg: &StopwordConfig) -> Self {
        let mut words = HashSet::new();
        if cfg.use_static {
            words.extend(STATIC_STOPWORDS.iter().map(|w| w.to_string()));
        }
        if cfg.use_general_prior {
            words.extend(GENERAL_PRIOR.iter().map(|w| w.to_string()));
        }
        for w in &cfg.extra {
            let w = w.trim().to_lowercase();
            if !w.is_empty() {
                words.insert(w);
            }
        }
        Self {
            words,
            corpus_derived: 0,
        }
    }

    /// Empty filter (used for whole-name phrases).
    pub fn none() -> Self {
        Self::default()
    }

    /// Add corpus-derived stopwords.
    pub fn with_corpus_words<I: IntoIterator<Item = String>>(mut self, words: I) -> Self {
        for w in words {
            if self.words.insert(w) {
                self.corpus_derived += 1;
            }
        }
        self
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn corpus_derived(&self) -> usize {
        self.corpus_derived
    }
}

/// Unigrams present in more than `ratio` of the documents. Returns nothing for corpora
/// smaller than `min_docs`. Output is sorted.
pub fn derive_corpus_stopwords<'a, I>(doc_unigrams: I, ratio: f64, min_docs: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    let mut n_docs = 0usize;
    for doc in doc_unigrams {
        n_docs += 1;
        for w in doc {
            *df.entry(w.as_str()).or_insert(0) += 1;
        }
    }
    if n_docs < min_docs.max(1) {
        return Vec::new();
    }
    df.into_iter()
        .filter(|(_, c)| (*c as f64) / (n_docs as f64) > ratio)
        .map(|(w, _)| w.to_string())
        .collect()
}
