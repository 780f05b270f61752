// src/score/tfidf.rs
//! Damped TF-IDF with phrase boosts, generic-term pruning and ensure-K phrase retention.
//!
//! score(g) = tf(g) * idf(g)^power * boost(|g|)
//!
//! Pruning drops grams whose corpus DF ratio exceeds the unigram/phrase thresholds, but only
//! once the corpus has `min_docs_for_pruning` documents. The `ensure_k` locally most frequent
//! pruned phrases (bigrams/trigrams) are restored afterwards. Both knobs are independent.

use crate::config::{EngagementConfig, TfIdfParams};
use crate::docfreq::DocFreqTable;
use crate::model::{Post, Source, Term};
use crate::text::ngrams::gram_len;
use crate::text::{extract_ngrams, Piece};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

/// Local (possibly weighted) term frequencies of one document.
pub type LocalTf = BTreeMap<String, f64>;

/// Accumulate `weight` for every n-gram occurrence in `pieces`.
pub fn accumulate_tf(tf: &mut LocalTf, pieces: &[Piece], max_n: usize, weight: f64) {
    if weight <= 0.0 || !weight.is_finite() {
        return;
    }
    for g in extract_ngrams(pieces, max_n) {
        *tf.entry(g).or_insert(0.0) += weight;
    }
}

/// Per-post multiplier on term frequency.
///
/// `(1-alpha) + alpha * (1 + ln1p(score) + 0.5 * ln1p(comments))`, times `0.5^(age/half_life)`
/// when a half-life is configured and both timestamps are known. `alpha = 0` and no half-life
/// gives exactly 1.0.
pub fn engagement_weight(post: &Post, cfg: &EngagementConfig, as_of: Option<DateTime<Utc>>) -> f64 {
    let alpha = cfg.alpha.clamp(0.0, 1.0);
    let mut w = 1.0;
    if alpha > 0.0 {
        let score = post.score.max(0) as f64;
        let comments = post.comment_count as f64;
        let engagement = 1.0 + score.ln_1p() + 0.5 * comments.ln_1p();
        w = (1.0 - alpha) + alpha * engagement;
    }
    if let (Some(half_life), Some(created), Some(now)) = (cfg.half_life_days, post.created_at, as_of) {
        let age_days = (now - created).num_seconds().max(0) as f64 / 86_400.0;
        w *= 0.5f64.powf(age_days / half_life);
    }
    w
}

/// Result of scoring one document.
#[derive(Debug, Clone, Default)]
pub struct TfIdfResult {
    /// Sorted by score desc, then text.
    pub terms: Vec<Term>,
    pub pruned: usize,
    pub restored: usize,
}

pub struct TfIdfScorer<'a> {
    table: &'a DocFreqTable,
    params: &'a TfIdfParams,
}

impl<'a> TfIdfScorer<'a> {
    pub fn new(table: &'a DocFreqTable, params: &'a TfIdfParams) -> Self {
        Self { table, params }
    }

    pub fn boost(&self, n: usize) -> f64 {
        match n {
            0 | 1 => 1.0,
            2 => self.params.bigram_boost,
            _ => self.params.trigram_boost,
        }
    }

    pub fn idf_eff(&self, gram: &str) -> f64 {
        self.table.idf_damped(gram, self.params.idf_power)
    }

    pub fn score_gram(&self, gram: &str, tf: f64) -> f64 {
        tf * self.idf_eff(gram) * self.boost(gram_len(gram))
    }

    fn is_generic(&self, gram: &str) -> bool {
        if self.table.n_docs() < self.params.min_docs_for_pruning {
            return false;
        }
        let limit = if gram_len(gram) == 1 {
            self.params.generic_unigram_ratio
        } else {
            self.params.generic_phrase_ratio
        };
        self.table.df_ratio(gram) > limit
    }

    pub fn score(&self, tf: &LocalTf, source: Source) -> TfIdfResult {
        let mut kept: Vec<(&str, f64)> = Vec::new();
        let mut pruned_phrases: Vec<(&str, f64)> = Vec::new();
        let mut pruned = 0usize;

        for (gram, &count) in tf {
            if count <= 0.0 {
                continue;
            }
            if self.is_generic(gram) {
                pruned += 1;
                if gram_len(gram) >= 2 {
                    pruned_phrases.push((gram.as_str(), count));
                }
                continue;
            }
            kept.push((gram.as_str(), count));
        }

        // ensure-K: locally strongest pruned phrases (ties: longer, then lexical)
        pruned_phrases.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| gram_len(b.0).cmp(&gram_len(a.0)))
                .then_with(|| a.0.cmp(b.0))
        });
        let restored = pruned_phrases.len().min(self.params.ensure_k);
        kept.extend(pruned_phrases.into_iter().take(restored));

        let mut terms: Vec<Term> = kept
            .into_iter()
            .map(|(gram, count)| Term::new(gram, source, self.score_gram(gram, count)))
            .collect();
        sort_terms(&mut terms);
        terms.truncate(self.params.max_terms);

        trace!(
            target: "keywords::tfidf",
            source = source.as_str(),
            kept = terms.len(),
            pruned,
            restored,
            "scored document"
        );
        TfIdfResult {
            terms,
            pruned,
            restored,
        }
    }
}

/// Score desc, then text asc.
pub fn sort_terms(terms: &mut [Term]) {
    terms.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.text.cmp(&b.text))
    });
}
