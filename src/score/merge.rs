// src/score/merge.rs
//! Per-source scaling, weighted merge, theme penalty and top-K normalisation.
//!
//! Each source's raw scores are divided by that source's maximum (composed terms share the posts
//! maximum so they stay on the seed scale), multiplied by the source weight and summed per term.
//! Posts-only terms sharing no token with the theme are multiplied down by the penalty factor.

use super::theme::Theme;
use crate::config::MergeConfig;
use crate::model::{sort_keywords, Keyword, Provenance, ScoredRecord, Source, Term};
use std::collections::BTreeMap;

/// Raw per-source terms of one community.
#[derive(Debug, Clone, Default)]
pub struct SourceTerms {
    pub name: Vec<Term>,
    pub description: Vec<Term>,
    pub posts: Vec<Term>,
    pub composed: Vec<Term>,
}

fn max_score(terms: &[Term]) -> f64 {
    terms.iter().map(|t| t.score).fold(0.0, f64::max)
}

fn source_weight(cfg: &MergeConfig, source: Source) -> f64 {
    match source {
        Source::Name => cfg.name_weight,
        Source::Description => cfg.description_weight,
        Source::Posts => cfg.posts_weight,
        Source::PostsComposed => cfg.composed_weight,
    }
}

struct Acc {
    score: f64,
    provenance: Provenance,
    display: Option<(Source, String)>,
}

pub struct Merger<'a> {
    cfg: &'a MergeConfig,
}

impl<'a> Merger<'a> {
    pub fn new(cfg: &'a MergeConfig) -> Self {
        Self { cfg }
    }

    pub fn merge(
        &self,
        community_id: &str,
        name: &str,
        terms: &SourceTerms,
        theme: &Theme,
    ) -> ScoredRecord {
        let posts_max = max_score(&terms.posts);
        let composed_max = if posts_max > 0.0 {
            posts_max
        } else {
            max_score(&terms.composed)
        };

        let mut acc: BTreeMap<&str, Acc> = BTreeMap::new();
        let groups: [(&[Term], f64); 4] = [
            (&terms.name, max_score(&terms.name)),
            (&terms.description, max_score(&terms.description)),
            (&terms.composed, composed_max),
            (&terms.posts, posts_max),
        ];
        for (group, max) in groups {
            if max <= 0.0 {
                continue;
            }
            for t in group {
                let scaled = t.score / max * source_weight(self.cfg, t.source);
                let entry = acc.entry(t.text.as_str()).or_insert_with(|| Acc {
                    score: 0.0,
                    provenance: Provenance::default(),
                    display: None,
                });
                entry.score += scaled;
                entry.provenance.insert(t.source);
                if let Some(d) = &t.display {
                    let better = entry
                        .display
                        .as_ref()
                        .map_or(true, |(src, _)| t.source < *src);
                    if better {
                        entry.display = Some((t.source, d.clone()));
                    }
                }
            }
        }

        let penalize = self.cfg.theme_penalty && !theme.is_empty();
        let mut keywords: Vec<Keyword> = acc
            .into_iter()
            .map(|(text, a)| {
                let mut score = a.score;
                if penalize && a.provenance.posts_only() && !theme.overlaps(text) {
                    score *= self.cfg.theme_penalty_factor;
                }
                Keyword {
                    term: text.to_string(),
                    weight: 0.0,
                    score,
                    source: a.provenance,
                    display: a.display.map(|(_, d)| d),
                }
            })
            .filter(|k| k.score > 0.0)
            .collect();

        sort_keywords(&mut keywords);
        keywords.truncate(self.cfg.top_k);

        let mut record = ScoredRecord {
            community_id: community_id.to_string(),
            name: name.to_string(),
            keywords,
            theme_summary: (!theme.summary.is_empty()).then(|| theme.summary.clone()),
        };
        record.renormalize();
        record
    }
}
