// src/engine.rs
//! # Keyword Engine
//! Corpus preparation (stopwords, segmentation lexicon, DF tables) and per-community scoring.
//!
//! `KeywordEngine::prepare` is the barrier: it finishes both document-frequency tables before
//! any community is scored. After that the engine is read-only and shared across workers.

use crate::config::KeywordsConfig;
use crate::docfreq::{Corpus, DocFreqError, DocFreqTable, Document};
use crate::metrics::DF_REBUILD_TOTAL;
use crate::model::{Community, PostBundle, ScoredRecord, Source};
use crate::pipeline::Pipeline;
use crate::score::{
    accumulate_tf, acronym_table, compose, engagement_weight, score_name, Anchor, ComposeInput,
    LocalTf, Merger, SourceTerms, TfIdfScorer, Theme,
};
use crate::text::stopwords::derive_corpus_stopwords;
use crate::text::{SegmenterChain, StatisticalSegmenter, StopwordFilter, TextKind, Tokenizer};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything needed to explain one community's ranking.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Raw per-source terms before scaling and merging.
    pub terms: SourceTerms,
    pub theme: Theme,
    pub anchor: Option<Anchor>,
    /// Final record after the post-merge stages.
    pub record: ScoredRecord,
}

pub struct KeywordEngine {
    cfg: KeywordsConfig,
    tokenizer: Tokenizer,
    descriptions: Arc<DocFreqTable>,
    posts: Arc<DocFreqTable>,
    acronyms: BTreeMap<String, String>,
    pipeline: Pipeline,
    as_of: Option<DateTime<Utc>>,
}

impl KeywordEngine {
    /// Build the tokenizer and both DF tables for this corpus. With `cache_dir`, tables are
    /// reused or extended from (and persisted to) `df_descriptions.json` / `df_posts.json`.
    pub fn prepare(
        cfg: KeywordsConfig,
        communities: &[Community],
        bundles: &BTreeMap<String, PostBundle>,
        cache_dir: Option<&Path>,
    ) -> Result<Self> {
        let tokenizer = build_tokenizer(&cfg, communities, bundles);

        let desc_docs: Vec<Document> = communities
            .iter()
            .map(|c| {
                Document::from_texts(
                    c.id.clone(),
                    [c.description.as_str()],
                    &tokenizer,
                    Corpus::Descriptions.text_kind(),
                )
            })
            .collect();
        let post_docs: Vec<Document> = bundles
            .values()
            .filter(|b| !b.posts.is_empty())
            .map(|b| {
                Document::from_texts(
                    b.community_id.clone(),
                    b.posts.iter().map(|p| p.title.as_str()),
                    &tokenizer,
                    Corpus::Posts.text_kind(),
                )
            })
            .collect();

        let post_keys: BTreeSet<String> = post_docs.iter().map(|d| d.key.clone()).collect();
        let desc_allowed =
            (cfg.run.align_descriptions_to_posts && !post_keys.is_empty()).then_some(&post_keys);

        let extend = cfg.run.extend_cache;
        let descriptions =
            resolve_table(Corpus::Descriptions, &desc_docs, desc_allowed, cache_dir, extend)?;
        let posts = resolve_table(Corpus::Posts, &post_docs, None, cache_dir, extend)?;

        let as_of = cfg.run.as_of.or_else(|| {
            bundles
                .values()
                .flat_map(|b| b.posts.iter().filter_map(|p| p.created_at))
                .max()
        });

        info!(
            target: "keywords::engine",
            communities = communities.len(),
            description_docs = descriptions.n_docs(),
            post_docs = posts.n_docs(),
            corpus_stopwords = tokenizer.stopwords().corpus_derived(),
            "corpus prepared"
        );

        Ok(Self {
            acronyms: acronym_table(&cfg.name),
            pipeline: Pipeline::from_config(&cfg),
            tokenizer,
            descriptions: Arc::new(descriptions),
            posts: Arc::new(posts),
            as_of,
            cfg,
        })
    }

    pub fn config(&self) -> &KeywordsConfig {
        &self.cfg
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn descriptions(&self) -> &DocFreqTable {
        &self.descriptions
    }

    pub fn posts(&self) -> &DocFreqTable {
        &self.posts
    }

    pub fn score_community(&self, community: &Community, bundle: Option<&PostBundle>) -> ScoredRecord {
        self.explain(community, bundle).record
    }

    pub fn explain(&self, community: &Community, bundle: Option<&PostBundle>) -> Explanation {
        let cfg = &self.cfg;
        let max_n = cfg.tokenizer.max_ngram;
        let name = [&community.name, &community.display_name, &community.id]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or_default();

        let name_score = score_name(name, &self.tokenizer, &cfg.name, &self.acronyms);

        let mut desc_tf = LocalTf::new();
        let pieces = self
            .tokenizer
            .tokenize(&community.description, TextKind::Description);
        accumulate_tf(&mut desc_tf, &pieces, max_n, 1.0);
        let description = TfIdfScorer::new(&self.descriptions, &cfg.tfidf.description)
            .score(&desc_tf, Source::Description);

        let mut posts_tf = LocalTf::new();
        for post in bundle.map(|b| b.posts.as_slice()).unwrap_or_default() {
            let weight = engagement_weight(post, &cfg.engagement, self.as_of);
            let pieces = self.tokenizer.tokenize(&post.title, TextKind::PostTitle);
            accumulate_tf(&mut posts_tf, &pieces, max_n, weight);
        }
        let posts =
            TfIdfScorer::new(&self.posts, &cfg.tfidf.posts).score(&posts_tf, Source::Posts);

        let theme = Theme::build(&name_score.whole, &description.terms, cfg.merge.theme_top_k);

        let anchor = Anchor::resolve(
            bundle.and_then(|b| b.anchor_title.as_deref()),
            name,
            &self.tokenizer,
        );
        let composed = match &anchor {
            Some(a) if cfg.compose.enabled && !posts.terms.is_empty() => compose(
                &cfg.compose,
                &ComposeInput {
                    anchor: a,
                    posts_terms: &posts.terms,
                    local_tf: &posts_tf,
                    theme: &theme,
                    posts_table: &self.posts,
                    posts_power: cfg.tfidf.posts.idf_power,
                },
            ),
            _ => Vec::new(),
        };

        let terms = SourceTerms {
            name: name_score.terms,
            description: description.terms,
            posts: posts.terms,
            composed,
        };
        let merged = Merger::new(&cfg.merge).merge(
            &community.id,
            &community.display_name,
            &terms,
            &theme,
        );
        let record = self.pipeline.run(merged);

        Explanation {
            terms,
            theme,
            anchor,
            record,
        }
    }
}

/// Pre-pass over the raw corpus: segmentation lexicon from unfiltered unigram counts, and
/// corpus stopwords from the description documents.
fn build_tokenizer(
    cfg: &KeywordsConfig,
    communities: &[Community],
    bundles: &BTreeMap<String, PostBundle>,
) -> Tokenizer {
    let plain = Tokenizer::new(
        cfg.tokenizer.clone(),
        StopwordFilter::none(),
        SegmenterChain::noop(),
    );
    let base = StopwordFilter::from_config(&cfg.stopwords);

    let mut lexicon: HashMap<String, u64> = HashMap::new();
    let mut desc_unigrams: Vec<BTreeSet<String>> = Vec::with_capacity(communities.len());
    for c in communities {
        let words = plain.words(&c.description, TextKind::Description);
        for w in &words {
            *lexicon.entry(w.clone()).or_insert(0) += 1;
        }
        desc_unigrams.push(words.into_iter().filter(|w| !base.contains(w)).collect());
    }
    for post in bundles.values().flat_map(|b| b.posts.iter()) {
        for w in plain.words(&post.title, TextKind::PostTitle) {
            *lexicon.entry(w).or_insert(0) += 1;
        }
    }
    if let Some(path) = &cfg.tokenizer.lexicon_path {
        match StatisticalSegmenter::load_lexicon(path) {
            Ok(extra) => {
                for (w, c) in extra {
                    *lexicon.entry(w).or_insert(0) += c;
                }
            }
            Err(e) => warn!(target: "keywords::engine", error = %e, "lexicon file ignored"),
        }
    }

    let corpus_words = match cfg.stopwords.corpus_df_ratio {
        Some(ratio) => derive_corpus_stopwords(&desc_unigrams, ratio, cfg.stopwords.corpus_min_docs),
        None => Vec::new(),
    };
    let stopwords = base.with_corpus_words(corpus_words);
    let segmenter = SegmenterChain::from_kind(cfg.tokenizer.segmenter, lexicon);
    Tokenizer::new(cfg.tokenizer.clone(), stopwords, segmenter)
}

/// Build, reuse or extend the DF table of one corpus.
///
/// A cache built for a different subset is never scored against: it is reported and rebuilt.
fn resolve_table(
    corpus: Corpus,
    docs: &[Document],
    allowed: Option<&BTreeSet<String>>,
    cache_dir: Option<&Path>,
    extend: bool,
) -> Result<DocFreqTable> {
    let Some(dir) = cache_dir else {
        return Ok(DocFreqTable::build(corpus, docs, allowed));
    };
    let path = dir.join(corpus.cache_file_name());

    if path.exists() {
        let attempt = if extend {
            DocFreqTable::load_and_extend(&path, corpus, docs, allowed)
        } else {
            DocFreqTable::load(&path, corpus, allowed)
        };
        match attempt {
            Ok(table) if extend => {
                table
                    .save(&path)
                    .with_context(|| format!("saving {corpus} DF cache"))?;
                return Ok(table);
            }
            Ok(table) => {
                let current: BTreeSet<&str> = docs
                    .iter()
                    .map(|d| d.key.as_str())
                    .filter(|k| allowed.map_or(true, |a| a.contains(*k)))
                    .collect();
                if table.doc_keys().iter().map(String::as_str).eq(current.iter().copied()) {
                    return Ok(table);
                }
                info!(target: "keywords::docfreq", corpus = %corpus, "cached table covers other documents, rebuilding");
            }
            Err(e @ (DocFreqError::SubsetMismatch { .. } | DocFreqError::Overlap { .. })) => {
                error!(target: "keywords::docfreq", corpus = %corpus, error = %e, "unsafe DF cache rejected, rebuilding");
                counter!(DF_REBUILD_TOTAL).increment(1);
            }
            Err(e) => {
                warn!(target: "keywords::docfreq", corpus = %corpus, error = %e, "DF cache unreadable, rebuilding");
                counter!(DF_REBUILD_TOTAL).increment(1);
            }
        }
    }

    let table = DocFreqTable::build(corpus, docs, allowed);
    table
        .save(&path)
        .with_context(|| format!("saving {corpus} DF cache"))?;
    Ok(table)
}
