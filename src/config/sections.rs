// src/config/sections.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    /// Statistical if a lexicon is available, else heuristic.
    Auto,
    Statistical,
    Heuristic,
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub max_ngram: usize,
    pub min_token_len: usize,
    /// Minimum length of a glued lowercase token before segmentation is attempted.
    pub segment_min_len: usize,
    /// Segment descriptions/post titles too (names are always eligible).
    pub segment_all_kinds: bool,
    pub segmenter: SegmenterKind,
    /// Optional `word<TAB>count` lexicon merged into the corpus lexicon.
    pub lexicon_path: Option<PathBuf>,
    pub drop_non_latin: bool,
    pub keep_numbers: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_ngram: 3,
            min_token_len: 2,
            segment_min_len: 12,
            segment_all_kinds: false,
            segmenter: SegmenterKind::Auto,
            lexicon_path: None,
            drop_non_latin: true,
            keep_numbers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StopwordConfig {
    pub use_static: bool,
    pub use_general_prior: bool,
    /// DF ratio above which a unigram becomes a corpus stopword; `None` disables.
    pub corpus_df_ratio: Option<f64>,
    pub corpus_min_docs: usize,
    pub extra: Vec<String>,
}

impl Default for StopwordConfig {
    fn default() -> Self {
        Self {
            use_static: true,
            use_general_prior: false,
            corpus_df_ratio: Some(0.5),
            corpus_min_docs: 5,
            extra: Vec::new(),
        }
    }
}

/// TF-IDF knobs for one corpus. Each `[tfidf.*]` table is read over its own
/// corpus preset, so omitted keys keep that corpus's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TfIdfParams {
    /// IDF damping exponent in [0,1].
    pub idf_power: f64,
    pub bigram_boost: f64,
    pub trigram_boost: f64,
    pub generic_unigram_ratio: f64,
    pub generic_phrase_ratio: f64,
    pub min_docs_for_pruning: usize,
    /// Locally strongest pruned phrases restored per document.
    pub ensure_k: usize,
    pub max_terms: usize,
}

impl TfIdfParams {
    pub fn description() -> Self {
        Self {
            idf_power: 0.85,
            ..Self::base()
        }
    }

    pub fn posts() -> Self {
        Self {
            idf_power: 0.5,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            idf_power: 1.0,
            bigram_boost: 1.3,
            trigram_boost: 1.6,
            generic_unigram_ratio: 0.25,
            generic_phrase_ratio: 0.5,
            min_docs_for_pruning: 5,
            ensure_k: 3,
            max_terms: 40,
        }
    }

    /// Non-finite values fall back to `preset`.
    pub(crate) fn sanitize(&mut self, preset: &TfIdfParams) {
        let fix = |v: f64, d: f64| if v.is_finite() { v } else { d };
        self.idf_power = fix(self.idf_power, preset.idf_power).clamp(0.0, 1.0);
        self.bigram_boost = fix(self.bigram_boost, preset.bigram_boost).max(1.0);
        self.trigram_boost = fix(self.trigram_boost, preset.trigram_boost).max(1.0);
        self.generic_unigram_ratio =
            fix(self.generic_unigram_ratio, preset.generic_unigram_ratio).clamp(0.01, 1.0);
        self.generic_phrase_ratio =
            fix(self.generic_phrase_ratio, preset.generic_phrase_ratio).clamp(0.01, 1.0);
        self.max_terms = self.max_terms.max(1);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TfIdfOverrides {
    idf_power: Option<f64>,
    bigram_boost: Option<f64>,
    trigram_boost: Option<f64>,
    generic_unigram_ratio: Option<f64>,
    generic_phrase_ratio: Option<f64>,
    min_docs_for_pruning: Option<usize>,
    ensure_k: Option<usize>,
    max_terms: Option<usize>,
}

impl TfIdfOverrides {
    fn over(self, preset: TfIdfParams) -> TfIdfParams {
        TfIdfParams {
            idf_power: self.idf_power.unwrap_or(preset.idf_power),
            bigram_boost: self.bigram_boost.unwrap_or(preset.bigram_boost),
            trigram_boost: self.trigram_boost.unwrap_or(preset.trigram_boost),
            generic_unigram_ratio: self
                .generic_unigram_ratio
                .unwrap_or(preset.generic_unigram_ratio),
            generic_phrase_ratio: self
                .generic_phrase_ratio
                .unwrap_or(preset.generic_phrase_ratio),
            min_docs_for_pruning: self
                .min_docs_for_pruning
                .unwrap_or(preset.min_docs_for_pruning),
            ensure_k: self.ensure_k.unwrap_or(preset.ensure_k),
            max_terms: self.max_terms.unwrap_or(preset.max_terms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTfIdfSection {
    description: TfIdfOverrides,
    posts: TfIdfOverrides,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTfIdfSection")]
pub struct TfIdfSection {
    pub description: TfIdfParams,
    pub posts: TfIdfParams,
}

impl From<RawTfIdfSection> for TfIdfSection {
    fn from(raw: RawTfIdfSection) -> Self {
        Self {
            description: raw.description.over(TfIdfParams::description()),
            posts: raw.posts.over(TfIdfParams::posts()),
        }
    }
}

impl Default for TfIdfSection {
    fn default() -> Self {
        Self {
            description: TfIdfParams::description(),
            posts: TfIdfParams::posts(),
        }
    }
}

/// Engagement/recency coupling for post term frequencies. `alpha = 0` disables engagement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub alpha: f64,
    pub half_life_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    pub weight: f64,
    pub whole_name_bonus: f64,
    /// Extra acronym expansions on top of the built-in table.
    pub acronyms: BTreeMap<String, String>,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            weight: 1.0,
            whole_name_bonus: 1.0,
            acronyms: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSignal {
    LocalTf,
    Tfidf,
    ThemeBlend,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub enabled: bool,
    pub seed_signal: SeedSignal,
    pub theme_blend_weight: f64,
    pub max_seeds: usize,
    pub seed_min_words: usize,
    pub min_seed_score: f64,
    pub max_per_sub: usize,
    pub anchor_multiplier: f64,
    pub anchor_alpha: f64,
    pub anchor_floor: f64,
    pub anchor_cap: f64,
    pub max_ratio: f64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed_signal: SeedSignal::Tfidf,
            theme_blend_weight: 0.5,
            max_seeds: 12,
            seed_min_words: 2,
            min_seed_score: 1.0,
            max_per_sub: 8,
            anchor_multiplier: 1.0,
            anchor_alpha: 0.7,
            anchor_floor: 1.0,
            anchor_cap: 2.0,
            max_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub name_weight: f64,
    pub description_weight: f64,
    pub posts_weight: f64,
    pub composed_weight: f64,
    pub theme_penalty: bool,
    pub theme_penalty_factor: f64,
    /// Description terms included in the theme.
    pub theme_top_k: usize,
    pub top_k: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            name_weight: 1.0,
            description_weight: 0.6,
            posts_weight: 0.5,
            composed_weight: 0.5,
            theme_penalty: true,
            theme_penalty_factor: 0.6,
            theme_top_k: 5,
            top_k: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankPool {
    All,
    PostsOnly,
    ComposedOnly,
    PostsAndComposed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    pub model: String,
    pub dim: usize,
    pub beta: f64,
    pub pool: RerankPool,
    pub batch_size: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "hashing-v1".into(),
            dim: 256,
            beta: 0.35,
            pool: RerankPool::PostsAndComposed,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub collapse_repeats: bool,
    pub merge_near_duplicates: bool,
    pub drop_non_latin: bool,
    pub max_non_ascii_ratio: f64,
    pub drop_technical: bool,
    /// Normalised Levenshtein similarity for fuzzy merging; `None` disables.
    pub fuzzy_similarity: Option<f64>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collapse_repeats: true,
            merge_near_duplicates: true,
            drop_non_latin: true,
            max_non_ascii_ratio: 0.3,
            drop_technical: true,
            fuzzy_similarity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker pool size; `None` = available parallelism.
    pub workers: Option<usize>,
    pub resume: bool,
    pub communities_dir: PathBuf,
    pub posts_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Extend cached DF tables with new documents instead of rebuilding.
    pub extend_cache: bool,
    /// Count descriptions only for communities that also have post data.
    pub align_descriptions_to_posts: bool,
    /// Reference time for recency decay; `None` = newest post in the corpus.
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: None,
            resume: true,
            communities_dir: PathBuf::from("data/communities"),
            posts_dir: PathBuf::from("data/posts"),
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            extend_cache: false,
            align_descriptions_to_posts: true,
            as_of: None,
        }
    }
}
