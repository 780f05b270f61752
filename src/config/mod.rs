// src/config/mod.rs
//! Scoring configuration loaded from TOML, with env overrides and sanitising.
//!
//! Resolution order:
//! 1) `$KEYWORDS_CONFIG_PATH` (must exist if set)
//! 2) `config/keywords.toml` (optional; defaults when missing)
//!
//! Env overrides applied afterwards: `KEYWORDS_WORKERS`, `KEYWORDS_RESUME`.

mod sections;

pub use sections::*;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/keywords.toml";
pub const ENV_CONFIG_PATH: &str = "KEYWORDS_CONFIG_PATH";
pub const ENV_WORKERS: &str = "KEYWORDS_WORKERS";
pub const ENV_RESUME: &str = "KEYWORDS_RESUME";

/// Complete configuration surface. Every section and field has a safe default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub tokenizer: TokenizerConfig,
    pub stopwords: StopwordConfig,
    pub tfidf: TfIdfSection,
    pub engagement: EngagementConfig,
    pub name: NameConfig,
    pub compose: ComposeConfig,
    pub merge: MergeConfig,
    pub rerank: RerankConfig,
    pub cleanup: CleanupConfig,
    pub run: RunConfig,
}

impl KeywordsConfig {
    /// Load using env var + fallback path, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        path.display()
                    ));
                }
                Self::from_path(&path)?
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_path(&path)?
                } else {
                    info!(target: "keywords::config", "no config file found, using defaults");
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keywords config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing keywords config {}", path.display()))
    }

    /// Parse from a TOML string and sanitise.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: KeywordsConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(n) = std::env::var(ENV_WORKERS)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            self.run.workers = Some(n);
        }
        if let Ok(v) = std::env::var(ENV_RESUME) {
            match v.trim() {
                "1" | "true" => self.run.resume = true,
                "0" | "false" => self.run.resume = false,
                _ => {}
            }
        }
    }

    /// Clamp out-of-range values into their valid domains instead of failing.
    pub fn sanitize(&mut self) {
        self.tokenizer.max_ngram = self.tokenizer.max_ngram.clamp(1, 3);
        self.tokenizer.min_token_len = self.tokenizer.min_token_len.max(1);

        self.stopwords.corpus_df_ratio = self
            .stopwords
            .corpus_df_ratio
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.01, 1.0));

        self.tfidf.description.sanitize(&TfIdfParams::description());
        self.tfidf.posts.sanitize(&TfIdfParams::posts());

        self.engagement.alpha = finite_or(self.engagement.alpha, 0.0).clamp(0.0, 1.0);
        self.engagement.half_life_days = self
            .engagement
            .half_life_days
            .filter(|h| h.is_finite() && *h > 0.0);

        self.name.weight = finite_or(self.name.weight, 1.0).max(0.0);
        self.name.whole_name_bonus = finite_or(self.name.whole_name_bonus, 1.0).max(0.0);

        let c = &mut self.compose;
        c.anchor_alpha = finite_or(c.anchor_alpha, 0.7).clamp(0.0, 1.0);
        c.anchor_multiplier = finite_or(c.anchor_multiplier, 1.0).max(0.0);
        c.anchor_floor = finite_or(c.anchor_floor, 1.0).max(0.0);
        c.anchor_cap = finite_or(c.anchor_cap, 2.0).max(0.0);
        if c.anchor_floor > c.anchor_cap {
            std::mem::swap(&mut c.anchor_floor, &mut c.anchor_cap);
        }
        c.max_ratio = finite_or(c.max_ratio, 2.0).max(1.0);
        c.theme_blend_weight = finite_or(c.theme_blend_weight, 0.5).clamp(0.0, 1.0);
        c.seed_min_words = c.seed_min_words.clamp(1, 3);

        let m = &mut self.merge;
        for w in [
            &mut m.name_weight,
            &mut m.description_weight,
            &mut m.posts_weight,
            &mut m.composed_weight,
        ] {
            *w = finite_or(*w, 0.0).max(0.0);
        }
        m.theme_penalty_factor = finite_or(m.theme_penalty_factor, 0.6).clamp(0.0, 1.0);
        m.top_k = m.top_k.max(1);

        self.rerank.beta = finite_or(self.rerank.beta, 0.35).clamp(0.0, 1.0);
        self.rerank.batch_size = self.rerank.batch_size.max(1);
        self.rerank.dim = self.rerank.dim.max(8);

        self.cleanup.max_non_ascii_ratio =
            finite_or(self.cleanup.max_non_ascii_ratio, 0.3).clamp(0.0, 1.0);
        self.cleanup.fuzzy_similarity = self
            .cleanup
            .fuzzy_similarity
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.5, 1.0));

        self.run.workers = self.run.workers.filter(|n| *n > 0);
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}
