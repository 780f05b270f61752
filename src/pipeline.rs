// src/pipeline.rs
//! Ordered post-merge stages, each a pure `ScoredRecord -> ScoredRecord`.
//!
//! A disabled stage is simply absent, which is the identity, so toggling one never changes what
//! the others produce.

use crate::config::{CleanupConfig, KeywordsConfig};
use crate::model::ScoredRecord;
use crate::score::{Cleanup, EmbeddingReranker};

pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, record: ScoredRecord) -> ScoredRecord;
}

pub struct RerankStage(pub EmbeddingReranker);

impl Stage for RerankStage {
    fn name(&self) -> &'static str {
        "rerank"
    }

    fn apply(&self, record: ScoredRecord) -> ScoredRecord {
        self.0.rerank(record)
    }
}

pub struct CleanupStage(pub CleanupConfig);

impl Stage for CleanupStage {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn apply(&self, record: ScoredRecord) -> ScoredRecord {
        Cleanup::new(&self.0).apply(record)
    }
}

/// Renormalises weights; the only stage of the rerank-only mode besides rerank itself.
pub struct NormalizeStage;

impl Stage for NormalizeStage {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, mut record: ScoredRecord) -> ScoredRecord {
        record.renormalize();
        record
    }
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Scoring-run stages: rerank (if enabled), then cleanup (if enabled).
    pub fn from_config(cfg: &KeywordsConfig) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if cfg.rerank.enabled {
            stages.push(Box::new(RerankStage(EmbeddingReranker::from_config(&cfg.rerank))));
        }
        if cfg.cleanup.enabled {
            stages.push(Box::new(CleanupStage(cfg.cleanup.clone())));
        }
        Self { stages }
    }

    /// Standalone rerank over existing records, regardless of `rerank.enabled`.
    pub fn rerank_only(cfg: &KeywordsConfig) -> Self {
        Self::new(vec![
            Box::new(RerankStage(EmbeddingReranker::from_config(&cfg.rerank))),
            Box::new(NormalizeStage),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, record: ScoredRecord) -> ScoredRecord {
        self.stages.iter().fold(record, |rec, stage| stage.apply(rec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Keyword, Provenance, Source};

    fn rec() -> ScoredRecord {
        let mut r = ScoredRecord {
            community_id: "x".into(),
            name: "x".into(),
            keywords: vec![
                Keyword {
                    term: "big big problem".into(),
                    weight: 0.0,
                    score: 1.0,
                    source: Provenance::single(Source::Posts),
                    display: None,
                },
                Keyword {
                    term: "solutions".into(),
                    weight: 0.0,
                    score: 1.0,
                    source: Provenance::single(Source::Description),
                    display: None,
                },
            ],
            theme_summary: Some("problem solving".into()),
        };
        r.renormalize();
        r
    }

    #[test]
    fn empty_pipeline_is_identity() {
        assert_eq!(Pipeline::default().run(rec()), rec());
    }

    #[test]
    fn stages_follow_configuration() {
        let mut cfg = KeywordsConfig::default();
        assert_eq!(Pipeline::from_config(&cfg).stage_names(), vec!["cleanup"]);
        cfg.rerank.enabled = true;
        assert_eq!(
            Pipeline::from_config(&cfg).stage_names(),
            vec!["rerank", "cleanup"]
        );
        cfg.cleanup.enabled = false;
        cfg.rerank.enabled = false;
        let p = Pipeline::from_config(&cfg);
        assert!(p.stage_names().is_empty());
        assert_eq!(p.run(rec()), rec());
    }

    #[test]
    fn cleanup_stage_rewrites_terms() {
        let cfg = KeywordsConfig::default();
        let out = Pipeline::from_config(&cfg).run(rec());
        assert!(out.keywords.iter().any(|k| k.term == "big problem"));
    }
}
