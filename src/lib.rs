// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod docfreq;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod score;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::config::KeywordsConfig;
pub use crate::docfreq::{Corpus, DocFreqError, DocFreqTable, Document};
pub use crate::engine::{Explanation, KeywordEngine};
pub use crate::model::{Community, Keyword, Post, PostBundle, ScoredRecord, SkipRecord, Source};
pub use crate::pipeline::{Pipeline, Stage};
pub use crate::runner::{run_rerank, run_score, RunSummary};
