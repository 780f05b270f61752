// src/score/mod.rs
//! Scoring components, leaves first: TF-IDF, name phrases, theme, composition, merge, and the
//! post-processing stages (embedding rerank, cleanup).

pub mod cleanup;
pub mod compose;
pub mod merge;
pub mod name;
pub mod rerank;
pub mod tfidf;
pub mod theme;

// Re-export convenient types.
pub use crate::score::cleanup::Cleanup;
pub use crate::score::compose::{anchor_factor, compose, Anchor, ComposeInput};
pub use crate::score::merge::{Merger, SourceTerms};
pub use crate::score::name::{acronym_table, score_name, NameScore, WholeName};
pub use crate::score::rerank::{
    load_embedder, Embedder, EmbeddingError, EmbeddingReranker, HashingEmbedder,
};
pub use crate::score::tfidf::{accumulate_tf, engagement_weight, LocalTf, TfIdfResult, TfIdfScorer};
pub use crate::score::theme::Theme;
