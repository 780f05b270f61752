// src/score/rerank.rs
//! Optional embedding rerank.
//!
//! For candidates in the configured pool: `new = old * ((1-beta) + beta * cos(theme, term))`,
//! cosine clamped to [0,1]. Needs only the record itself (theme text comes from
//! `theme_summary`), so it can run standalone over previously written records.
//!
//! Embedding failures never propagate: an unknown model or a failed batch leaves the record
//! exactly as it was.

use crate::config::{RerankConfig, RerankPool};
use crate::metrics::RERANK_FALLBACK_TOTAL;
use crate::model::{Keyword, ScoredRecord, Source};
use metrics::counter;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const HASHING_MODEL: &str = "hashing-v1";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("unknown embedding model `{0}`")]
    UnknownModel(String),
    #[error("invalid embedding dimension {0}")]
    InvalidDimension(usize),
    #[error("embedding inference failed: {0}")]
    Inference(String),
}

pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;
    fn dim(&self) -> usize;
    /// One L2-normalised vector per input text, in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Deterministic signed feature hashing of word unigrams and character trigrams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self, EmbeddingError> {
        if dim == 0 {
            return Err(EmbeddingError::InvalidDimension(dim));
        }
        Ok(Self { dim })
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let idx = (u64::from_le_bytes(bucket) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut v, &format!("w:{word}"), 1.0);
            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for tri in padded.windows(3) {
                let tri: String = tri.iter().collect();
                self.add_feature(&mut v, &format!("c:{tri}"), 0.5);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        HASHING_MODEL
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn load_embedder(cfg: &RerankConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match cfg.model.trim() {
        HASHING_MODEL => Ok(Arc::new(HashingEmbedder::new(cfg.dim)?)),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)) as f64
}

fn in_pool(pool: RerankPool, k: &Keyword) -> bool {
    match pool {
        RerankPool::All => true,
        RerankPool::PostsOnly => k.source.sources() == [Source::Posts],
        RerankPool::ComposedOnly => k.source.contains(Source::PostsComposed),
        RerankPool::PostsAndComposed => k.source.posts_only(),
    }
}

pub struct EmbeddingReranker {
    embedder: Option<Arc<dyn Embedder>>,
    beta: f64,
    pool: RerankPool,
    batch_size: usize,
}

impl EmbeddingReranker {
    /// Load the configured model; a load failure yields a no-op reranker.
    pub fn from_config(cfg: &RerankConfig) -> Self {
        let embedder = match load_embedder(cfg) {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(target: "keywords::rerank", error = %e, "embedding model unavailable, rerank disabled");
                counter!(RERANK_FALLBACK_TOTAL).increment(1);
                None
            }
        };
        Self::with_embedder(embedder, cfg)
    }

    pub fn with_embedder(embedder: Option<Arc<dyn Embedder>>, cfg: &RerankConfig) -> Self {
        Self {
            embedder,
            beta: cfg.beta.clamp(0.0, 1.0),
            pool: cfg.pool,
            batch_size: cfg.batch_size.max(1),
        }
    }

    pub fn is_active(&self) -> bool {
        self.embedder.is_some()
    }

    fn embed_all(&self, embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let vecs = embedder.embed_batch(chunk)?;
            if vecs.len() != chunk.len() {
                return Err(EmbeddingError::Inference(format!(
                    "model returned {} vectors for {} texts",
                    vecs.len(),
                    chunk.len()
                )));
            }
            out.extend(vecs);
        }
        Ok(out)
    }

    pub fn rerank(&self, record: ScoredRecord) -> ScoredRecord {
        let Some(embedder) = self.embedder.as_deref() else {
            return record;
        };
        let Some(theme) = record.theme_summary.as_deref().filter(|t| !t.trim().is_empty()) else {
            return record;
        };
        let pool: Vec<usize> = record
            .keywords
            .iter()
            .enumerate()
            .filter(|(_, k)| in_pool(self.pool, k))
            .map(|(i, _)| i)
            .collect();
        if pool.is_empty() {
            return record;
        }

        let mut texts = Vec::with_capacity(pool.len() + 1);
        texts.push(theme.to_string());
        for &i in &pool {
            let k = &record.keywords[i];
            texts.push(k.display.clone().unwrap_or_else(|| k.term.clone()));
        }

        let vectors = match self.embed_all(embedder, &texts) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    target: "keywords::rerank",
                    community = %record.community_id,
                    error = %e,
                    "rerank failed, keeping scores"
                );
                counter!(RERANK_FALLBACK_TOTAL).increment(1);
                return record;
            }
        };

        let mut out = record;
        let theme_vec = &vectors[0];
        for (slot, &i) in pool.iter().enumerate() {
            let cos = cosine(theme_vec, &vectors[slot + 1]).clamp(0.0, 1.0);
            let k = &mut out.keywords[i];
            k.score *= (1.0 - self.beta) + self.beta * cos;
        }
        out.renormalize();
        debug!(
            target: "keywords::rerank",
            community = %out.community_id,
            model = embedder.model(),
            candidates = pool.len(),
            "reranked"
        );
        out
    }
}
