// src/runner.rs
//! Batch orchestration.
//!
//! Order of a scoring run:
//! 1) load + validate input (async sources), write `skipped.jsonl`
//! 2) prepare the engine (DF tables finished before any scoring starts)
//! 3) score communities on a bounded rayon pool, one atomic record file each
//!
//! Steps 2 and 3 run inside `spawn_blocking` so the runtime threads stay free.

use crate::config::KeywordsConfig;
use crate::engine::KeywordEngine;
use crate::ingest::{self, CommunitySource, Ingested, PostSource};
use crate::metrics::{
    ensure_metrics_described, COMMUNITIES_SCORED_TOTAL, RESUME_SKIPPED_TOTAL, SCORE_MS,
    WRITE_ERRORS_TOTAL,
};
use crate::output::{self, RECORDS_DIR};
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use metrics::{counter, histogram};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub communities: usize,
    pub scored: usize,
    pub resumed: usize,
    pub failed: usize,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Scored,
    Resumed,
    Failed,
}

/// Configured pool size, else the available parallelism.
pub fn worker_count(cfg: &KeywordsConfig) -> usize {
    cfg.run
        .workers
        .filter(|n| *n > 0)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("keywords-worker-{i}"))
        .build()
        .context("building worker pool")
}

/// Score every community of `ingested` into `records_dir`.
///
/// With `resume`, communities whose record file already holds a valid, non-empty record are
/// left untouched.
pub fn score_all(
    engine: &KeywordEngine,
    ingested: &Ingested,
    records_dir: &Path,
    resume: bool,
    workers: usize,
) -> Result<RunSummary> {
    ensure_metrics_described();
    let pool = build_pool(workers)?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        ingested
            .communities
            .par_iter()
            .map(|c| {
                if resume && output::is_done(records_dir, &c.id) {
                    counter!(RESUME_SKIPPED_TOTAL).increment(1);
                    return Outcome::Resumed;
                }
                let t0 = Instant::now();
                let record = engine.score_community(c, ingested.bundle(&c.id));
                histogram!(SCORE_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
                match output::write_record(records_dir, &record) {
                    Ok(_) => {
                        counter!(COMMUNITIES_SCORED_TOTAL).increment(1);
                        Outcome::Scored
                    }
                    Err(e) => {
                        error!(target: "keywords::runner", community = %c.id, error = ?e, "record write failed");
                        counter!(WRITE_ERRORS_TOTAL).increment(1);
                        Outcome::Failed
                    }
                }
            })
            .collect()
    });

    let count = |o: Outcome| outcomes.iter().filter(|x| **x == o).count();
    Ok(RunSummary {
        communities: ingested.communities.len(),
        scored: count(Outcome::Scored),
        resumed: count(Outcome::Resumed),
        failed: count(Outcome::Failed),
        skipped_records: ingested.skipped.len(),
    })
}

/// Full scoring run from the given sources into `cfg.run.output_dir`.
pub async fn run_score(
    cfg: KeywordsConfig,
    communities: &dyn CommunitySource,
    posts: &dyn PostSource,
) -> Result<RunSummary> {
    let ingested = ingest::load_all(communities, posts).await?;
    let output_dir = cfg.run.output_dir.clone();
    output::write_skipped(&output_dir, &ingested.skipped)?;

    let records_dir = output_dir.join(RECORDS_DIR);
    let cache_dir = cfg.run.cache_dir.clone();
    let resume = cfg.run.resume;
    let workers = worker_count(&cfg);

    let summary = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
        let engine = KeywordEngine::prepare(
            cfg,
            &ingested.communities,
            &ingested.bundles,
            Some(&cache_dir),
        )?;
        score_all(&engine, &ingested, &records_dir, resume, workers)
    })
    .await
    .context("scoring task panicked")??;

    info!(
        target: "keywords::runner",
        communities = summary.communities,
        scored = summary.scored,
        resumed = summary.resumed,
        failed = summary.failed,
        skipped_records = summary.skipped_records,
        "scoring run finished"
    );
    Ok(summary)
}

/// Rerank-only pass over existing records: embedding stage plus renormalisation, rewritten in
/// place. Never touches DF state. Returns the number of records rewritten.
pub async fn run_rerank(cfg: &KeywordsConfig, records_dir: PathBuf) -> Result<usize> {
    let pipeline = Pipeline::rerank_only(cfg);
    let workers = worker_count(cfg);

    let rewritten = tokio::task::spawn_blocking(move || -> Result<usize> {
        let paths = output::list_records(&records_dir)?;
        let pool = build_pool(workers)?;
        let done: Vec<bool> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let Some(record) = output::read_record(path) else {
                        warn!(target: "keywords::rerank", path = %path.display(), "unreadable record left as is");
                        return false;
                    };
                    let record = pipeline.run(record);
                    match output::write_record(&records_dir, &record) {
                        Ok(_) => true,
                        Err(e) => {
                            error!(target: "keywords::rerank", path = %path.display(), error = ?e, "record rewrite failed");
                            counter!(WRITE_ERRORS_TOTAL).increment(1);
                            false
                        }
                    }
                })
                .collect()
        });
        Ok(done.into_iter().filter(|d| *d).count())
    })
    .await
    .context("rerank task panicked")??;

    info!(target: "keywords::rerank", rewritten, "rerank pass finished");
    Ok(rewritten)
}
