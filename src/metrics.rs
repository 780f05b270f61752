// src/metrics.rs
//! Metric names, one-time descriptions and the Prometheus snapshot written after a run.
//!
//! Library code only emits through the `metrics` facade; the binary installs the recorder.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

pub const COMMUNITIES_SCORED_TOTAL: &str = "keywords_communities_scored_total";
pub const RESUME_SKIPPED_TOTAL: &str = "keywords_resume_skipped_total";
pub const RECORDS_SKIPPED_TOTAL: &str = "keywords_records_skipped_total";
pub const DF_REBUILD_TOTAL: &str = "keywords_df_rebuild_total";
pub const RERANK_FALLBACK_TOTAL: &str = "keywords_rerank_fallback_total";
pub const WRITE_ERRORS_TOTAL: &str = "keywords_write_errors_total";
pub const SCORE_MS: &str = "keywords_score_ms";

/// One-time metrics registration (so series carry help text in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(COMMUNITIES_SCORED_TOTAL, "Communities scored and written.");
        describe_counter!(
            RESUME_SKIPPED_TOTAL,
            "Communities skipped because a valid record already exists."
        );
        describe_counter!(
            RECORDS_SKIPPED_TOTAL,
            "Input community/post records skipped during validation."
        );
        describe_counter!(
            DF_REBUILD_TOTAL,
            "Document-frequency caches rejected and rebuilt."
        );
        describe_counter!(
            RERANK_FALLBACK_TOTAL,
            "Embedding rerank fallbacks (model load or inference failure)."
        );
        describe_counter!(WRITE_ERRORS_TOTAL, "Record writes that failed.");
        describe_histogram!(SCORE_MS, "Per-community scoring time in milliseconds.");
    });
}

/// Install the global Prometheus recorder (no HTTP listener).
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing prometheus recorder")?;
    ensure_metrics_described();
    Ok(handle)
}

/// Write the current exposition text atomically to `path`.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    crate::output::write_atomic(path, handle.render().as_bytes())
        .with_context(|| format!("writing metrics snapshot {}", path.display()))
}
