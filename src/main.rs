//! Community Keywords — Binary Entrypoint
//!
//! `community-keywords [score]`            full scoring run
//! `community-keywords rerank <records>`   embedding rerank over existing records
//!
//! Paths and tuning come from `config/keywords.toml` (or `$KEYWORDS_CONFIG_PATH`).

use anyhow::{bail, Result};
use community_keywords::config::KeywordsConfig;
use community_keywords::ingest::JsonBatchDir;
use community_keywords::metrics as km;
use community_keywords::output::{METRICS_FILE, RECORDS_DIR};
use community_keywords::runner;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `KEYWORDS_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("community_keywords=info,warn"));
    let json = std::env::var("KEYWORDS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env when present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = KeywordsConfig::load()?;
    let prom = match km::install_recorder() {
        Ok(h) => Some(h),
        Err(e) => {
            warn!(error = ?e, "metrics recorder unavailable");
            None
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output_dir = cfg.run.output_dir.clone();
    match args.first().map(String::as_str) {
        None | Some("score") => {
            let src = JsonBatchDir::new(&cfg.run.communities_dir, &cfg.run.posts_dir);
            runner::run_score(cfg, &src, &src).await?;
        }
        Some("rerank") => {
            let dir = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| output_dir.join(RECORDS_DIR));
            runner::run_rerank(&cfg, dir).await?;
        }
        Some(other) => bail!("unknown command `{other}` (expected `score` or `rerank <records_dir>`)"),
    }

    if let Some(handle) = prom {
        km::write_snapshot(&handle, &output_dir.join(METRICS_FILE))?;
    }
    Ok(())
}
