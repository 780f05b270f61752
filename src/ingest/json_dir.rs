// src/ingest/json_dir.rs
//! Directory-of-JSON sources.
//!
//! Communities: every `*.json` / `*.jsonl` file of `communities_dir`, in file-name order (pages).
//! A file is either a JSON array or one JSON object per line.
//!
//! Posts: `<posts_dir>/<community_id>.json`, either an array of posts or
//! `{ "anchor_title": "...", "posts": [...] }`.

use super::types::{Batch, CommunitySource, PostSource, RawCommunity, RawPost, RawPostBundle};
use crate::model::SkipRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MALFORMED: &str = "malformed";

pub struct JsonBatchDir {
    communities_dir: PathBuf,
    posts_dir: PathBuf,
}

impl JsonBatchDir {
    pub fn new(communities_dir: impl Into<PathBuf>, posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            communities_dir: communities_dir.into(),
            posts_dir: posts_dir.into(),
        }
    }
}

async fn list_files(dir: &Path, exts: &[&str]) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("listing {}", dir.display()))?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| exts.contains(&e));
        if matches && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Values of one page: a JSON array, a single object, or JSON lines.
fn parse_page(path: &Path, content: &str, skipped: &mut Vec<SkipRecord>) -> Vec<Value> {
    let label = file_label(path);
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(values) => values,
            Err(e) => {
                warn!(target: "keywords::ingest", file = %label, error = %e, "unparseable page");
                skipped.push(SkipRecord::community(label, MALFORMED));
                Vec::new()
            }
        };
    }
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(v) => out.push(v),
            Err(_) => skipped.push(SkipRecord::community(format!("{label}:{}", i + 1), MALFORMED)),
        }
    }
    out
}

#[async_trait]
impl CommunitySource for JsonBatchDir {
    async fn fetch_communities(&self) -> Result<Batch<RawCommunity>> {
        let mut batch = Batch::default();
        for path in list_files(&self.communities_dir, &["json", "jsonl"]).await? {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let label = file_label(&path);
            for (i, value) in parse_page(&path, &content, &mut batch.skipped)
                .into_iter()
                .enumerate()
            {
                match serde_json::from_value::<RawCommunity>(value) {
                    Ok(raw) => batch.records.push(raw),
                    Err(_) => batch
                        .skipped
                        .push(SkipRecord::community(format!("{label}#{i}"), MALFORMED)),
                }
            }
        }
        debug!(
            target: "keywords::ingest",
            records = batch.records.len(),
            skipped = batch.skipped.len(),
            "community pages read"
        );
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "json-dir"
    }
}

fn parse_bundle(stem: &str, value: Value, skipped: &mut Vec<SkipRecord>) -> Option<RawPostBundle> {
    let (anchor_title, posts) = match value {
        Value::Array(posts) => (None, posts),
        Value::Object(mut obj) => {
            let anchor = obj
                .get("anchor_title")
                .and_then(Value::as_str)
                .map(str::to_string);
            let posts = match obj.remove("posts") {
                Some(Value::Array(p)) => p,
                _ => Vec::new(),
            };
            (anchor, posts)
        }
        _ => {
            skipped.push(SkipRecord::post(stem, MALFORMED));
            return None;
        }
    };
    let mut out = Vec::with_capacity(posts.len());
    for (i, v) in posts.into_iter().enumerate() {
        match serde_json::from_value::<RawPost>(v) {
            Ok(p) => out.push(p),
            Err(_) => skipped.push(SkipRecord::post(format!("{stem}#{i}"), MALFORMED)),
        }
    }
    Some(RawPostBundle {
        community_id: stem.to_string(),
        anchor_title,
        posts: out,
    })
}

#[async_trait]
impl PostSource for JsonBatchDir {
    async fn fetch_posts(&self) -> Result<Batch<RawPostBundle>> {
        let mut batch = Batch::default();
        if !self.posts_dir.is_dir() {
            warn!(target: "keywords::ingest", dir = %self.posts_dir.display(), "no posts directory, scoring without posts");
            return Ok(batch);
        }
        for path in list_files(&self.posts_dir, &["json"]).await? {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            match serde_json::from_str::<Value>(&content) {
                Ok(v) => {
                    if let Some(bundle) = parse_bundle(&stem, v, &mut batch.skipped) {
                        batch.records.push(bundle);
                    }
                }
                Err(_) => batch.skipped.push(SkipRecord::post(stem, MALFORMED)),
            }
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "json-dir"
    }
}
