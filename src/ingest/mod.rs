// src/ingest/mod.rs
pub mod json_dir;
pub mod types;

pub use json_dir::JsonBatchDir;
pub use types::{Batch, CommunitySource, PostSource, RawCommunity, RawPost, RawPostBundle};

use crate::metrics::{ensure_metrics_described, RECORDS_SKIPPED_TOTAL};
use crate::model::{Community, Post, PostBundle, SkipRecord};
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

pub const SKIP_MISSING_ID: &str = "missing_id";
pub const SKIP_DUPLICATE: &str = "duplicate";
pub const SKIP_EMPTY_TITLE: &str = "empty_title";
pub const SKIP_UNKNOWN_COMMUNITY: &str = "unknown_community";

/// Canonical community key: trimmed, lowercase, `r/` prefix removed, no whitespace.
pub fn canonical_key(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let stripped = lower
        .strip_prefix("/r/")
        .or_else(|| lower.strip_prefix("r/"))
        .unwrap_or(&lower);
    stripped.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unix seconds (number or numeric string) or RFC 3339.
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    let from_secs = |secs: f64| Utc.timestamp_opt(secs as i64, 0).single();
    match v {
        Value::Number(n) => n.as_f64().and_then(from_secs),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_secs))
        }
        _ => None,
    }
}

/// Validated input for one scoring run.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub communities: Vec<Community>,
    /// Keyed by canonical community id; only communities that exist.
    pub bundles: BTreeMap<String, PostBundle>,
    pub skipped: Vec<SkipRecord>,
}

impl Ingested {
    pub fn bundle(&self, community_id: &str) -> Option<&PostBundle> {
        self.bundles.get(community_id)
    }
}

fn validate_communities(raw: Vec<RawCommunity>, skipped: &mut Vec<SkipRecord>) -> Vec<Community> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for (i, r) in raw.into_iter().enumerate() {
        let key_src = non_empty(&r.id).or_else(|| non_empty(&r.name));
        let key = key_src.map(canonical_key).unwrap_or_default();
        if key.is_empty() {
            skipped.push(SkipRecord::community(format!("#{i}"), SKIP_MISSING_ID));
            continue;
        }
        if !seen.insert(key.clone()) {
            skipped.push(SkipRecord::community(key, SKIP_DUPLICATE));
            continue;
        }
        let name = non_empty(&r.name)
            .or_else(|| non_empty(&r.display_name))
            .or_else(|| non_empty(&r.id))
            .unwrap_or(&key)
            .to_string();
        let display_name = non_empty(&r.display_name).unwrap_or(&name).to_string();
        let description = non_empty(&r.description)
            .or_else(|| non_empty(&r.public_description))
            .unwrap_or_default()
            .to_string();
        out.push(Community {
            id: key,
            display_name,
            name,
            description,
            subscribers: r.subscribers.as_ref().and_then(as_u64),
        });
    }
    out
}

fn validate_bundles(
    raw: Vec<RawPostBundle>,
    known: &HashSet<&str>,
    skipped: &mut Vec<SkipRecord>,
) -> BTreeMap<String, PostBundle> {
    let mut out: BTreeMap<String, PostBundle> = BTreeMap::new();
    for b in raw {
        let key = canonical_key(&b.community_id);
        if !known.contains(key.as_str()) {
            let n = b.posts.len().max(1);
            skipped.extend((0..n).map(|_| SkipRecord::post(key.clone(), SKIP_UNKNOWN_COMMUNITY)));
            continue;
        }
        let bundle = out.entry(key.clone()).or_insert_with(|| PostBundle {
            community_id: key.clone(),
            anchor_title: None,
            posts: Vec::new(),
        });
        if bundle.anchor_title.is_none() {
            bundle.anchor_title = non_empty(&b.anchor_title).map(str::to_string);
        }
        for (i, p) in b.posts.into_iter().enumerate() {
            let Some(title) = non_empty(&p.title) else {
                skipped.push(SkipRecord::post(format!("{key}#{i}"), SKIP_EMPTY_TITLE));
                continue;
            };
            bundle.posts.push(Post {
                title: title.to_string(),
                score: p.score.as_ref().and_then(as_i64).unwrap_or(0),
                comment_count: p.comment_count.as_ref().and_then(as_u64).unwrap_or(0),
                created_at: p.created_at.as_ref().and_then(parse_timestamp),
            });
        }
    }
    out
}

/// Validate raw batches. Bad records are skipped individually, never the whole batch.
pub fn validate(communities: Batch<RawCommunity>, posts: Batch<RawPostBundle>) -> Ingested {
    ensure_metrics_described();

    let mut skipped = communities.skipped;
    skipped.extend(posts.skipped);

    let communities = validate_communities(communities.records, &mut skipped);
    let known: HashSet<&str> = communities.iter().map(|c| c.id.as_str()).collect();
    let bundles = validate_bundles(posts.records, &known, &mut skipped);

    for s in &skipped {
        counter!(RECORDS_SKIPPED_TOTAL, "kind" => s.kind.clone(), "reason" => s.reason.clone())
            .increment(1);
    }
    if !skipped.is_empty() {
        warn!(target: "keywords::ingest", skipped = skipped.len(), "input records skipped");
    }

    Ingested {
        communities,
        bundles,
        skipped,
    }
}

/// Fetch from both sources and validate.
pub async fn load_all(communities: &dyn CommunitySource, posts: &dyn PostSource) -> Result<Ingested> {
    let c = communities.fetch_communities().await?;
    let p = posts.fetch_posts().await?;
    let ingested = validate(c, p);
    info!(
        target: "keywords::ingest",
        source = communities.name(),
        communities = ingested.communities.len(),
        bundles = ingested.bundles.len(),
        skipped = ingested.skipped.len(),
        "input loaded"
    );
    Ok(ingested)
}
