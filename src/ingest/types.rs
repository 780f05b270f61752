// src/ingest/types.rs
use crate::model::SkipRecord;
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

/// Community record as delivered, before validation. Numeric fields stay loose JSON values so a
/// stray string or float does not reject the whole record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawCommunity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public_description: Option<String>,
    #[serde(default)]
    pub subscribers: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default, alias = "num_comments")]
    pub comment_count: Option<Value>,
    /// Unix seconds or RFC 3339.
    #[serde(default, alias = "created_utc")]
    pub created_at: Option<Value>,
}

/// Posts of one community as delivered (the key is the bundle's file stem).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPostBundle {
    pub community_id: String,
    pub anchor_title: Option<String>,
    pub posts: Vec<RawPost>,
}

/// Records of one fetch plus whatever could not be parsed at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkipRecord>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait CommunitySource: Send + Sync {
    async fn fetch_communities(&self) -> Result<Batch<RawCommunity>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self) -> Result<Batch<RawPostBundle>>;
    fn name(&self) -> &'static str;
}
