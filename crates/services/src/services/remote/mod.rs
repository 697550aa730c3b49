//! Remote collaborators: the episode API and the document store.
//!
//! Both are reached through traits so the engine can run against the HTTP
//! clients in production and the in-memory fakes in tests or offline mode.

pub mod http;
pub mod memory;

pub use http::{HttpDocumentStore, HttpEpisodeApi};
pub use memory::{MemoryDocumentStore, MemoryEpisodeApi};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::clip::ClipSuggestion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode remote payload: {0}")]
    Decode(String),
    #[error("Remote endpoint is not configured")]
    NotConfigured,
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("No result after {0} polls")]
    Timeout(u32),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
            || matches!(self, RemoteError::Status { status: 404, .. })
    }
}

/// Blog section of the episode payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlogSection {
    #[serde(default, rename = "seo_title", alias = "title")]
    pub title: Option<String>,
    #[serde(default, rename = "blog_content", alias = "content")]
    pub content: Option<String>,
    #[serde(default, rename = "tags", alias = "keywords")]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataSection {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnippetsSection {
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
}

/// `GET /episode/{id}`. Absent sections have not been generated yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EpisodePayload {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub blog: Option<BlogSection>,
    #[serde(default)]
    pub metadata: Option<MetadataSection>,
    #[serde(default)]
    pub snippets: Option<SnippetsSection>,
    #[serde(default)]
    pub clips: Option<Vec<ClipSuggestion>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EpisodePayload {
    pub fn is_empty(&self) -> bool {
        self.blog.is_none()
            && self.metadata.is_none()
            && self.snippets.is_none()
            && self.clips.as_ref().is_none_or(Vec::is_empty)
    }
}

#[async_trait]
pub trait EpisodeApi: Send + Sync {
    async fn get_episode(&self, episode_id: &str) -> Result<EpisodePayload, RemoteError>;

    /// Kick off generation. Completion is observed by polling `get_episode`.
    async fn enhance(&self, episode_id: &str) -> Result<(), RemoteError>;
}

pub type DocumentFields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(default)]
    pub fields: DocumentFields,
}

impl RemoteDocument {
    pub fn episode_id(&self) -> Option<&str> {
        self.fields.get("episode_id").and_then(|v| v.as_str())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents in `collection` whose `episode_id` field equals `episode_id`.
    async fn list(
        &self,
        collection: &str,
        episode_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError>;

    async fn create(
        &self,
        collection: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError>;

    async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError>;
}
