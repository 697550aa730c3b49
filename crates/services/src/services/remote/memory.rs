use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DocumentFields, DocumentStore, EpisodeApi, EpisodePayload, RemoteDocument, RemoteError};

struct PendingEnhancement {
    polls_left: u32,
    result: EpisodePayload,
}

/// In-process episode API. Enhancements resolve after a fixed number of
/// reads of the episode.
#[derive(Default)]
pub struct MemoryEpisodeApi {
    episodes: Mutex<HashMap<String, EpisodePayload>>,
    staged: Mutex<HashMap<String, EpisodePayload>>,
    pending: Mutex<HashMap<String, PendingEnhancement>>,
    delay_polls: u32,
    offline: AtomicBool,
    failing_reads: AtomicU32,
    reads: AtomicU64,
}

impl MemoryEpisodeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enhancements become visible on the `polls`-th read after the trigger.
    pub fn with_enhance_delay(mut self, polls: u32) -> Self {
        self.delay_polls = polls;
        self
    }

    pub async fn put_episode(&self, episode_id: &str, payload: EpisodePayload) {
        self.episodes
            .lock()
            .await
            .insert(episode_id.to_string(), payload);
    }

    /// Payload the next `enhance` call for this episode will produce.
    pub async fn stage_enhancement(&self, episode_id: &str, payload: EpisodePayload) {
        self.staged
            .lock()
            .await
            .insert(episode_id.to_string(), payload);
    }

    /// Make every call fail with a network error, as if the backend were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `reads` episode reads with a network error.
    pub fn fail_next_reads(&self, reads: u32) {
        self.failing_reads.store(reads, Ordering::SeqCst);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EpisodeApi for MemoryEpisodeApi {
    async fn get_episode(&self, episode_id: &str) -> Result<EpisodePayload, RemoteError> {
        self.check_online()?;
        if self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RemoteError::Network("connection reset".to_string()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut pending = self.pending.lock().await;
        let ready = match pending.get_mut(episode_id) {
            Some(job) => {
                job.polls_left = job.polls_left.saturating_sub(1);
                job.polls_left == 0
            }
            None => false,
        };
        if ready && let Some(job) = pending.remove(episode_id) {
            self.episodes
                .lock()
                .await
                .insert(episode_id.to_string(), job.result);
        }
        drop(pending);

        self.episodes
            .lock()
            .await
            .get(episode_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(episode_id.to_string()))
    }

    async fn enhance(&self, episode_id: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        let Some(result) = self.staged.lock().await.remove(episode_id) else {
            return Err(RemoteError::Status {
                status: 422,
                body: format!("nothing to enhance for {}", episode_id),
            });
        };
        self.pending.lock().await.insert(
            episode_id.to_string(),
            PendingEnhancement {
                polls_left: self.delay_polls.max(1),
                result,
            },
        );
        Ok(())
    }
}

/// In-process document store keyed by collection
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<RemoteDocument>>>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of a collection, in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        self.collections
            .lock()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(
        &self,
        collection: &str,
        episode_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.check_online()?;
        Ok(self
            .documents(collection)
            .await
            .into_iter()
            .filter(|doc| doc.episode_id() == Some(episode_id))
            .collect())
    }

    async fn create(
        &self,
        collection: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError> {
        self.check_online()?;
        let id = format!("doc_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let doc = RemoteDocument { id, fields };
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument, RemoteError> {
        self.check_online()?;
        let mut collections = self.collections.lock().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == doc_id))
            .ok_or_else(|| RemoteError::NotFound(doc_id.to_string()))?;
        doc.fields.extend(fields);
        Ok(doc.clone())
    }
}
