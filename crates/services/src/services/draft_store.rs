//! The active episode draft and its local slot.
//!
//! Loads fall back remote, then local cache, then the placeholder draft.
//! Saves land in the local slot first; the remote write follows in the
//! background and can only ever produce a notice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::{
    draft::{DraftPatch, EpisodeDraft, ValidationError},
    session_slot::{SlotError, SlotRecord},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    notices::NoticeBoard,
    remote::RemoteError,
    slots::SlotStore,
    stage::Stage,
    sync::{RemotePartial, SyncCoordinator, UpsertOutcome},
};

#[derive(Debug, Error)]
pub enum DraftStoreError {
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No draft is loaded")]
    NoActiveDraft,
}

/// Result of a save. The local write has completed; the remote write may
/// still be running.
#[derive(Debug)]
pub struct SaveReceipt {
    pub episode_id: String,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
    remote: Option<JoinHandle<Option<UpsertOutcome>>>,
}

impl SaveReceipt {
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Wait for the remote write. `None` when there was none or it failed.
    pub async fn remote_outcome(self) -> Option<UpsertOutcome> {
        match self.remote {
            Some(handle) => handle.await.ok().flatten(),
            None => None,
        }
    }
}

pub struct DraftStore {
    slots: Arc<dyn SlotStore>,
    sync: Arc<SyncCoordinator>,
    notices: NoticeBoard,
    slot_key: String,
    active: Option<EpisodeDraft>,
    revision: u64,
}

/// Whether a cached draft was saved after the remote copy was last updated.
/// A remote copy without a timestamp never beats a local one.
fn local_is_newer(local: &EpisodeDraft, remote_updated: Option<DateTime<Utc>>) -> bool {
    match (local.last_saved, remote_updated) {
        (Some(saved), Some(updated)) => saved > updated,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

impl DraftStore {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        sync: Arc<SyncCoordinator>,
        notices: NoticeBoard,
        slot_key: impl Into<String>,
    ) -> Self {
        Self {
            slots,
            sync,
            notices,
            slot_key: slot_key.into(),
            active: None,
            revision: 0,
        }
    }

    pub fn active(&self) -> Option<&EpisodeDraft> {
        self.active.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    /// Cached record, or `None` when the slot is empty or unreadable.
    async fn read_cache(&self) -> Option<SlotRecord> {
        let payload = match self.slots.read(&self.slot_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read slot {}: {}", self.slot_key, e);
                return None;
            }
        };
        match SlotRecord::decode(&payload) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unusable slot {}: {}", self.slot_key, e);
                None
            }
        }
    }

    /// Episode id of whatever draft the slot currently holds.
    pub async fn cached_episode_id(&self) -> Option<String> {
        self.read_cache().await.map(|r| r.draft.episode_id)
    }

    /// Hydrate the active draft for `episode_id`. Never fails; every
    /// problem degrades to an older copy or the placeholder.
    pub async fn load(&mut self, episode_id: &str) -> EpisodeDraft {
        let cached = self.read_cache().await;
        let revision = cached.as_ref().map_or(0, |r| r.revision);
        let local = cached
            .map(|r| r.draft)
            .filter(|d| d.episode_id == episode_id);

        let draft = match self.sync.fetch_all(episode_id).await {
            Ok(Some(remote)) => Self::reconcile(episode_id, local, remote),
            Ok(None) => {
                debug!("No remote content for {}", episode_id);
                local.unwrap_or_else(|| EpisodeDraft::placeholder(episode_id))
            }
            Err(RemoteError::NotConfigured) => {
                local.unwrap_or_else(|| EpisodeDraft::placeholder(episode_id))
            }
            Err(e) => {
                warn!("Remote load for {} failed: {}", episode_id, e);
                self.notices
                    .warning("Could not reach the server. Using your local copy.");
                local.unwrap_or_else(|| EpisodeDraft::placeholder(episode_id))
            }
        };

        info!("Loaded draft {} at revision {}", episode_id, revision);
        self.revision = revision;
        self.active = Some(draft.clone());
        draft
    }

    fn reconcile(
        episode_id: &str,
        local: Option<EpisodeDraft>,
        remote: RemotePartial,
    ) -> EpisodeDraft {
        match local {
            Some(mut local) if local_is_newer(&local, remote.updated_at) => {
                debug!("Local copy of {} is newer than the remote", episode_id);
                let mut from_remote = EpisodeDraft::new(episode_id);
                if let Err(e) = from_remote.apply_patch(remote.patch) {
                    warn!("Discarding invalid remote fields for {}: {}", episode_id, e);
                }
                local.fill_missing_from(&from_remote);
                local
            }
            local => {
                let mut base = local.unwrap_or_else(|| EpisodeDraft::placeholder(episode_id));
                if let Err(e) = base.apply_patch(remote.patch) {
                    warn!("Discarding invalid remote fields for {}: {}", episode_id, e);
                }
                base
            }
        }
    }

    /// Validate and merge `patch` into the active draft.
    pub fn patch(&mut self, patch: DraftPatch) -> Result<&EpisodeDraft, DraftStoreError> {
        let draft = self.active.as_mut().ok_or(DraftStoreError::NoActiveDraft)?;
        draft.apply_patch(patch)?;
        Ok(draft)
    }

    /// Returns the normalized keyword.
    pub fn add_keyword(&mut self, raw: &str) -> Result<String, DraftStoreError> {
        let draft = self.active.as_mut().ok_or(DraftStoreError::NoActiveDraft)?;
        Ok(draft.keywords.insert(raw)?.to_string())
    }

    pub fn remove_keyword(&mut self, raw: &str) -> Result<bool, DraftStoreError> {
        let draft = self.active.as_mut().ok_or(DraftStoreError::NoActiveDraft)?;
        Ok(draft.keywords.remove(raw))
    }

    /// Save the active draft, pushing `remote_stage`'s section when given.
    pub async fn save_active(
        &mut self,
        remote_stage: Option<Stage>,
    ) -> Result<SaveReceipt, DraftStoreError> {
        let draft = self.active.clone().ok_or(DraftStoreError::NoActiveDraft)?;
        self.save(draft, remote_stage).await
    }

    /// Stamp, write locally and await it, then dispatch the remote write.
    /// Only a failed local write is an error.
    pub async fn save(
        &mut self,
        mut draft: EpisodeDraft,
        remote_stage: Option<Stage>,
    ) -> Result<SaveReceipt, DraftStoreError> {
        let saved_at = Utc::now();
        draft.last_saved = Some(saved_at);
        let revision = self.revision + 1;

        let payload = SlotRecord::new(revision, draft.clone()).encode()?;
        self.slots.write(&self.slot_key, &payload).await?;
        info!(
            "Saved draft {} locally at revision {}",
            draft.episode_id, revision
        );

        let episode_id = draft.episode_id.clone();
        let remote = remote_stage.map(|stage| self.spawn_remote(stage, draft.clone()));

        self.revision = revision;
        self.active = Some(draft);

        Ok(SaveReceipt {
            episode_id,
            revision,
            saved_at,
            remote,
        })
    }

    fn spawn_remote(
        &self,
        stage: Stage,
        draft: EpisodeDraft,
    ) -> JoinHandle<Option<UpsertOutcome>> {
        let sync = self.sync.clone();
        let notices = self.notices.clone();
        tokio::spawn(async move {
            match sync.upsert_remote(&draft.episode_id, stage, &draft).await {
                Ok(outcome) => Some(outcome),
                Err(RemoteError::NotConfigured) => {
                    debug!("No document store configured, skipping remote save");
                    None
                }
                Err(e) => {
                    warn!(
                        "Remote save of {} for {} failed: {}",
                        stage, draft.episode_id, e
                    );
                    notices.warning(format!(
                        "Saved locally, but syncing {} to the server failed: {}",
                        stage, e
                    ));
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use db::models::draft::{DEFAULT_TITLE, KeywordSet};

    use super::*;
    use crate::services::{
        notices::NoticeLevel,
        remote::{
            BlogSection, EpisodePayload, MemoryDocumentStore, MemoryEpisodeApi, MetadataSection,
        },
        slots::MemorySlotStore,
    };

    struct Fixture {
        slots: Arc<MemorySlotStore>,
        api: Arc<MemoryEpisodeApi>,
        docs: Arc<MemoryDocumentStore>,
        notices: NoticeBoard,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                slots: Arc::new(MemorySlotStore::new()),
                api: Arc::new(MemoryEpisodeApi::new()),
                docs: Arc::new(MemoryDocumentStore::new()),
                notices: NoticeBoard::default(),
            }
        }

        fn store(&self) -> DraftStore {
            let sync = SyncCoordinator::new(
                Some(self.api.clone()),
                Some(self.docs.clone()),
                Duration::from_millis(5),
                3,
            );
            DraftStore::new(
                self.slots.clone(),
                Arc::new(sync),
                self.notices.clone(),
                "current_project",
            )
        }
    }

    fn remote_title(title: &str, updated_at: Option<DateTime<Utc>>) -> EpisodePayload {
        EpisodePayload {
            blog: Some(BlogSection {
                title: Some(title.into()),
                ..Default::default()
            }),
            updated_at,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        store
            .patch(DraftPatch {
                title: Some("AI and Podcasting".into()),
                keywords: Some(vec!["ai".into(), "podcast".into()]),
                description: Some("A short description".into()),
                ..Default::default()
            })
            .unwrap();
        store.add_keyword("Content").unwrap();

        let receipt = store.save_active(Some(Stage::Blog)).await.unwrap();
        assert_eq!(receipt.revision, 1);
        assert!(matches!(
            receipt.remote_outcome().await,
            Some(UpsertOutcome::Created(_))
        ));
        let saved = store.active().unwrap().clone();

        let mut reopened = fx.store();
        let loaded = reopened.load("ep-1").await;
        assert!(loaded.editable_eq(&saved));
        assert_eq!(loaded.keywords, KeywordSet::from_lenient(["ai", "podcast", "content"]));
        assert_eq!(reopened.revision(), 1);
    }

    #[tokio::test]
    async fn test_empty_everything_loads_placeholder() {
        let fx = Fixture::new();
        let draft = fx.store().load("ep-9").await;
        assert_eq!(draft.title.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(draft.keywords.as_slice(), ["podcast", "episode"]);
    }

    #[tokio::test]
    async fn test_cache_for_other_episode_is_ignored() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        store
            .patch(DraftPatch {
                title: Some("Episode one".into()),
                ..Default::default()
            })
            .unwrap();
        store.save_active(None).await.unwrap();

        let other = fx.store().load("ep-2").await;
        assert_eq!(other.title.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(fx.store().cached_episode_id().await.as_deref(), Some("ep-1"));
    }

    #[tokio::test]
    async fn test_malformed_slot_loads_placeholder() {
        let fx = Fixture::new();
        fx.slots.write("current_project", "{not json").await.unwrap();
        let mut store = fx.store();
        let draft = store.load("ep-1").await;
        assert_eq!(draft.title.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_newer_remote_overrides_local() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        store.save_active(None).await.unwrap();

        let later = Utc::now() + ChronoDuration::hours(1);
        fx.api
            .put_episode("ep-1", remote_title("Remote title", Some(later)))
            .await;
        let draft = fx.store().load("ep-1").await;
        assert_eq!(draft.title.as_deref(), Some("Remote title"));
    }

    #[tokio::test]
    async fn test_newer_local_wins_and_remote_fills_gaps() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        let mut draft = store.active().unwrap().clone();
        draft.title = Some("Local title".into());
        draft.description = None;
        store.save(draft, None).await.unwrap();

        let mut payload = remote_title("Remote title", None);
        payload.metadata = Some(MetadataSection {
            description: Some("Remote description".into()),
            ..Default::default()
        });
        fx.api.put_episode("ep-1", payload).await;

        let loaded = fx.store().load("ep-1").await;
        assert_eq!(loaded.title.as_deref(), Some("Local title"));
        assert_eq!(loaded.description.as_deref(), Some("Remote description"));
    }

    #[tokio::test]
    async fn test_unreachable_remote_warns_and_uses_cache() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        store
            .patch(DraftPatch {
                title: Some("Cached".into()),
                ..Default::default()
            })
            .unwrap();
        store.save_active(None).await.unwrap();

        fx.api.set_offline(true);
        let draft = fx.store().load("ep-1").await;
        assert_eq!(draft.title.as_deref(), Some("Cached"));
        assert_eq!(fx.notices.active()[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_invalid_patch_leaves_draft_unchanged() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        let before = store.active().unwrap().clone();

        let err = store
            .patch(DraftPatch {
                title: Some("Changed".into()),
                keywords: Some((0..11).map(|i| format!("k{i}")).collect()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            DraftStoreError::Validation(ValidationError::KeywordLimit)
        ));
        assert_eq!(store.active(), Some(&before));
        assert!(matches!(
            store.add_keyword("podcast"),
            Err(DraftStoreError::Validation(ValidationError::DuplicateKeyword(_)))
        ));
    }

    #[tokio::test]
    async fn test_patch_without_load_fails() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.store().patch(DraftPatch::default()),
            Err(DraftStoreError::NoActiveDraft)
        ));
    }

    #[tokio::test]
    async fn test_local_write_failure_is_returned() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        fx.slots.set_fail_writes(true);

        let err = store.save_active(Some(Stage::Blog)).await.unwrap_err();
        assert!(matches!(err, DraftStoreError::Slot(_)));
        assert_eq!(store.revision(), 0);
        assert!(store.active().unwrap().last_saved.is_none());
        assert!(fx.docs.documents("blog_posts").await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_write_failure_becomes_notice() {
        let fx = Fixture::new();
        let mut store = fx.store();
        store.load("ep-1").await;
        fx.docs.set_offline(true);

        let receipt = store.save_active(Some(Stage::Metadata)).await.unwrap();
        assert!(receipt.has_remote());
        assert!(receipt.remote_outcome().await.is_none());
        assert_eq!(store.revision(), 1);

        let notices = fx.notices.active();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.starts_with("Saved locally"));
    }
}
