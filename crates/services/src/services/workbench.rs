//! Composition root for the editorial stages.
//!
//! A [`Workbench`] owns the draft store. Mounting a stage hands out a
//! [`StageSession`] carrying a mount token; once another stage mounts, the
//! old session is stale and its late results are dropped.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use db::models::{
    draft::{DraftPatch, EpisodeDraft, ValidationError},
    platform::SocialPlatform,
    schedule::ScheduledItem,
};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    clip_editor::{ClipEditor, MediaElement},
    config::WorkbenchConfig,
    draft_store::{DraftStore, DraftStoreError, SaveReceipt},
    notices::NoticeBoard,
    progress::OperationProgress,
    remote::{DocumentStore, EpisodeApi, EpisodePayload, RemoteError},
    schedule::{self, ScheduleRequest},
    scoring::{self, ScoreReport},
    slots::SlotStore,
    snippets,
    stage::Stage,
    sync::SyncCoordinator,
    tags,
    timeline::Timeline,
};

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("This stage session was replaced by a newer mount")]
    StaleSession,
    #[error(transparent)]
    Store(DraftStoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<DraftStoreError> for WorkbenchError {
    fn from(e: DraftStoreError) -> Self {
        match e {
            DraftStoreError::Validation(v) => WorkbenchError::Validation(v),
            other => WorkbenchError::Store(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnhanceOutcome {
    /// Merged into the draft; carries the recomputed score
    Applied(Option<ScoreReport>),
    /// The session was remounted while the enhancement ran
    Discarded,
}

pub struct Workbench {
    config: WorkbenchConfig,
    store: Arc<Mutex<DraftStore>>,
    sync: Arc<SyncCoordinator>,
    notices: NoticeBoard,
    generation: Arc<AtomicU64>,
}

impl Workbench {
    pub fn new(
        config: WorkbenchConfig,
        slots: Arc<dyn SlotStore>,
        api: Option<Arc<dyn EpisodeApi>>,
        docs: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        let sync = SyncCoordinator::new(
            api,
            docs,
            config.enhance_poll_interval,
            config.enhance_max_polls,
        );
        Self::with_sync(config, slots, sync)
    }

    /// HTTP remotes for whichever endpoints `config` names.
    pub fn from_config(config: WorkbenchConfig, slots: Arc<dyn SlotStore>) -> Self {
        let sync = SyncCoordinator::from_config(&config);
        Self::with_sync(config, slots, sync)
    }

    fn with_sync(config: WorkbenchConfig, slots: Arc<dyn SlotStore>, sync: SyncCoordinator) -> Self {
        let sync = Arc::new(sync);
        let notices = NoticeBoard::default();
        let store = DraftStore::new(slots, sync.clone(), notices.clone(), config.slot_key.clone());
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
            sync,
            notices,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn sync(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    /// Mount `stage` for an episode: the explicit id, else the cached
    /// draft's, else a fresh one. Every earlier session becomes stale.
    pub async fn mount(&self, stage: Stage, episode_id: Option<&str>) -> StageSession {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut store = self.store.lock().await;

        let explicit = episode_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let episode_id = match explicit {
            Some(id) => id,
            None => match store.cached_episode_id().await {
                Some(id) => id,
                None => Uuid::new_v4().to_string(),
            },
        };

        store.load(&episode_id).await;
        drop(store);
        info!("Mounted {} stage for {} (token {})", stage, episode_id, token);

        let (progress, _) = watch::channel(OperationProgress::Idle);
        StageSession {
            token,
            stage,
            episode_id,
            timeline_seconds: self.config.timeline_seconds,
            store: self.store.clone(),
            sync: self.sync.clone(),
            notices: self.notices.clone(),
            generation: self.generation.clone(),
            progress,
        }
    }
}

/// One mounted stage working on the active draft
pub struct StageSession {
    token: u64,
    stage: Stage,
    episode_id: String,
    timeline_seconds: f64,
    store: Arc<Mutex<DraftStore>>,
    sync: Arc<SyncCoordinator>,
    notices: NoticeBoard,
    generation: Arc<AtomicU64>,
    progress: watch::Sender<OperationProgress>,
}

impl StageSession {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.token
    }

    fn ensure_current(&self) -> Result<(), WorkbenchError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(WorkbenchError::StaleSession)
        }
    }

    pub fn progress(&self) -> watch::Receiver<OperationProgress> {
        self.progress.subscribe()
    }

    pub async fn draft(&self) -> Result<EpisodeDraft, WorkbenchError> {
        self.ensure_current()?;
        let store = self.store.lock().await;
        Ok(store
            .active()
            .cloned()
            .ok_or(DraftStoreError::NoActiveDraft)?)
    }

    /// Score of the active draft under this stage's rubric, if it has one.
    pub async fn score(&self) -> Result<Option<ScoreReport>, WorkbenchError> {
        let draft = self.draft().await?;
        Ok(scoring::score(&draft, self.stage))
    }

    pub async fn patch(&self, patch: DraftPatch) -> Result<Option<ScoreReport>, WorkbenchError> {
        self.ensure_current()?;
        let mut store = self.store.lock().await;
        let draft = store.patch(patch)?;
        Ok(scoring::score(draft, self.stage))
    }

    pub async fn add_keyword(&self, raw: &str) -> Result<Option<ScoreReport>, WorkbenchError> {
        self.ensure_current()?;
        let mut store = self.store.lock().await;
        store.add_keyword(raw)?;
        Ok(store.active().and_then(|d| scoring::score(d, self.stage)))
    }

    pub async fn remove_keyword(&self, raw: &str) -> Result<Option<ScoreReport>, WorkbenchError> {
        self.ensure_current()?;
        let mut store = self.store.lock().await;
        store.remove_keyword(raw)?;
        Ok(store.active().and_then(|d| scoring::score(d, self.stage)))
    }

    /// Suggested tags the draft does not carry yet.
    pub async fn suggest_tags(&self) -> Result<Vec<&'static str>, WorkbenchError> {
        Ok(tags::suggest_tags(&self.draft().await?))
    }

    /// Add one of the suggested tags. The keyword cap and duplicate rules
    /// apply as for any other keyword.
    pub async fn add_suggested_tag(
        &self,
        tag: &str,
    ) -> Result<Option<ScoreReport>, WorkbenchError> {
        if !tags::SUGGESTED_TAGS.iter().any(|t| *t == tag) {
            return Err(ValidationError::UnknownSuggestion(tag.to_string()).into());
        }
        self.add_keyword(tag).await
    }

    /// Persist locally and push this stage's section to the remote.
    pub async fn save(&self) -> Result<SaveReceipt, WorkbenchError> {
        self.ensure_current()?;
        let mut store = self.store.lock().await;
        Ok(store.save_active(Some(self.stage)).await?)
    }

    /// Save, then report the stage to mount next.
    pub async fn advance(&self) -> Result<Option<Stage>, WorkbenchError> {
        self.save().await?;
        Ok(self.stage.next())
    }

    pub async fn retreat(&self) -> Result<Option<Stage>, WorkbenchError> {
        self.save().await?;
        Ok(self.stage.previous())
    }

    /// Run the remote enhancement to completion without touching the draft.
    pub async fn fetch_enhancement(&self) -> Result<EpisodePayload, WorkbenchError> {
        self.ensure_current()?;
        match self.sync.enhance(&self.episode_id, &self.progress).await {
            Ok(payload) => Ok(payload),
            Err(e) => {
                warn!("Enhancement of {} failed: {}", self.episode_id, e);
                self.notices
                    .warning(format!("Content enhancement failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Merge a finished enhancement, unless this session went stale while
    /// it ran.
    pub async fn apply_enhancement(
        &self,
        payload: EpisodePayload,
    ) -> Result<EnhanceOutcome, WorkbenchError> {
        if !self.is_current() {
            info!(
                "Discarding enhancement for {} from stale session {}",
                self.episode_id, self.token
            );
            return Ok(EnhanceOutcome::Discarded);
        }
        let Some(patch) = SyncCoordinator::section_patch(&payload, Stage::Blog) else {
            return Ok(EnhanceOutcome::Applied(self.score().await?));
        };
        let score = self.patch(patch).await?;
        self.notices.success("Content enhanced successfully!");
        Ok(EnhanceOutcome::Applied(score))
    }

    pub async fn enhance(&self) -> Result<EnhanceOutcome, WorkbenchError> {
        let payload = self.fetch_enhancement().await?;
        self.apply_enhancement(payload).await
    }

    /// Clip editor seeded with the draft's clips.
    pub async fn clip_editor<M: MediaElement>(
        &self,
        media: M,
    ) -> Result<ClipEditor<M>, WorkbenchError> {
        let draft = self.draft().await?;
        let timeline = Timeline::with_clips(self.timeline_seconds, draft.clips);
        Ok(ClipEditor::new(media, timeline, self.notices.clone()))
    }

    /// Write the editor's clip set back into the draft.
    pub async fn commit_clips<M: MediaElement>(
        &self,
        editor: &ClipEditor<M>,
    ) -> Result<(), WorkbenchError> {
        self.patch(DraftPatch {
            clips: Some(editor.clips().to_vec()),
            ..Default::default()
        })
        .await?;
        Ok(())
    }

    /// Pull remote clip suggestions into the editor. Remote failures become
    /// a notice and add nothing.
    pub async fn suggest_clips<M: MediaElement>(
        &self,
        editor: &mut ClipEditor<M>,
    ) -> Result<usize, WorkbenchError> {
        self.ensure_current()?;
        let suggestions = match self.sync.suggested_clips(&self.episode_id).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Clip suggestions for {} failed: {}", self.episode_id, e);
                self.notices.warning("Could not load suggested clips.");
                return Ok(0);
            }
        };
        if !self.is_current() {
            return Ok(0);
        }
        Ok(editor.add_suggestions(&suggestions).len())
    }

    /// Template snippets for the active draft. Nothing is written back.
    pub async fn suggest_snippets(
        &self,
    ) -> Result<BTreeMap<SocialPlatform, String>, WorkbenchError> {
        Ok(snippets::suggest_snippets(&self.draft().await?))
    }

    /// Validate a publish request and append it to the draft's schedule.
    pub async fn schedule(&self, request: ScheduleRequest) -> Result<ScheduledItem, WorkbenchError> {
        let item = schedule::schedule(request)?;
        let mut items = self.draft().await?.schedule;
        items.push(item.clone());
        self.patch(DraftPatch {
            schedule: Some(items),
            ..Default::default()
        })
        .await?;
        self.notices.success("Content scheduled successfully!");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, time::Duration};

    use chrono::{NaiveDate, NaiveTime};
    use db::models::{clip::ClipSuggestion, draft::DEFAULT_TITLE, platform::PublishTarget};

    use super::*;
    use crate::services::{
        clip_editor::SimulatedMedia,
        gesture::GestureOutcome,
        remote::{BlogSection, MemoryDocumentStore, MemoryEpisodeApi},
        slots::MemorySlotStore,
    };

    struct Fixture {
        slots: Arc<MemorySlotStore>,
        api: Arc<MemoryEpisodeApi>,
        docs: Arc<MemoryDocumentStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                slots: Arc::new(MemorySlotStore::new()),
                api: Arc::new(MemoryEpisodeApi::new().with_enhance_delay(2)),
                docs: Arc::new(MemoryDocumentStore::new()),
            }
        }

        fn workbench(&self) -> Workbench {
            let config = WorkbenchConfig::offline().with_polling(Duration::from_millis(5), 5);
            Workbench::new(
                config,
                self.slots.clone(),
                Some(self.api.clone()),
                Some(self.docs.clone()),
            )
        }
    }

    fn enhanced() -> EpisodePayload {
        EpisodePayload {
            blog: Some(BlogSection {
                title: Some("Enhanced title".into()),
                content: Some("<p>Generated body</p>".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_patch_returns_fresh_score() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Blog, Some("ep-1")).await;
        let before = session.score().await.unwrap().unwrap();

        let after = session
            .patch(DraftPatch {
                title: Some("Short".into()),
                ..Default::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_ne!(before, after);

        let same = session
            .patch(DraftPatch::from(&session.draft().await.unwrap()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same, after);
    }

    #[tokio::test]
    async fn test_keyword_limit_surfaces_as_validation() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Metadata, Some("ep-1")).await;
        for i in 0..8 {
            session.add_keyword(&format!("topic{i}")).await.unwrap();
        }
        let err = session.add_keyword("one-too-many").await.unwrap_err();
        assert!(matches!(
            err,
            WorkbenchError::Validation(ValidationError::KeywordLimit)
        ));
        assert!(session.remove_keyword("topic0").await.is_ok());
    }

    #[tokio::test]
    async fn test_suggested_tags_respect_keyword_rules() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Metadata, Some("ep-1")).await;
        assert_eq!(session.suggest_tags().await.unwrap().len(), 4);

        let before = session.score().await.unwrap().unwrap();
        let after = session.add_suggested_tag("seo").await.unwrap().unwrap();
        assert!(after.value >= before.value);
        assert!(!session.suggest_tags().await.unwrap().contains(&"seo"));
        assert!(matches!(
            session.add_suggested_tag("seo").await,
            Err(WorkbenchError::Validation(ValidationError::DuplicateKeyword(_)))
        ));
        assert!(matches!(
            session.add_suggested_tag("crypto").await,
            Err(WorkbenchError::Validation(ValidationError::UnknownSuggestion(_)))
        ));

        session.remove_keyword("seo").await.unwrap();
        assert!(session.suggest_tags().await.unwrap().contains(&"seo"));

        // placeholder keywords plus seven more fill the cap
        for i in 0..8 {
            session.add_keyword(&format!("topic{i}")).await.unwrap();
        }
        assert!(matches!(
            session.add_suggested_tag("blogging").await,
            Err(WorkbenchError::Validation(ValidationError::KeywordLimit))
        ));
        assert_eq!(session.draft().await.unwrap().keywords.len(), 10);
    }

    #[tokio::test]
    async fn test_invalid_clip_patch_leaves_draft_unchanged() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Snippets, Some("ep-1")).await;
        let before = session.draft().await.unwrap();
        let id = Uuid::new_v4();
        let clip = |start: f64, end: f64| db::models::clip::Clip {
            id,
            start_seconds: start,
            end_seconds: end,
            label: "bad".into(),
            source: Default::default(),
        };

        let err = session
            .patch(DraftPatch {
                clips: Some(vec![clip(50.0, 10.0), clip(-20.0, -18.0)]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkbenchError::Validation(ValidationError::InvalidClip { .. })
        ));
        assert_eq!(session.draft().await.unwrap(), before);

        let editor = session.clip_editor(SimulatedMedia::new(300.0)).await.unwrap();
        assert!(editor.view().markers.iter().all(|m| m.width > 0.0));
    }

    #[tokio::test]
    async fn test_advance_saves_and_remount_uses_cache() {
        let fx = Fixture::new();
        let workbench = fx.workbench();
        let session = workbench.mount(Stage::Blog, Some("ep-1")).await;
        session
            .patch(DraftPatch {
                title: Some("Saved on advance".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(session.advance().await.unwrap(), Some(Stage::Metadata));

        let next = fx.workbench().mount(Stage::Metadata, None).await;
        assert_eq!(next.episode_id(), "ep-1");
        assert_eq!(
            next.draft().await.unwrap().title.as_deref(),
            Some("Saved on advance")
        );
        assert_eq!(next.retreat().await.unwrap(), Some(Stage::Blog));
    }

    #[tokio::test]
    async fn test_mount_without_cache_generates_id() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Blog, None).await;
        assert!(Uuid::parse_str(session.episode_id()).is_ok());
        assert_eq!(
            session.draft().await.unwrap().title.as_deref(),
            Some(DEFAULT_TITLE)
        );
    }

    #[tokio::test]
    async fn test_enhancement_applies_blog_section() {
        let fx = Fixture::new();
        fx.api.stage_enhancement("ep-1", enhanced()).await;
        let session = fx.workbench().mount(Stage::Blog, Some("ep-1")).await;
        let progress = session.progress();

        let outcome = session.enhance().await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::Applied(Some(_))));
        assert_eq!(*progress.borrow(), OperationProgress::Succeeded);
        let draft = session.draft().await.unwrap();
        assert_eq!(draft.title.as_deref(), Some("Enhanced title"));
        assert_eq!(draft.body_text(), "Generated body");
    }

    #[tokio::test]
    async fn test_stale_enhancement_is_discarded() {
        let fx = Fixture::new();
        fx.api.stage_enhancement("ep-1", enhanced()).await;
        let workbench = fx.workbench();
        let first = workbench.mount(Stage::Blog, Some("ep-1")).await;
        let payload = first.fetch_enhancement().await.unwrap();

        let second = workbench.mount(Stage::Metadata, Some("ep-1")).await;
        assert_eq!(
            first.apply_enhancement(payload).await.unwrap(),
            EnhanceOutcome::Discarded
        );
        assert!(matches!(
            first.patch(DraftPatch::default()).await,
            Err(WorkbenchError::StaleSession)
        ));
        assert!(second.is_current());
        assert!(!first.is_current());
    }

    #[tokio::test]
    async fn test_failed_enhancement_warns() {
        let fx = Fixture::new();
        let workbench = fx.workbench();
        let session = workbench.mount(Stage::Blog, Some("ep-1")).await;
        let err = session.enhance().await.unwrap_err();
        assert!(matches!(err, WorkbenchError::Remote(RemoteError::Status { status: 422, .. })));
        assert!(matches!(
            *session.progress().borrow(),
            OperationProgress::Failed { .. }
        ));
        assert!(workbench.notices().active()[0].message.starts_with("Content enhancement failed"));
    }

    #[tokio::test]
    async fn test_clips_flow_into_the_draft() {
        let fx = Fixture::new();
        fx.api
            .put_episode(
                "ep-1",
                EpisodePayload {
                    clips: Some(vec![ClipSuggestion {
                        start_seconds: 200.0,
                        end_seconds: 230.0,
                        label: Some("Highlight".into()),
                    }]),
                    ..Default::default()
                },
            )
            .await;
        let session = fx.workbench().mount(Stage::Snippets, Some("ep-1")).await;
        let mut editor = session.clip_editor(SimulatedMedia::new(300.0)).await.unwrap();

        editor.pointer_down(0.1);
        editor.pointer_move(0.2);
        assert!(matches!(editor.pointer_up(), GestureOutcome::Created(_)));
        assert_eq!(session.suggest_clips(&mut editor).await.unwrap(), 1);
        session.commit_clips(&editor).await.unwrap();

        let clips = session.draft().await.unwrap().clips;
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].label, "Clip from 30s to 60s");

        let reopened = session.clip_editor(SimulatedMedia::new(300.0)).await.unwrap();
        assert_eq!(reopened.view().markers.len(), 2);
    }

    #[tokio::test]
    async fn test_schedule_appends_items() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Publish, Some("ep-1")).await;
        let request = ScheduleRequest {
            title: "Launch".into(),
            date: NaiveDate::from_ymd_opt(2026, 11, 2),
            time: NaiveTime::from_hms_opt(9, 30, 0),
            targets: BTreeSet::from([PublishTarget::YouTube]),
            ..Default::default()
        };
        let item = session.schedule(request.clone()).await.unwrap();
        assert_eq!(session.draft().await.unwrap().schedule, vec![item]);

        let err = session
            .schedule(ScheduleRequest {
                targets: BTreeSet::new(),
                ..request
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkbenchError::Validation(ValidationError::IncompleteSchedule)
        ));
        assert_eq!(session.draft().await.unwrap().schedule.len(), 1);
    }

    #[tokio::test]
    async fn test_snippet_suggestions_follow_title() {
        let fx = Fixture::new();
        let session = fx.workbench().mount(Stage::Snippets, Some("ep-1")).await;
        session
            .patch(DraftPatch {
                title: Some("Deep Work".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let suggestions = session.suggest_snippets().await.unwrap();
        assert!(suggestions[&SocialPlatform::Twitter].contains("Deep Work"));
    }
}
