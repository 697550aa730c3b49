//! Reconciliation between the active draft and the remote services.
//!
//! Reads come from the episode API, one section per stage. Writes go to the
//! document store, one document per episode in each stage's collection.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use db::models::{
    clip::ClipSuggestion,
    document::RichDocument,
    draft::{DraftPatch, EpisodeDraft, KeywordSet},
    platform::SocialPlatform,
};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};
use utils::text::{char_count, truncate_chars};

use super::{
    config::WorkbenchConfig,
    progress::OperationProgress,
    remote::{
        DocumentFields, DocumentStore, EpisodeApi, EpisodePayload, HttpDocumentStore,
        HttpEpisodeApi, RemoteDocument, RemoteError,
    },
    scoring,
    stage::Stage,
};

/// Remote fields mapped onto the draft, plus the remote's update time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotePartial {
    pub patch: DraftPatch,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(RemoteDocument),
    Updated(RemoteDocument),
}

impl UpsertOutcome {
    pub fn document(&self) -> &RemoteDocument {
        match self {
            UpsertOutcome::Created(doc) | UpsertOutcome::Updated(doc) => doc,
        }
    }
}

pub struct SyncCoordinator {
    api: Option<Arc<dyn EpisodeApi>>,
    docs: Option<Arc<dyn DocumentStore>>,
    poll_interval: Duration,
    max_polls: u32,
}

fn fill_missing(into: &mut DraftPatch, from: DraftPatch) {
    into.title = into.title.take().or(from.title);
    into.body = into.body.take().or(from.body);
    into.keywords = into.keywords.take().or(from.keywords);
    into.tone = into.tone.or(from.tone);
    into.description = into.description.take().or(from.description);
    into.social_text = into.social_text.take().or(from.social_text);
    into.clips = into.clips.take().or(from.clips);
    into.schedule = into.schedule.take().or(from.schedule);
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn fit_snippet(platform: SocialPlatform, text: &str) -> String {
    let max = platform.max_length();
    if char_count(text) > max {
        warn!(
            "Remote {} snippet exceeds {} characters, truncating",
            platform, max
        );
        return truncate_chars(text, max);
    }
    text.to_string()
}

impl SyncCoordinator {
    pub fn new(
        api: Option<Arc<dyn EpisodeApi>>,
        docs: Option<Arc<dyn DocumentStore>>,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            api,
            docs,
            poll_interval,
            max_polls,
        }
    }

    /// HTTP clients for whichever endpoints the config names.
    pub fn from_config(config: &WorkbenchConfig) -> Self {
        let api = config.api_url.as_deref().map(|url| {
            Arc::new(HttpEpisodeApi::new(url, config.api_key.clone())) as Arc<dyn EpisodeApi>
        });
        let docs = config.docs_url.as_deref().map(|url| {
            Arc::new(HttpDocumentStore::new(url, config.api_key.clone()))
                as Arc<dyn DocumentStore>
        });
        Self::new(
            api,
            docs,
            config.enhance_poll_interval,
            config.enhance_max_polls,
        )
    }

    /// No remote at all; every call reports `NotConfigured`.
    pub fn offline() -> Self {
        Self::new(None, None, Duration::from_secs(2), 30)
    }

    fn api(&self) -> Result<&Arc<dyn EpisodeApi>, RemoteError> {
        self.api.as_ref().ok_or(RemoteError::NotConfigured)
    }

    fn docs(&self) -> Result<&Arc<dyn DocumentStore>, RemoteError> {
        self.docs.as_ref().ok_or(RemoteError::NotConfigured)
    }

    /// The raw episode payload. A missing episode reads as an empty one.
    pub async fn fetch_payload(&self, episode_id: &str) -> Result<EpisodePayload, RemoteError> {
        match self.api()?.get_episode(episode_id).await {
            Err(e) if e.is_not_found() => Ok(EpisodePayload::default()),
            other => other,
        }
    }

    /// Map one stage's section of the payload onto draft fields.
    pub fn section_patch(payload: &EpisodePayload, stage: Stage) -> Option<DraftPatch> {
        match stage {
            Stage::Blog => {
                let blog = payload.blog.as_ref()?;
                let patch = DraftPatch {
                    title: non_blank(&blog.title),
                    body: blog
                        .content
                        .as_deref()
                        .filter(|c| !c.trim().is_empty())
                        .map(RichDocument::from_markup),
                    keywords: blog
                        .keywords
                        .as_ref()
                        .map(|k| KeywordSet::from_lenient(k).into()),
                    tone: blog.tone.as_deref().and_then(|t| t.parse().ok()),
                    ..Default::default()
                };
                (!patch.is_empty()).then_some(patch)
            }
            Stage::Metadata => {
                let meta = payload.metadata.as_ref()?;
                let patch = DraftPatch {
                    title: non_blank(&meta.title),
                    description: non_blank(&meta.description),
                    keywords: meta
                        .tags
                        .as_ref()
                        .map(|k| KeywordSet::from_lenient(k).into()),
                    ..Default::default()
                };
                (!patch.is_empty()).then_some(patch)
            }
            Stage::Snippets => {
                let snippets = payload.snippets.as_ref()?;
                let social: BTreeMap<SocialPlatform, String> = [
                    (SocialPlatform::Twitter, &snippets.twitter),
                    (SocialPlatform::Instagram, &snippets.instagram),
                    (SocialPlatform::TikTok, &snippets.tiktok),
                ]
                .into_iter()
                .filter_map(|(platform, text)| {
                    non_blank(text).map(|t| (platform, fit_snippet(platform, &t)))
                })
                .collect();
                (!social.is_empty()).then(|| DraftPatch {
                    social_text: Some(social),
                    ..Default::default()
                })
            }
            Stage::Publish => None,
        }
    }

    /// One stage's remote section. `None` means it has not been generated.
    pub async fn fetch_remote(
        &self,
        episode_id: &str,
        stage: Stage,
    ) -> Result<Option<RemotePartial>, RemoteError> {
        let payload = self.fetch_payload(episode_id).await?;
        Ok(
            Self::section_patch(&payload, stage).map(|patch| RemotePartial {
                patch,
                updated_at: payload.updated_at,
            }),
        )
    }

    /// Every generated section folded into one patch. Earlier stages win
    /// where sections overlap.
    pub async fn fetch_all(&self, episode_id: &str) -> Result<Option<RemotePartial>, RemoteError> {
        let payload = self.fetch_payload(episode_id).await?;
        let mut merged = DraftPatch::default();
        for stage in Stage::ALL {
            if let Some(patch) = Self::section_patch(&payload, stage) {
                fill_missing(&mut merged, patch);
            }
        }
        if merged.is_empty() {
            return Ok(None);
        }
        Ok(Some(RemotePartial {
            patch: merged,
            updated_at: payload.updated_at,
        }))
    }

    pub async fn suggested_clips(
        &self,
        episode_id: &str,
    ) -> Result<Vec<ClipSuggestion>, RemoteError> {
        Ok(self
            .fetch_payload(episode_id)
            .await?
            .clips
            .unwrap_or_default())
    }

    /// Fields written to the stage's collection document.
    pub fn stage_fields(stage: Stage, draft: &EpisodeDraft) -> DocumentFields {
        let mut fields = DocumentFields::new();
        fields.insert("episode_id".into(), json!(draft.episode_id));
        fields.insert(
            "last_updated".into(),
            json!(draft.last_saved.unwrap_or_else(Utc::now).to_rfc3339()),
        );

        match stage {
            Stage::Blog => {
                fields.insert("seo_title".into(), json!(draft.title_text()));
                fields.insert(
                    "blog_content".into(),
                    json!(draft.body.as_ref().map(RichDocument::to_markup).unwrap_or_default()),
                );
                fields.insert("tags".into(), json!(draft.keywords.as_slice()));
                fields.insert("tone".into(), json!(draft.tone.unwrap_or_default()));
            }
            Stage::Metadata => {
                fields.insert("title".into(), json!(draft.title_text()));
                fields.insert("description".into(), json!(draft.description_text()));
                fields.insert("tags".into(), json!(draft.keywords.as_slice()));
                let seo_score = scoring::score(draft, Stage::Metadata).map(|r| r.value);
                fields.insert("seo_score".into(), json!(seo_score));
            }
            Stage::Snippets => {
                for platform in SocialPlatform::ALL {
                    let text = draft.social_text.get(&platform).cloned().unwrap_or_default();
                    fields.insert(platform.to_string(), json!(text));
                }
                fields.insert("clips".into(), json!(draft.clips));
            }
            Stage::Publish => {
                fields.insert("items".into(), json!(draft.schedule));
            }
        }
        fields
    }

    /// Update the episode's document in the stage's collection, creating
    /// it when none exists yet.
    pub async fn upsert_remote(
        &self,
        episode_id: &str,
        stage: Stage,
        draft: &EpisodeDraft,
    ) -> Result<UpsertOutcome, RemoteError> {
        let docs = self.docs()?;
        let collection = stage.collection();
        let fields = Self::stage_fields(stage, draft);

        let existing = docs.list(collection, episode_id).await?;
        if existing.len() > 1 {
            warn!(
                "{} documents in {} for episode {}, updating the first",
                existing.len(),
                collection,
                episode_id
            );
        }

        match existing.first() {
            Some(doc) => {
                let updated = docs.update(collection, &doc.id, fields).await?;
                info!("Updated {} document {} for {}", collection, updated.id, episode_id);
                Ok(UpsertOutcome::Updated(updated))
            }
            None => {
                let created = docs.create(collection, fields).await?;
                info!("Created {} document {} for {}", collection, created.id, episode_id);
                Ok(UpsertOutcome::Created(created))
            }
        }
    }

    /// Trigger generation and poll until the blog section appears or
    /// changes. Progress is published on `progress` throughout.
    pub async fn enhance(
        &self,
        episode_id: &str,
        progress: &watch::Sender<OperationProgress>,
    ) -> Result<EpisodePayload, RemoteError> {
        let result = self.run_enhance(episode_id, progress).await;
        match &result {
            Ok(_) => {
                progress.send_replace(OperationProgress::Succeeded);
            }
            Err(e) => {
                progress.send_replace(OperationProgress::Failed {
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_enhance(
        &self,
        episode_id: &str,
        progress: &watch::Sender<OperationProgress>,
    ) -> Result<EpisodePayload, RemoteError> {
        let api = self.api()?;
        // completion means the blog differs from this baseline
        let baseline = self.fetch_payload(episode_id).await?.blog;

        progress.send_replace(OperationProgress::started(self.max_polls));
        api.enhance(episode_id).await?;
        info!("Enhancement requested for {}", episode_id);

        for poll in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            progress.send_modify(OperationProgress::record_poll);

            match self.fetch_payload(episode_id).await {
                Ok(payload) if payload.blog.is_some() && payload.blog != baseline => {
                    info!("Enhancement for {} finished after {} polls", episode_id, poll);
                    return Ok(payload);
                }
                Ok(_) => {}
                Err(e) => warn!("Enhancement poll {} for {} failed: {}", poll, episode_id, e),
            }
        }

        Err(RemoteError::Timeout(self.max_polls))
    }
}
