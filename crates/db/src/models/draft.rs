use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::text::{char_count, normalize_keyword};
use uuid::Uuid;

use super::{
    clip::Clip, document::RichDocument, platform::SocialPlatform, schedule::ScheduledItem,
};

pub const MAX_KEYWORDS: usize = 10;

pub const DEFAULT_TITLE: &str = "New Podcast Episode";
pub const DEFAULT_DESCRIPTION: &str = "Discover this exciting new podcast episode...";
pub const DEFAULT_BODY: &str = "Start your blog post here...";
pub const DEFAULT_KEYWORDS: [&str; 2] = ["podcast", "episode"];

/// Rejected edits. The draft is left untouched when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Maximum 10 keywords allowed.")]
    KeywordLimit,
    #[error("Keyword '{0}' is already added")]
    DuplicateKeyword(String),
    #[error("Keyword cannot be empty")]
    EmptyKeyword,
    #[error("{platform} text is {len} characters, the limit is {max}")]
    SocialTextTooLong {
        platform: SocialPlatform,
        len: usize,
        max: usize,
    },
    #[error("Please complete all fields and select at least one platform")]
    IncompleteSchedule,
    #[error("'{0}' is not a suggested tag")]
    UnknownSuggestion(String),
    #[error("Clip {id} is invalid: {reason}")]
    InvalidClip { id: Uuid, reason: String },
}

/// Ordered, lowercase, duplicate-free keyword list capped at [`MAX_KEYWORDS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize untrusted input, silently dropping empties, duplicates and
    /// anything past the cap.
    pub fn from_lenient<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for keyword in raw {
            if set.len() == MAX_KEYWORDS {
                break;
            }
            let _ = set.insert(keyword.as_ref());
        }
        set
    }

    /// Add a keyword, returning its normalized form.
    pub fn insert(&mut self, raw: &str) -> Result<&str, ValidationError> {
        let keyword = normalize_keyword(raw).ok_or(ValidationError::EmptyKeyword)?;
        if self.0.contains(&keyword) {
            return Err(ValidationError::DuplicateKeyword(keyword));
        }
        if self.0.len() >= MAX_KEYWORDS {
            return Err(ValidationError::KeywordLimit);
        }
        self.0.push(keyword);
        Ok(self.0.last().map(String::as_str).unwrap_or_default())
    }

    /// Returns whether the keyword was present.
    pub fn remove(&mut self, raw: &str) -> bool {
        let Some(keyword) = normalize_keyword(raw) else {
            return false;
        };
        let before = self.0.len();
        self.0.retain(|k| *k != keyword);
        self.0.len() != before
    }

    /// The first keyword, which the scoring rubrics treat as the focus term.
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn contains(&self, raw: &str) -> bool {
        normalize_keyword(raw).is_some_and(|k| self.0.contains(&k))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for KeywordSet {
    type Error = ValidationError;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for keyword in &raw {
            set.insert(keyword)?;
        }
        Ok(set)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.0
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Conversational,
    Authoritative,
    Friendly,
    Informative,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tone::Professional => "professional",
            Tone::Conversational => "conversational",
            Tone::Authoritative => "authoritative",
            Tone::Friendly => "friendly",
            Tone::Informative => "informative",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "conversational" => Ok(Tone::Conversational),
            "authoritative" => Ok(Tone::Authoritative),
            "friendly" => Ok(Tone::Friendly),
            "informative" => Ok(Tone::Informative),
            _ => Err(format!("Unknown tone: {}", s)),
        }
    }
}

/// Editable state of one episode, shared by every stage
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct EpisodeDraft {
    pub episode_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<RichDocument>,
    #[serde(default)]
    #[ts(type = "Array<string>")]
    pub keywords: KeywordSet,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub social_text: BTreeMap<SocialPlatform, String>,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub schedule: Vec<ScheduledItem>,
    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
}

/// Fields to shallow-merge into a draft. `social_text` merges per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub body: Option<RichDocument>,
    pub keywords: Option<Vec<String>>,
    pub tone: Option<Tone>,
    pub description: Option<String>,
    pub social_text: Option<BTreeMap<SocialPlatform, String>>,
    pub clips: Option<Vec<Clip>>,
    pub schedule: Option<Vec<ScheduledItem>>,
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        self == &DraftPatch::default()
    }
}

impl From<&EpisodeDraft> for DraftPatch {
    fn from(draft: &EpisodeDraft) -> Self {
        Self {
            title: draft.title.clone(),
            body: draft.body.clone(),
            keywords: Some(draft.keywords.as_slice().to_vec()),
            tone: draft.tone,
            description: draft.description.clone(),
            social_text: Some(draft.social_text.clone()),
            clips: Some(draft.clips.clone()),
            schedule: Some(draft.schedule.clone()),
        }
    }
}

/// Every clip must be a valid range and ids must be unique within the set.
pub fn check_clips(clips: &[Clip]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for clip in clips {
        if let Some(reason) = clip.range_problem() {
            return Err(ValidationError::InvalidClip {
                id: clip.id,
                reason: reason.to_string(),
            });
        }
        if !seen.insert(clip.id) {
            return Err(ValidationError::InvalidClip {
                id: clip.id,
                reason: "duplicate id".to_string(),
            });
        }
    }
    Ok(())
}

pub fn check_social_text(platform: SocialPlatform, text: &str) -> Result<(), ValidationError> {
    let len = char_count(text);
    let max = platform.max_length();
    if len > max {
        return Err(ValidationError::SocialTextTooLong { platform, len, max });
    }
    Ok(())
}

impl EpisodeDraft {
    /// An empty draft; every field is unpopulated.
    pub fn new(episode_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            title: None,
            body: None,
            keywords: KeywordSet::new(),
            tone: None,
            description: None,
            social_text: BTreeMap::new(),
            clips: Vec::new(),
            schedule: Vec::new(),
            last_saved: None,
        }
    }

    /// The fixed draft used when neither the remote nor the local cache has
    /// anything for this episode.
    pub fn placeholder(episode_id: impl Into<String>) -> Self {
        Self {
            title: Some(DEFAULT_TITLE.to_string()),
            body: Some(RichDocument::from_plain_text(DEFAULT_BODY)),
            keywords: KeywordSet::from_lenient(DEFAULT_KEYWORDS),
            tone: Some(Tone::Professional),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
            social_text: SocialPlatform::ALL
                .iter()
                .map(|p| (*p, p.default_text().to_string()))
                .collect(),
            ..Self::new(episode_id)
        }
    }

    pub fn title_text(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(RichDocument::plain_text)
            .unwrap_or_default()
    }

    /// Equality over the user-editable fields, ignoring `last_saved`.
    pub fn editable_eq(&self, other: &EpisodeDraft) -> bool {
        self.episode_id == other.episode_id
            && self.title == other.title
            && self.body == other.body
            && self.keywords == other.keywords
            && self.tone == other.tone
            && self.description == other.description
            && self.social_text == other.social_text
            && self.clips == other.clips
            && self.schedule == other.schedule
    }

    /// Validate every provided field, then merge them in. Nothing changes
    /// unless the whole patch is valid.
    pub fn apply_patch(&mut self, patch: DraftPatch) -> Result<(), ValidationError> {
        let keywords = patch.keywords.map(KeywordSet::try_from).transpose()?;
        if let Some(social) = &patch.social_text {
            for (platform, text) in social {
                check_social_text(*platform, text)?;
            }
        }
        if let Some(clips) = &patch.clips {
            check_clips(clips)?;
        }

        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(body) = patch.body {
            self.body = Some(body);
        }
        if let Some(keywords) = keywords {
            self.keywords = keywords;
        }
        if let Some(tone) = patch.tone {
            self.tone = Some(tone);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(social) = patch.social_text {
            self.social_text.extend(social);
        }
        if let Some(clips) = patch.clips {
            self.clips = clips;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        Ok(())
    }

    /// Copy over every field this draft has not populated yet.
    pub fn fill_missing_from(&mut self, other: &EpisodeDraft) {
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.body.as_ref().is_none_or(RichDocument::is_empty) {
            self.body = other.body.clone().or(self.body.take());
        }
        if self.keywords.is_empty() {
            self.keywords = other.keywords.clone();
        }
        if self.tone.is_none() {
            self.tone = other.tone;
        }
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        for (platform, text) in &other.social_text {
            self.social_text
                .entry(*platform)
                .or_insert_with(|| text.clone());
        }
        if self.clips.is_empty() {
            self.clips = other.clips.clone();
        }
        if self.schedule.is_empty() {
            self.schedule = other.schedule.clone();
        }
    }
}
