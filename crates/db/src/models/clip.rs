use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Shortest range that counts as a clip; anything shorter is a tap.
pub const MIN_CLIP_SECONDS: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
    #[default]
    Manual,
    Suggested,
}

/// A named, non-destructive time range of the episode media
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct Clip {
    pub id: Uuid,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub label: String,
    #[serde(default)]
    pub source: ClipSource,
}

impl Clip {
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Inclusive at both ends.
    pub fn contains(&self, seconds: f64) -> bool {
        self.start_seconds <= seconds && seconds <= self.end_seconds
    }

    /// What is wrong with this range, if anything. Checks finite bounds,
    /// `0 <= start < end` and the minimum span.
    pub fn range_problem(&self) -> Option<&'static str> {
        if !self.start_seconds.is_finite() || !self.end_seconds.is_finite() {
            return Some("bounds must be finite");
        }
        if self.start_seconds < 0.0 {
            return Some("start is before the beginning of the episode");
        }
        if self.start_seconds >= self.end_seconds {
            return Some("start must come before end");
        }
        if self.duration() < MIN_CLIP_SECONDS {
            return Some("shorter than 5 seconds");
        }
        None
    }
}

/// A clip proposed by the episode API before it lands on the timeline
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ClipSuggestion {
    #[serde(alias = "start")]
    pub start_seconds: f64,
    #[serde(alias = "end")]
    pub end_seconds: f64,
    #[serde(default)]
    pub label: Option<String>,
}
