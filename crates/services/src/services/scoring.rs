//! Content quality ("SEO") scoring.
//!
//! A score is a pure function of the draft snapshot and the stage being
//! edited. Each stage with a rubric sums weighted components, clamps the
//! total to 0..=100 and rounds it; the pass/fail checks shown next to the
//! score are computed from the same snapshot.

use db::models::draft::{EpisodeDraft, KeywordSet};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::text::{char_count, contains_phrase, word_count};

use super::stage::Stage;

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct ScoreCheck {
    pub passed: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct ScoreReport {
    pub value: u8,
    pub checks: Vec<ScoreCheck>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_value(value: u8) -> Self {
        if value >= 80 {
            ScoreBand::Good
        } else if value >= 50 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        };
        write!(f, "{}", s)
    }
}

impl ScoreReport {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_value(self.value)
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Description,
    Body,
}

/// Credit for a text whose length should fall inside `min..=max` chars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandCredit {
    pub min: usize,
    pub max: usize,
    pub weight: f64,
}

impl BandCredit {
    /// Full weight inside the band, scaled linearly below it, nothing for
    /// empty text or text past the upper bound.
    pub fn credit(&self, len: usize) -> f64 {
        if len == 0 || len > self.max {
            0.0
        } else if len >= self.min {
            self.weight
        } else {
            self.weight * len as f64 / self.min as f64
        }
    }

    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Length { field: TextField, band: BandCredit },
    PerKeyword { per: f64, cap: f64 },
    /// `(min_words, credit)` pairs; the highest threshold reached wins
    BodyWords(Vec<(usize, f64)>),
    PrimaryKeywordIn { field: TextField, weight: f64 },
    AnyKeywordIn { field: TextField, weight: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    LengthWithin { field: TextField, min: usize, max: usize },
    MinKeywords(usize),
    MinBodyWords(usize),
    PrimaryKeywordIn(TextField),
    AnyKeywordIn(TextField),
}

struct Snapshot<'a> {
    title: &'a str,
    description: &'a str,
    body: String,
    keywords: &'a KeywordSet,
}

impl<'a> Snapshot<'a> {
    fn of(draft: &'a EpisodeDraft) -> Self {
        Self {
            title: draft.title_text().trim(),
            description: draft.description_text().trim(),
            body: draft.body_text(),
            keywords: &draft.keywords,
        }
    }

    fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Title => self.title,
            TextField::Description => self.description,
            TextField::Body => &self.body,
        }
    }

    fn primary_in(&self, field: TextField) -> bool {
        self.keywords
            .primary()
            .is_some_and(|kw| contains_phrase(self.text(field), kw))
    }

    fn any_in(&self, field: TextField) -> bool {
        let text = self.text(field);
        self.keywords.iter().any(|kw| contains_phrase(text, kw))
    }
}

impl Component {
    fn contribution(&self, snap: &Snapshot<'_>) -> f64 {
        match self {
            Component::Length { field, band } => band.credit(char_count(snap.text(*field))),
            Component::PerKeyword { per, cap } => (per * snap.keywords.len() as f64).min(*cap),
            Component::BodyWords(tiers) => {
                let words = word_count(&snap.body);
                tiers
                    .iter()
                    .filter(|(min, _)| words >= *min)
                    .map(|(_, credit)| *credit)
                    .fold(0.0, f64::max)
            }
            Component::PrimaryKeywordIn { field, weight } => {
                if snap.primary_in(*field) { *weight } else { 0.0 }
            }
            Component::AnyKeywordIn { field, weight } => {
                if snap.any_in(*field) { *weight } else { 0.0 }
            }
        }
    }
}

impl Criterion {
    fn holds(&self, snap: &Snapshot<'_>) -> bool {
        match self {
            Criterion::LengthWithin { field, min, max } => {
                (*min..=*max).contains(&char_count(snap.text(*field)))
            }
            Criterion::MinKeywords(n) => snap.keywords.len() >= *n,
            Criterion::MinBodyWords(n) => word_count(&snap.body) >= *n,
            Criterion::PrimaryKeywordIn(field) => snap.primary_in(*field),
            Criterion::AnyKeywordIn(field) => snap.any_in(*field),
        }
    }
}

/// Weighted components plus the checks displayed alongside the score
#[derive(Debug, Clone, PartialEq)]
pub struct Rubric {
    pub components: Vec<Component>,
    pub checks: Vec<(Criterion, &'static str)>,
}

const TITLE_BAND: (usize, usize) = (11, 60);
const DESCRIPTION_BAND: (usize, usize) = (51, 160);

impl Rubric {
    pub fn blog() -> Self {
        let (title_min, title_max) = TITLE_BAND;
        Self {
            components: vec![
                Component::Length {
                    field: TextField::Title,
                    band: BandCredit {
                        min: title_min,
                        max: title_max,
                        weight: 20.0,
                    },
                },
                Component::PerKeyword {
                    per: 6.0,
                    cap: 30.0,
                },
                Component::BodyWords(vec![(100, 10.0), (200, 20.0), (300, 35.0)]),
                Component::PrimaryKeywordIn {
                    field: TextField::Body,
                    weight: 15.0,
                },
            ],
            checks: vec![
                (
                    Criterion::LengthWithin {
                        field: TextField::Title,
                        min: title_min,
                        max: title_max,
                    },
                    "Title is 11-60 characters",
                ),
                (Criterion::MinKeywords(3), "At least 3 keywords"),
                (Criterion::MinBodyWords(300), "Body has at least 300 words"),
                (
                    Criterion::PrimaryKeywordIn(TextField::Body),
                    "Primary keyword appears in the body",
                ),
            ],
        }
    }

    pub fn metadata() -> Self {
        let (title_min, title_max) = TITLE_BAND;
        let (desc_min, desc_max) = DESCRIPTION_BAND;
        Self {
            components: vec![
                Component::Length {
                    field: TextField::Title,
                    band: BandCredit {
                        min: title_min,
                        max: title_max,
                        weight: 30.0,
                    },
                },
                Component::Length {
                    field: TextField::Description,
                    band: BandCredit {
                        min: desc_min,
                        max: desc_max,
                        weight: 30.0,
                    },
                },
                Component::PerKeyword {
                    per: 7.0,
                    cap: 20.0,
                },
                Component::AnyKeywordIn {
                    field: TextField::Title,
                    weight: 10.0,
                },
                Component::PrimaryKeywordIn {
                    field: TextField::Description,
                    weight: 10.0,
                },
            ],
            checks: vec![
                (
                    Criterion::LengthWithin {
                        field: TextField::Title,
                        min: title_min,
                        max: title_max,
                    },
                    "Title is 11-60 characters",
                ),
                (
                    Criterion::LengthWithin {
                        field: TextField::Description,
                        min: desc_min,
                        max: desc_max,
                    },
                    "Description is 51-160 characters",
                ),
                (Criterion::MinKeywords(3), "At least 3 tags"),
                (
                    Criterion::AnyKeywordIn(TextField::Title),
                    "A tag appears in the title",
                ),
                (
                    Criterion::PrimaryKeywordIn(TextField::Description),
                    "Primary tag appears in the description",
                ),
            ],
        }
    }

    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Blog => Some(Self::blog()),
            Stage::Metadata => Some(Self::metadata()),
            Stage::Snippets | Stage::Publish => None,
        }
    }

    pub fn evaluate(&self, draft: &EpisodeDraft) -> ScoreReport {
        let snap = Snapshot::of(draft);
        let total: f64 = self
            .components
            .iter()
            .map(|c| c.contribution(&snap))
            .sum();

        ScoreReport {
            value: total.clamp(0.0, 100.0).round() as u8,
            checks: self
                .checks
                .iter()
                .map(|(criterion, description)| ScoreCheck {
                    passed: criterion.holds(&snap),
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}

/// Score the draft for a stage. Stages without a rubric have no score.
pub fn score(draft: &EpisodeDraft, stage: Stage) -> Option<ScoreReport> {
    Rubric::for_stage(stage).map(|rubric| rubric.evaluate(draft))
}
