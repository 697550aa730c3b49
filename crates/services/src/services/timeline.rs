use db::models::clip::{Clip, ClipSource, ClipSuggestion, MIN_CLIP_SECONDS};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClipRejection {
    #[error("Clip must be at least 5 seconds long (got {span:.1}s)")]
    TooShort { span: f64 },
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Clip set over a media timeline of fixed duration
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    duration: f64,
    clips: Vec<Clip>,
}

impl Timeline {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: finite_or_zero(duration).max(0.0),
            clips: Vec::new(),
        }
    }

    /// Timeline seeded with clips persisted in a draft. Clips that are not
    /// a valid range inside `[0, duration]` are dropped, and a duplicate id
    /// only keeps its first copy.
    pub fn with_clips(duration: f64, clips: Vec<Clip>) -> Self {
        let mut timeline = Self::new(duration);
        for clip in clips {
            if let Some(reason) = clip.range_problem() {
                tracing::warn!("Dropping clip {}: {}", clip.id, reason);
                continue;
            }
            if clip.end_seconds > timeline.duration {
                tracing::warn!(
                    "Dropping clip {}: ends at {:.1}s past the {:.1}s timeline",
                    clip.id,
                    clip.end_seconds,
                    timeline.duration
                );
                continue;
            }
            if timeline.find(clip.id).is_some() {
                tracing::warn!("Dropping clip {}: duplicate id", clip.id);
                continue;
            }
            timeline.clips.push(clip);
        }
        timeline
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn into_clips(self) -> Vec<Clip> {
        self.clips
    }

    pub fn find(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Fraction of the track width (0..=1) to seconds.
    pub fn position_to_time(&self, fraction: f64) -> f64 {
        finite_or_zero(fraction).clamp(0.0, 1.0) * self.duration
    }

    /// Seconds to a fraction of the track width. Zero on an empty timeline.
    pub fn time_to_position(&self, seconds: f64) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.clamp_time(seconds) / self.duration
    }

    pub fn clamp_time(&self, seconds: f64) -> f64 {
        finite_or_zero(seconds).clamp(0.0, self.duration)
    }

    pub fn add_clip(
        &mut self,
        start: f64,
        end: f64,
        label: impl Into<String>,
    ) -> Result<Clip, ClipRejection> {
        self.insert(start, end, label.into(), ClipSource::Manual)
    }

    /// Place suggested ranges on the timeline, returning the ones accepted.
    pub fn add_suggested(&mut self, suggestions: &[ClipSuggestion]) -> Vec<Clip> {
        suggestions
            .iter()
            .filter_map(|s| {
                let label = s.label.clone().unwrap_or_else(|| {
                    format!(
                        "Suggested clip {} - {}",
                        format_time(s.start_seconds),
                        format_time(s.end_seconds)
                    )
                });
                match self.insert(s.start_seconds, s.end_seconds, label, ClipSource::Suggested) {
                    Ok(clip) => Some(clip),
                    Err(e) => {
                        tracing::debug!("Skipping suggestion: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    fn insert(
        &mut self,
        start: f64,
        end: f64,
        label: String,
        source: ClipSource,
    ) -> Result<Clip, ClipRejection> {
        let a = self.clamp_time(start);
        let b = self.clamp_time(end);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };

        let span = end - start;
        if span < MIN_CLIP_SECONDS {
            return Err(ClipRejection::TooShort { span });
        }

        let clip = Clip {
            id: Uuid::new_v4(),
            start_seconds: start,
            end_seconds: end,
            label,
            source,
        };
        self.clips.push(clip.clone());
        Ok(clip)
    }

    pub fn remove_clip(&mut self, id: Uuid) -> Option<Clip> {
        let idx = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(idx))
    }

    /// Labels are the only part of a clip that changes after creation.
    pub fn relabel(&mut self, id: Uuid, label: impl Into<String>) -> bool {
        match self.clips.iter_mut().find(|c| c.id == id) {
            Some(clip) => {
                clip.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Clips covering `seconds`, inclusive at both ends.
    pub fn clips_overlapping(&self, seconds: f64) -> Vec<&Clip> {
        let t = finite_or_zero(seconds);
        self.clips.iter().filter(|c| c.contains(t)).collect()
    }
}

/// `m:ss`, with negative or non-finite input shown as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = finite_or_zero(seconds).max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_clip_enforces_minimum_span() {
        let mut timeline = Timeline::new(300.0);
        assert!(matches!(
            timeline.add_clip(10.0, 12.0, "short"),
            Err(ClipRejection::TooShort { .. })
        ));
        let clip = timeline.add_clip(10.0, 20.0, "ok").unwrap();
        assert_eq!(clip.source, ClipSource::Manual);

        let hits = timeline.clips_overlapping(15.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, clip.id);
        assert_eq!(timeline.clips_overlapping(20.0).len(), 1);
        assert!(timeline.clips_overlapping(20.5).is_empty());
    }

    #[test]
    fn test_add_clip_orders_and_clamps() {
        let mut timeline = Timeline::new(300.0);
        let clip = timeline.add_clip(320.0, 290.0, "tail").unwrap();
        assert_eq!(clip.start_seconds, 290.0);
        assert_eq!(clip.end_seconds, 300.0);

        // clamping can shrink a range below the minimum
        assert!(timeline.add_clip(298.0, 400.0, "edge").is_err());
    }

    #[test]
    fn test_overlapping_clips_are_allowed() {
        let mut timeline = Timeline::new(300.0);
        timeline.add_clip(0.0, 30.0, "a").unwrap();
        timeline.add_clip(20.0, 40.0, "b").unwrap();
        assert_eq!(timeline.clips_overlapping(25.0).len(), 2);
    }

    #[test]
    fn test_position_mapping_round_trips() {
        let timeline = Timeline::new(300.0);
        for i in 0..=100 {
            let f = i as f64 / 100.0;
            let back = timeline.time_to_position(timeline.position_to_time(f));
            assert!((back - f).abs() < 1e-9);
        }
        assert_eq!(timeline.position_to_time(1.5), 300.0);
        assert_eq!(timeline.position_to_time(-0.2), 0.0);
        assert_eq!(timeline.position_to_time(f64::NAN), 0.0);
        assert_eq!(timeline.time_to_position(f64::NAN), 0.0);
        assert_eq!(Timeline::new(0.0).time_to_position(10.0), 0.0);
        assert_eq!(Timeline::new(f64::NAN).duration(), 0.0);
    }

    #[test]
    fn test_remove_and_relabel() {
        let mut timeline = Timeline::new(300.0);
        let clip = timeline.add_clip(30.0, 45.0, "intro").unwrap();
        assert!(timeline.relabel(clip.id, "Cold open"));
        assert_eq!(timeline.find(clip.id).unwrap().label, "Cold open");
        assert_eq!(timeline.remove_clip(clip.id).unwrap().id, clip.id);
        assert!(timeline.remove_clip(clip.id).is_none());
        assert!(!timeline.relabel(clip.id, "gone"));
    }

    #[test]
    fn test_add_suggested_skips_invalid_ranges() {
        let mut timeline = Timeline::new(300.0);
        let added = timeline.add_suggested(&[
            ClipSuggestion {
                start_seconds: 30.0,
                end_seconds: 45.0,
                label: None,
            },
            ClipSuggestion {
                start_seconds: 100.0,
                end_seconds: 102.0,
                label: Some("too short".into()),
            },
        ]);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].source, ClipSource::Suggested);
        assert_eq!(added[0].label, "Suggested clip 0:30 - 0:45");
    }

    #[test]
    fn test_with_clips_drops_invalid_ranges() {
        let clip = |id: Uuid, start: f64, end: f64| Clip {
            id,
            start_seconds: start,
            end_seconds: end,
            label: "c".into(),
            source: ClipSource::Manual,
        };
        let kept = Uuid::new_v4();
        let timeline = Timeline::with_clips(
            300.0,
            vec![
                clip(kept, 10.0, 20.0),
                clip(Uuid::new_v4(), 50.0, 10.0),
                clip(Uuid::new_v4(), -20.0, -18.0),
                clip(Uuid::new_v4(), 290.0, 320.0),
                clip(Uuid::new_v4(), 100.0, 102.0),
                clip(kept, 30.0, 40.0),
            ],
        );
        assert_eq!(timeline.clips().len(), 1);
        assert_eq!(timeline.clips()[0].id, kept);
        assert_eq!(timeline.clips()[0].start_seconds, 10.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }
}
