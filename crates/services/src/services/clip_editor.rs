//! Host surface for clip editing.
//!
//! Owns the media element, the timeline and the gesture controller, and
//! turns their state into a view that any renderer can draw.

use db::models::clip::{Clip, ClipSuggestion};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    gesture::{GestureController, GestureOutcome},
    notices::NoticeBoard,
    timeline::{Timeline, format_time},
};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Fullscreen request was denied: {0}")]
    FullscreenDenied(String),
}

/// Playback element driven by the editor
pub trait MediaElement: Send {
    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), MediaError>;
    fn is_fullscreen(&self) -> bool;
}

/// Media element without a real decoder; time only moves via `advance`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMedia {
    time: f64,
    duration: f64,
    playing: bool,
    muted: bool,
    fullscreen: bool,
    allow_fullscreen: bool,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            allow_fullscreen: true,
            ..Default::default()
        }
    }

    pub fn deny_fullscreen(mut self) -> Self {
        self.allow_fullscreen = false;
        self
    }

    /// Move the playhead forward while playing, stopping at the end.
    pub fn advance(&mut self, seconds: f64) {
        if self.playing && seconds.is_finite() {
            self.time = (self.time + seconds).clamp(0.0, self.duration);
            if self.time >= self.duration {
                self.playing = false;
            }
        }
    }
}

impl MediaElement for SimulatedMedia {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        self.time = seconds.clamp(0.0, self.duration);
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), MediaError> {
        if fullscreen && !self.allow_fullscreen {
            return Err(MediaError::FullscreenDenied(
                "not allowed by the host".to_string(),
            ));
        }
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

/// One clip drawn on the track, in fractions of the track width
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ClipMarker {
    pub id: Uuid,
    pub left: f64,
    pub width: f64,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ClipEditorView {
    pub markers: Vec<ClipMarker>,
    /// `(left, width)` of the range being dragged
    pub provisional: Option<(f64, f64)>,
    pub playhead: f64,
    pub current_time: String,
    pub duration: String,
    pub playing: bool,
    pub muted: bool,
    pub fullscreen: bool,
}

pub struct ClipEditor<M: MediaElement> {
    media: M,
    timeline: Timeline,
    gesture: GestureController,
    notices: NoticeBoard,
}

impl<M: MediaElement> ClipEditor<M> {
    pub fn new(media: M, timeline: Timeline, notices: NoticeBoard) -> Self {
        Self {
            media,
            timeline,
            gesture: GestureController::new(),
            notices,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn selected(&self) -> Option<&Clip> {
        self.gesture.selected().and_then(|id| self.timeline.find(id))
    }

    pub fn clips(&self) -> &[Clip] {
        self.timeline.clips()
    }

    pub fn into_clips(self) -> Vec<Clip> {
        self.timeline.into_clips()
    }

    pub fn pointer_down(&mut self, fraction: f64) {
        self.gesture.pointer_down(&self.timeline, fraction);
    }

    pub fn pointer_move(&mut self, fraction: f64) {
        self.gesture.pointer_move(&self.timeline, fraction);
    }

    pub fn pointer_up(&mut self) -> GestureOutcome {
        let outcome = self.gesture.pointer_up(&mut self.timeline);
        self.announce(&outcome);
        outcome
    }

    pub fn pointer_leave(&mut self) -> GestureOutcome {
        let outcome = self.gesture.pointer_leave(&mut self.timeline);
        self.announce(&outcome);
        outcome
    }

    fn announce(&self, outcome: &GestureOutcome) {
        if let GestureOutcome::Created(_) = outcome {
            self.notices.success("New clip created!");
        }
    }

    /// Clicking a marker selects that clip and seeks to its start.
    pub fn click_marker(&mut self, id: Uuid) -> bool {
        match self.gesture.select_clip(&self.timeline, id) {
            Some(start) => {
                self.media.seek(start);
                true
            }
            None => false,
        }
    }

    pub fn add_suggestions(&mut self, suggestions: &[ClipSuggestion]) -> Vec<Clip> {
        let added = self.timeline.add_suggested(suggestions);
        if !added.is_empty() {
            self.notices
                .success(format!("Added {} suggested clips", added.len()));
        }
        added
    }

    pub fn remove_clip(&mut self, id: Uuid) -> Option<Clip> {
        let removed = self.timeline.remove_clip(id);
        self.gesture.sync_selection(&self.timeline);
        removed
    }

    pub fn relabel(&mut self, id: Uuid, label: impl Into<String>) -> bool {
        self.timeline.relabel(id, label)
    }

    pub fn toggle_play(&mut self) {
        if self.media.is_playing() {
            self.media.pause();
        } else {
            self.media.play();
        }
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.media.is_muted();
        self.media.set_muted(!muted);
    }

    /// Failures surface as a notice; the surface keeps its current mode.
    pub fn toggle_fullscreen(&mut self) {
        let target = !self.media.is_fullscreen();
        if let Err(e) = self.media.set_fullscreen(target) {
            self.notices.error(format!("Error attempting to enable fullscreen: {e}"));
        }
    }

    pub fn view(&self) -> ClipEditorView {
        let selected = self.gesture.selected();
        let markers = self
            .timeline
            .clips()
            .iter()
            .map(|clip| {
                let left = self.timeline.time_to_position(clip.start_seconds);
                let right = self.timeline.time_to_position(clip.end_seconds);
                ClipMarker {
                    id: clip.id,
                    left,
                    width: right - left,
                    label: clip.label.clone(),
                    selected: selected == Some(clip.id),
                }
            })
            .collect();

        let provisional = self.gesture.provisional_range().map(|(start, end)| {
            let left = self.timeline.time_to_position(start);
            (left, self.timeline.time_to_position(end) - left)
        });

        let now = self.media.current_time();
        ClipEditorView {
            markers,
            provisional,
            playhead: self.timeline.time_to_position(now),
            current_time: format_time(now),
            duration: format_time(self.timeline.duration()),
            playing: self.media.is_playing(),
            muted: self.media.is_muted(),
            fullscreen: self.media.is_fullscreen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> (ClipEditor<SimulatedMedia>, NoticeBoard) {
        let notices = NoticeBoard::default();
        let editor = ClipEditor::new(
            SimulatedMedia::new(300.0),
            Timeline::new(300.0),
            notices.clone(),
        );
        (editor, notices)
    }

    #[test]
    fn test_drag_renders_provisional_then_marker() {
        let (mut editor, notices) = editor();
        editor.pointer_down(0.25);
        editor.pointer_move(0.5);
        assert_eq!(editor.view().provisional, Some((0.25, 0.25)));
        assert!(editor.view().markers.is_empty());

        let GestureOutcome::Created(clip) = editor.pointer_up() else {
            panic!("expected a clip");
        };
        let view = editor.view();
        assert!(view.provisional.is_none());
        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.markers[0].left, 0.25);
        assert_eq!(view.markers[0].width, 0.25);
        assert!(view.markers[0].selected);
        assert_eq!(editor.selected().map(|c| c.id), Some(clip.id));
        assert_eq!(notices.active()[0].message, "New clip created!");
    }

    #[test]
    fn test_click_marker_seeks_to_clip_start() {
        let (mut editor, _) = editor();
        let added = editor.add_suggestions(&[ClipSuggestion {
            start_seconds: 120.0,
            end_seconds: 135.0,
            label: None,
        }]);
        assert!(editor.click_marker(added[0].id));
        assert_eq!(editor.media().current_time(), 120.0);
        let view = editor.view();
        assert_eq!(view.current_time, "2:00");
        assert_eq!(view.duration, "5:00");
        assert_eq!(view.playhead, 0.4);
        assert!(!editor.click_marker(Uuid::new_v4()));
    }

    #[test]
    fn test_media_controls() {
        let (mut editor, notices) = editor();
        editor.toggle_play();
        editor.media_mut().advance(10.0);
        assert_eq!(editor.media().current_time(), 10.0);
        editor.toggle_play();
        editor.media_mut().advance(10.0);
        assert_eq!(editor.media().current_time(), 10.0);

        editor.toggle_mute();
        assert!(editor.view().muted);

        let mut denied = ClipEditor::new(
            SimulatedMedia::new(300.0).deny_fullscreen(),
            Timeline::new(300.0),
            notices.clone(),
        );
        denied.toggle_fullscreen();
        assert!(!denied.view().fullscreen);
        assert!(notices.all().iter().any(|n| n.message.contains("fullscreen")));
    }

    #[test]
    fn test_removing_selected_clip_clears_selection() {
        let (mut editor, _) = editor();
        editor.pointer_down(0.0);
        editor.pointer_move(0.1);
        let GestureOutcome::Created(clip) = editor.pointer_up() else {
            panic!("expected a clip");
        };
        assert!(editor.remove_clip(clip.id).is_some());
        assert!(editor.selected().is_none());
        assert!(editor.into_clips().is_empty());
    }
}
