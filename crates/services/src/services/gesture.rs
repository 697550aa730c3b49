//! Pointer-drag interpretation for the clip timeline.
//!
//! A press starts a drag, moves extend it, and releasing (or leaving the
//! track) either commits a clip or, for ranges under the minimum span,
//! counts as a tap. Positions arrive as fractions of the track width.

use db::models::clip::{Clip, MIN_CLIP_SECONDS};
use uuid::Uuid;

use super::timeline::{ClipRejection, Timeline};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging { start: f64, end: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Pointer released without an active drag
    Ignored,
    /// Range too short to be a clip
    Tap { at: f64 },
    Created(Clip),
    Rejected(ClipRejection),
}

#[derive(Debug, Clone)]
pub struct GestureController {
    state: GestureState,
    selected: Option<Uuid>,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            selected: None,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn pointer_down(&mut self, timeline: &Timeline, fraction: f64) {
        let at = timeline.position_to_time(fraction);
        tracing::debug!("drag start at {:.2}s", at);
        self.state = GestureState::Dragging { start: at, end: at };
    }

    pub fn pointer_move(&mut self, timeline: &Timeline, fraction: f64) {
        if let GestureState::Dragging { end, .. } = &mut self.state {
            *end = timeline.position_to_time(fraction);
        }
    }

    /// The range being dragged, ordered, for live rendering only.
    pub fn provisional_range(&self) -> Option<(f64, f64)> {
        match self.state {
            GestureState::Dragging { start, end } => Some((start.min(end), start.max(end))),
            GestureState::Idle => None,
        }
    }

    pub fn pointer_up(&mut self, timeline: &mut Timeline) -> GestureOutcome {
        let GestureState::Dragging { start, end } = self.state else {
            return GestureOutcome::Ignored;
        };
        self.state = GestureState::Idle;

        let (lo, hi) = (start.min(end), start.max(end));
        if hi - lo < MIN_CLIP_SECONDS {
            tracing::debug!("tap at {:.2}s", lo);
            return GestureOutcome::Tap { at: lo };
        }

        let label = format!("Clip from {}s to {}s", lo.round(), hi.round());
        match timeline.add_clip(lo, hi, label) {
            Ok(clip) => {
                tracing::debug!("created clip {} ({:.2}s-{:.2}s)", clip.id, lo, hi);
                self.selected = Some(clip.id);
                GestureOutcome::Created(clip)
            }
            Err(rejection) => GestureOutcome::Rejected(rejection),
        }
    }

    /// Leaving the track ends the drag exactly like releasing the pointer.
    pub fn pointer_leave(&mut self, timeline: &mut Timeline) -> GestureOutcome {
        self.pointer_up(timeline)
    }

    /// Select an existing clip directly, bypassing the drag state machine.
    /// Returns the time playback should seek to.
    pub fn select_clip(&mut self, timeline: &Timeline, id: Uuid) -> Option<f64> {
        let clip = timeline.find(id)?;
        self.selected = Some(clip.id);
        Some(clip.start_seconds)
    }

    /// Forget the selection if it points at a clip that no longer exists.
    pub fn sync_selection(&mut self, timeline: &Timeline) {
        if let Some(id) = self.selected
            && timeline.find(id).is_none()
        {
            self.selected = None;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_drag_is_a_tap() {
        let mut timeline = Timeline::new(300.0);
        let mut gesture = GestureController::new();

        gesture.pointer_down(&timeline, 0.1);
        gesture.pointer_move(&timeline, 0.103);
        let outcome = gesture.pointer_up(&mut timeline);

        assert!(matches!(outcome, GestureOutcome::Tap { .. }));
        assert!(timeline.clips().is_empty());
        assert_eq!(gesture.state(), GestureState::Idle);
        assert!(gesture.selected().is_none());
    }

    #[test]
    fn test_press_without_move_creates_nothing() {
        let mut timeline = Timeline::new(300.0);
        let mut gesture = GestureController::new();
        gesture.pointer_down(&timeline, 0.5);
        assert_eq!(gesture.provisional_range(), Some((150.0, 150.0)));
        assert!(matches!(
            gesture.pointer_up(&mut timeline),
            GestureOutcome::Tap { .. }
        ));
    }

    #[test]
    fn test_backwards_drag_creates_and_selects_clip() {
        let mut timeline = Timeline::new(300.0);
        let mut gesture = GestureController::new();

        gesture.pointer_down(&timeline, 0.5);
        gesture.pointer_move(&timeline, 0.25);
        assert_eq!(gesture.provisional_range(), Some((75.0, 150.0)));

        let GestureOutcome::Created(clip) = gesture.pointer_leave(&mut timeline) else {
            panic!("expected a clip");
        };
        assert_eq!(clip.start_seconds, 75.0);
        assert_eq!(clip.end_seconds, 150.0);
        assert_eq!(clip.label, "Clip from 75s to 150s");
        assert_eq!(gesture.selected(), Some(clip.id));
        assert!(gesture.provisional_range().is_none());
    }

    #[test]
    fn test_moves_and_releases_while_idle_are_ignored() {
        let mut timeline = Timeline::new(300.0);
        let mut gesture = GestureController::new();
        gesture.pointer_move(&timeline, 0.7);
        assert_eq!(gesture.state(), GestureState::Idle);
        assert_eq!(gesture.pointer_up(&mut timeline), GestureOutcome::Ignored);
    }

    #[test]
    fn test_select_clip_returns_seek_target() {
        let mut timeline = Timeline::new(300.0);
        let clip = timeline.add_clip(30.0, 45.0, "intro").unwrap();
        let other = timeline.add_clip(60.0, 75.0, "bit").unwrap();
        let mut gesture = GestureController::new();

        assert_eq!(gesture.select_clip(&timeline, clip.id), Some(30.0));
        assert_eq!(gesture.select_clip(&timeline, other.id), Some(60.0));
        assert_eq!(gesture.selected(), Some(other.id));
        assert_eq!(gesture.select_clip(&timeline, Uuid::new_v4()), None);

        timeline.remove_clip(other.id);
        gesture.sync_selection(&timeline);
        assert!(gesture.selected().is_none());
    }
}
