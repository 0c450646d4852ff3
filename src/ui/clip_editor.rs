//! Pointer and keyboard editing of clips: placement, selection, resizing,
//! dragging, deletion and the clipboard.
use crate::config::EditingConfig;
use crate::idgen::{ClipId, TrackId};
use crate::input::{EditCommand, InputFrame, ShortcutMap};
use crate::model::{Clip, MidiClip, Track, TrackKind};
use crate::project::Session;
use crate::ui::coords::CoordinateMapper;
use crate::ui::grid::GridGenerator;
use crate::ui::view_state::{Interaction, SelectionKey, ViewState};

/// Pointer travel before a pressed clip starts to move.
const DRAG_START_PX: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipEdge {
    Start,
    End,
}

/// The clip edge within `tolerance` seconds of `time`, nearest first.
/// On a shared boundary the clip containing `time` wins.
pub fn edge_hit(track: &Track, time: f64, tolerance: f64) -> Option<(ClipId, ClipEdge)> {
    let mut best: Option<(ClipId, ClipEdge, f64, bool)> = None;
    for clip in track.clips() {
        let inside = clip.contains(time);
        for (edge, at) in [(ClipEdge::Start, clip.start()), (ClipEdge::End, clip.end())] {
            let d = (time - at).abs();
            if d > tolerance {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, _, bd, b_inside)) => d < bd || (d == bd && inside && !b_inside),
            };
            if better {
                best = Some((clip.id(), edge, d, inside));
            }
        }
    }
    best.map(|(id, edge, _, _)| (id, edge))
}

pub struct ClipEditor {
    clipboard: Option<Clip>,
    shortcuts: ShortcutMap,
    min_duration: f64,
    edge_threshold_px: f32,
    default_midi_clip_beats: f64,
    press_x: Option<f32>,
}

/// Everything the editor reads besides the session and view.
#[derive(Clone, Copy)]
pub struct EditContext<'a> {
    pub grid: &'a GridGenerator,
    pub mapper: &'a CoordinateMapper,
    /// Track whose clip band is under the pointer.
    pub over_track: Option<TrackId>,
}

impl ClipEditor {
    pub fn new(config: &EditingConfig) -> Self {
        Self {
            clipboard: None,
            shortcuts: ShortcutMap::default(),
            min_duration: config.min_clip_duration,
            edge_threshold_px: config.edge_threshold_px,
            default_midi_clip_beats: config.default_midi_clip_beats,
            press_x: None,
        }
    }

    pub fn clipboard(&self) -> Option<&Clip> {
        self.clipboard.as_ref()
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutMap {
        &mut self.shortcuts
    }

    /// Process one input frame.
    pub fn handle(&mut self, session: &mut Session, view: &mut ViewState, ctx: EditContext, input: &InputFrame) {
        let snap = view.snapping(input.modifiers.shift);
        let time = input.pointer.map(|p| ctx.mapper.pixels_to_seconds(p.x));
        let target = ctx.over_track.zip(time);

        for command in self.shortcuts.commands(input) {
            match command {
                EditCommand::Delete => {
                    let deleted = target.is_some_and(|(track, t)| self.delete_at(session, view, track, t));
                    if !deleted {
                        self.delete_selected(session, view);
                    }
                }
                EditCommand::Copy => {
                    self.copy(session, view);
                }
                EditCommand::Paste => {
                    self.paste(session, view);
                }
                EditCommand::Duplicate => {
                    self.duplicate(session, view);
                }
            }
        }

        if input.secondary_clicked
            && view.interaction.is_idle()
            && let Some((track, t)) = target
        {
            self.delete_at(session, view, track, t);
        }

        if input.primary_pressed
            && view.interaction.is_idle()
            && let Some((track, t)) = target
        {
            self.press(session, view, &ctx, track, t, snap);
            self.press_x = input.pointer.map(|p| p.x);
        } else if input.primary_down
            && let (Some(t), Some(p)) = (time, input.pointer)
        {
            let moved = self.press_x.is_none_or(|x0| (p.x - x0).abs() >= DRAG_START_PX);
            if moved {
                self.press_x = None;
                self.drag_to(session, view, ctx.grid, t, snap);
            }
        }

        if input.primary_released {
            self.press_x = None;
            if view.interaction.clip().is_some() {
                view.interaction = Interaction::Idle;
            }
        }

        if input.double_clicked
            && view.interaction.is_idle()
            && let Some((track, t)) = target
        {
            self.place_at(session, ctx.grid, track, t, snap);
        }
    }

    /// Primary press at `time` on `track`: move the cursor, then start a
    /// resize on a clip edge or select a clip and start dragging it.
    pub fn press(
        &mut self,
        session: &Session,
        view: &mut ViewState,
        ctx: &EditContext,
        track: TrackId,
        time: f64,
        snap: bool,
    ) {
        if view.cursor_track != Some(track) {
            view.selection = None;
        }
        view.cursor_track = Some(track);
        view.cursor_time = ctx.grid.snap(time, snap).max(0.0);

        let Some(tr) = session.track(track) else {
            return;
        };
        let tolerance = ctx.mapper.pixels_to_duration(self.edge_threshold_px);

        if let Some((id, edge)) = edge_hit(tr, time, tolerance)
            && let Some(clip) = tr.clip(id)
        {
            view.selection = Some(SelectionKey {
                track,
                clip: id,
                kind: clip.kind(),
            });
            view.interaction = match edge {
                ClipEdge::Start => Interaction::ResizingStart {
                    track,
                    clip: id,
                    original_start: clip.start(),
                    original_duration: clip.duration(),
                    original_offset: match clip {
                        Clip::Audio(a) => a.offset,
                        Clip::Midi(_) => 0.0,
                    },
                },
                ClipEdge::End => Interaction::ResizingEnd {
                    track,
                    clip: id,
                    original_start: clip.start(),
                    original_duration: clip.duration(),
                },
            };
            return;
        }

        if let Some(clip) = tr.clip_at(time) {
            view.selection = Some(SelectionKey {
                track,
                clip: clip.id(),
                kind: clip.kind(),
            });
            view.interaction = Interaction::Dragging {
                track,
                clip: clip.id(),
                grab_offset: time - clip.start(),
            };
        }
    }

    /// Apply the active drag or resize for a pointer at `time`.
    pub fn drag_to(&mut self, session: &mut Session, view: &mut ViewState, grid: &GridGenerator, time: f64, snap: bool) {
        let Some(clip_id) = view.interaction.clip() else {
            return;
        };
        let Some(clip) = session.clip(clip_id) else {
            // removed mid-gesture
            view.interaction = Interaction::Idle;
            return;
        };
        let is_audio = matches!(clip, Clip::Audio(_));

        match view.interaction.clone() {
            Interaction::Dragging { clip, grab_offset, .. } => {
                let start = grid.snap(time - grab_offset, snap).max(0.0);
                // a colliding position leaves the clip where it was
                session.move_clip(clip, start);
            }
            Interaction::ResizingEnd {
                track,
                clip,
                original_start,
                ..
            } => {
                let Some((_, hi)) = session.track(track).map(|t| t.free_span_around(clip)) else {
                    return;
                };
                let end = grid.snap(time, snap).min(hi);
                let duration = (end - original_start).max(self.min_duration);
                if original_start + duration > hi {
                    return;
                }
                session.set_clip_span(clip, original_start, duration, None);
            }
            Interaction::ResizingStart {
                track,
                clip,
                original_start,
                original_duration,
                original_offset,
            } => {
                let Some((lo, _)) = session.track(track).map(|t| t.free_span_around(clip)) else {
                    return;
                };
                let end = original_start + original_duration;
                let mut start = grid.snap(time, snap).max(lo).max(0.0);
                if end - start < self.min_duration {
                    start = end - self.min_duration;
                }
                if start < lo || start < 0.0 {
                    return;
                }
                let offset = if is_audio {
                    let offset = original_offset + (start - original_start);
                    if offset < 0.0 {
                        // would read before the start of the source
                        return;
                    }
                    Some(offset)
                } else {
                    None
                };
                session.set_clip_span(clip, start, end - start, offset);
            }
            _ => {}
        }
    }

    /// Quick placement at `time`, from the track's reference clip or as a
    /// default-length MIDI clip. Collisions are ignored silently.
    pub fn place_at(
        &mut self,
        session: &mut Session,
        grid: &GridGenerator,
        track: TrackId,
        time: f64,
        snap: bool,
    ) -> Option<ClipId> {
        let start = grid.snap(time, snap).max(0.0);
        let tr = session.track(track)?;
        let clip = match (&tr.reference_clip, tr.kind) {
            (Some(reference), _) => reference.copy_at(start),
            (None, TrackKind::Midi) => {
                let duration = session.time().beats_to_seconds(self.default_midi_clip_beats);
                Clip::Midi(MidiClip::new(start, duration))
            }
            (None, TrackKind::Audio) => {
                log::debug!("No reference clip on {}, nothing to place", tr.name);
                return None;
            }
        };
        session.insert_clip(track, clip)
    }

    /// Remove the clip under `time` on `track`.
    pub fn delete_at(&mut self, session: &mut Session, view: &mut ViewState, track: TrackId, time: f64) -> bool {
        let Some(id) = session
            .track(track)
            .and_then(|t| t.clip_at(time))
            .map(Clip::id)
        else {
            return false;
        };
        self.delete(session, view, id)
    }

    pub fn delete_selected(&mut self, session: &mut Session, view: &mut ViewState) -> bool {
        match view.selection {
            Some(sel) => self.delete(session, view, sel.clip),
            None => false,
        }
    }

    fn delete(&mut self, session: &mut Session, view: &mut ViewState, id: ClipId) -> bool {
        if session.remove_clip(id).is_none() {
            return false;
        }
        if view.is_selected(id) {
            view.selection = None;
        }
        if view.interaction.clip() == Some(id) {
            view.interaction = Interaction::Idle;
        }
        true
    }

    pub fn copy(&mut self, session: &Session, view: &ViewState) -> bool {
        let Some(clip) = view.selection.and_then(|s| session.clip(s.clip)) else {
            return false;
        };
        log::debug!("Copied clip {}", clip.name());
        self.clipboard = Some(clip.clone());
        true
    }

    /// Insert the clipboard clip at the cursor and select it.
    pub fn paste(&mut self, session: &mut Session, view: &mut ViewState) -> Option<ClipId> {
        let track = view.cursor_track?;
        let clip = self.clipboard.as_ref()?.copy_at(view.cursor_time);
        self.insert_and_select(session, view, track, clip)
    }

    /// Copy the selected clip to start right where it ends, and select the copy.
    pub fn duplicate(&mut self, session: &mut Session, view: &mut ViewState) -> Option<ClipId> {
        let sel = view.selection?;
        let clip = session.clip(sel.clip)?;
        let copy = clip.copy_at(clip.end());
        self.insert_and_select(session, view, sel.track, copy)
    }

    fn insert_and_select(
        &mut self,
        session: &mut Session,
        view: &mut ViewState,
        track: TrackId,
        clip: Clip,
    ) -> Option<ClipId> {
        let kind = clip.kind();
        let id = session.insert_clip(track, clip)?;
        view.selection = Some(SelectionKey { track, clip: id, kind });
        Some(id)
    }
}
