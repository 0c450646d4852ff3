//! Per-tick driver: routes input to the editors, follows the playhead and
//! produces the frame's geometry.
use egui::{Rangef, Rect, Stroke, Vec2, pos2, vec2};
use smallvec::SmallVec;

use crate::audio_state::TransportState;
use crate::config::EditorConfig;
use crate::constants::*;
use crate::idgen::{ClipId, TrackId};
use crate::input::InputFrame;
use crate::model::{AutomationLane, Clip, MidiClip, Track};
use crate::project::Session;
use crate::ui::automation_lane::{AutomationLaneEditor, LaneArea, lane_primitives};
use crate::ui::clip_editor::{ClipEditor, EditContext};
use crate::ui::coords::CoordinateMapper;
use crate::ui::geometry::{FrameGeometry, LaneCache, LaneGeometry, LaneKey, Primitive};
use crate::ui::grid::{GridGenerator, GridLine, GridLineKind};
use crate::ui::playhead::PlayheadTracker;
use crate::ui::view_state::{Interaction, ViewState};
use crate::ui::waveform::waveform_primitives;
use crate::waveform_cache::WaveformCache;

/// Vertical placement of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneLayout {
    pub track: TrackId,
    /// Clip band plus automation band.
    pub rect: Rect,
    pub clip_band: Rect,
    pub automation: Option<LaneArea>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Ruler,
    Clips(TrackId),
    Automation(LaneArea),
}

pub type Layouts = SmallVec<[LaneLayout; 8]>;

pub struct TimelineView {
    pub view: ViewState,
    config: EditorConfig,
    size: Vec2,
    grid: GridGenerator,
    clip_editor: ClipEditor,
    automation_editor: AutomationLaneEditor,
    playhead: PlayheadTracker,
    lane_cache: LaneCache,
    playhead_x: f32,
}

impl TimelineView {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            view: ViewState::new(&config),
            size: vec2(800.0, 600.0),
            grid: GridGenerator::new(),
            clip_editor: ClipEditor::new(&config.editing),
            automation_editor: AutomationLaneEditor::new(&config.editing),
            playhead: PlayheadTracker::new(&config.playback),
            lane_cache: LaneCache::default(),
            playhead_x: 0.0,
            config,
        }
    }

    /// Viewport size in points; the host calls this when the panel resizes.
    pub fn set_size(&mut self, size: Vec2) {
        self.size = vec2(size.x.max(1.0), size.y.max(1.0));
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn grid(&self) -> &GridGenerator {
        &self.grid
    }

    pub fn clip_editor(&self) -> &ClipEditor {
        &self.clip_editor
    }

    pub fn clip_editor_mut(&mut self) -> &mut ClipEditor {
        &mut self.clip_editor
    }

    pub fn lane_cache(&self) -> &LaneCache {
        &self.lane_cache
    }

    /// Playhead x as of the last [`update`](Self::update).
    pub fn playhead_x(&self) -> f32 {
        self.playhead_x
    }

    pub fn mapper(&self, session: &Session) -> CoordinateMapper {
        self.view.mapper(session.bpm)
    }

    /// Stack tracks under the ruler in display order.
    pub fn layout(&self, session: &Session) -> Layouts {
        let width = self.size.x;
        let track_h = self.config.view.track_height;
        let auto_h = self.config.view.automation_lane_height;
        let mut y = self.config.view.ruler_height;
        let mut out = Layouts::new();

        for track in session.tracks() {
            let clip_band = Rect::from_min_max(pos2(0.0, y), pos2(width, y + track_h));
            y += track_h;
            let automation = track.shown_automation.clone().map(|key| {
                let rect = Rect::from_min_max(pos2(0.0, y), pos2(width, y + auto_h));
                y += auto_h;
                LaneArea {
                    track: track.id,
                    key,
                    rect,
                }
            });
            out.push(LaneLayout {
                track: track.id,
                rect: Rect::from_min_max(clip_band.min, pos2(width, y)),
                clip_band,
                automation,
            });
        }
        out
    }

    pub fn hit_test(&self, layouts: &[LaneLayout], pos: egui::Pos2) -> Option<HitTarget> {
        if pos.x < 0.0 || pos.x > self.size.x || pos.y < 0.0 {
            return None;
        }
        if pos.y < self.config.view.ruler_height {
            return Some(HitTarget::Ruler);
        }
        let lane = layouts.iter().find(|l| l.rect.y_range().contains(pos.y))?;
        if lane.clip_band.y_range().contains(pos.y) {
            return Some(HitTarget::Clips(lane.track));
        }
        lane.automation.clone().map(HitTarget::Automation)
    }

    /// One tick: scroll/zoom, editing, playhead follow and waveform upkeep.
    pub fn update(
        &mut self,
        session: &mut Session,
        input: &InputFrame,
        transport: &TransportState,
        cache: &mut WaveformCache,
        dt: f32,
    ) {
        self.apply_scroll(session.bpm, input);

        let mapper = self.view.mapper(session.bpm);
        self.grid
            .generate(&mapper, self.view.beat_width, self.size.x, session.time_signature.0);

        self.route(session, input, transport, &mapper);

        self.playhead_x = self.playhead.update(
            &mut self.view,
            session.bpm,
            transport.position(),
            transport.is_playing(),
            self.size.x,
            dt,
        );

        for track in session.tracks() {
            for clip in track.clips() {
                if let Clip::Audio(audio) = clip {
                    cache.request(track.id, &audio.source);
                }
            }
        }
        if cache.poll() {
            log::debug!("Waveform cache changed, revision {}", cache.revision());
        }
    }

    fn apply_scroll(&mut self, bpm: f64, input: &InputFrame) {
        let Some(pos) = input.pointer else {
            return;
        };
        if input.scroll_delta == Vec2::ZERO || pos.x < 0.0 || pos.x > self.size.x {
            return;
        }
        if input.zoom_modifier() {
            let delta = if input.scroll_delta.y != 0.0 {
                input.scroll_delta.y
            } else {
                input.scroll_delta.x
            };
            self.view.zoom_around(pos.x, delta > 0.0, bpm);
        } else {
            self.view.scroll_by(input.horizontal_scroll());
        }
    }

    fn route(&mut self, session: &mut Session, input: &InputFrame, transport: &TransportState, mapper: &CoordinateMapper) {
        let layouts = self.layout(session);
        let hit = input.pointer.and_then(|p| self.hit_test(&layouts, p));

        // an automation gesture keeps its lane even when the pointer strays
        let active_area = match &self.view.interaction {
            Interaction::MovingPoint { track, key, .. } | Interaction::BendingCurve { track, key, .. } => {
                let area = layouts
                    .iter()
                    .filter_map(|l| l.automation.as_ref())
                    .find(|a| a.track == *track && a.key == *key)
                    .cloned();
                if area.is_none() {
                    log::debug!("Automation lane hidden mid-gesture");
                    self.view.interaction = Interaction::Idle;
                }
                area
            }
            _ => None,
        };
        let automation_area = active_area.or_else(|| match (&hit, self.view.interaction.is_idle()) {
            (Some(HitTarget::Automation(area)), true) => Some(area.clone()),
            _ => None,
        });

        if let Some(area) = &automation_area {
            self.automation_editor
                .handle(session, &mut self.view, &self.grid, mapper, area, input);
        }

        let over_track = match (&hit, &automation_area) {
            (Some(HitTarget::Clips(track)), None) => Some(*track),
            _ => None,
        };
        let ctx = EditContext {
            grid: &self.grid,
            mapper,
            over_track,
        };
        self.clip_editor.handle(session, &mut self.view, ctx, input);

        if input.primary_pressed
            && self.view.interaction.is_idle()
            && let (Some(HitTarget::Ruler), Some(pos)) = (&hit, input.pointer)
        {
            let snap = self.view.snapping(input.modifiers.shift);
            let time = self.grid.snap(mapper.pixels_to_seconds(pos.x), snap).max(0.0);
            transport.set_position(time);
        }
    }

    /// Remove a track and everything that refers to it.
    pub fn remove_track(&mut self, session: &mut Session, cache: &mut WaveformCache, track: TrackId) -> Option<Track> {
        let removed = session.remove_track(track)?;
        cache.forget_track(track);
        self.lane_cache.invalidate(track);
        if self.view.selection.is_some_and(|s| s.track == track) {
            self.view.selection = None;
        }
        if self.view.cursor_track == Some(track) {
            self.view.cursor_track = None;
        }
        let gesture_on_track = match &self.view.interaction {
            Interaction::Idle => false,
            Interaction::Dragging { track: t, .. }
            | Interaction::ResizingStart { track: t, .. }
            | Interaction::ResizingEnd { track: t, .. }
            | Interaction::MovingPoint { track: t, .. }
            | Interaction::BendingCurve { track: t, .. } => *t == track,
        };
        if gesture_on_track {
            self.view.interaction = Interaction::Idle;
        }
        Some(removed)
    }

    /// Flat primitive list for the current state. Unchanged lanes come
    /// from the lane cache.
    pub fn build_geometry(&mut self, session: &Session, cache: &WaveformCache) -> FrameGeometry {
        let mapper = self.view.mapper(session.bpm);
        let numerator = session.time_signature.0;
        let width = self.size.x;
        self.grid.generate(&mapper, self.view.beat_width, width, numerator);

        let ruler = ruler_primitives(self.grid.lines(), width, self.config.view.ruler_height);

        let layouts = self.layout(session);
        let mut lanes = Vec::with_capacity(layouts.len());
        for (index, layout) in layouts.iter().enumerate() {
            let Some(track) = session.track(layout.track) else {
                continue;
            };
            let selected = self
                .view
                .selection
                .filter(|s| s.track == track.id)
                .map(|s| s.clip);
            let active_point = match &self.view.interaction {
                Interaction::MovingPoint {
                    track: t,
                    key,
                    time,
                    value,
                } if *t == track.id => track.automation(key).and_then(|l| l.find_point(*time, *value)),
                _ => None,
            };
            let key = LaneKey {
                revision: track.revision(),
                mapper,
                rect: layout.rect,
                width,
                beat_width: self.view.beat_width,
                numerator,
                selected,
                active_point,
                waveform_revision: cache.revision(),
            };
            let lines = self.grid.lines();
            let geometry = self.lane_cache.get_or_build(track.id, key, || {
                build_lane(track, layout, index, &mapper, lines, width, selected, active_point, cache)
            });
            lanes.push(geometry);
        }

        let bottom = self.size.y;
        let top = self.config.view.ruler_height;
        let mut overlay = Vec::with_capacity(2);
        let cursor_x = mapper.seconds_to_pixels(self.view.cursor_time);
        if (0.0..=width).contains(&cursor_x) {
            overlay.push(Primitive::vline(cursor_x, top, bottom, Stroke::new(1.0, COLOR_CURSOR)));
        }
        if (0.0..=width).contains(&self.playhead_x) {
            overlay.push(Primitive::vline(
                self.playhead_x,
                0.0,
                bottom,
                Stroke::new(2.0, COLOR_PLAYHEAD),
            ));
        }

        FrameGeometry { ruler, lanes, overlay }
    }
}

fn grid_stroke(kind: GridLineKind) -> Stroke {
    match kind {
        GridLineKind::Measure => Stroke::new(1.5, COLOR_GRID_MEASURE),
        GridLineKind::Beat => Stroke::new(1.0, COLOR_GRID_BEAT),
        GridLineKind::Subdivision => Stroke::new(1.0, COLOR_GRID_SUBDIVISION),
    }
}

fn ruler_primitives(lines: &[GridLine], width: f32, height: f32) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(lines.len() + 1);
    out.push(Primitive::rect(
        Rect::from_min_max(pos2(0.0, 0.0), pos2(width, height)),
        COLOR_RULER_BG,
    ));
    for line in lines.iter().filter(|l| (0.0..=width).contains(&l.x)) {
        let tick = match line.kind {
            GridLineKind::Measure => height,
            GridLineKind::Beat => height * 0.5,
            GridLineKind::Subdivision => height * 0.25,
        };
        out.push(Primitive::vline(line.x, height - tick, height, grid_stroke(line.kind)));
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn build_lane(
    track: &Track,
    layout: &LaneLayout,
    index: usize,
    mapper: &CoordinateMapper,
    lines: &[GridLine],
    width: f32,
    selected: Option<ClipId>,
    active_point: Option<usize>,
    cache: &WaveformCache,
) -> LaneGeometry {
    let band = layout.clip_band;
    let bg = if index % 2 == 0 {
        COLOR_TRACK_BG_EVEN
    } else {
        COLOR_TRACK_BG_ODD
    };
    let mut primitives = vec![Primitive::rect(band, bg)];

    for line in lines.iter().filter(|l| (0.0..=width).contains(&l.x)) {
        primitives.push(Primitive::vline(line.x, band.top(), band.bottom(), grid_stroke(line.kind)));
    }
    primitives.push(Primitive::line(
        band.left_bottom(),
        band.right_bottom(),
        Stroke::new(1.0, COLOR_GRID_BEAT),
    ));

    let visible = Rangef::new(0.0, width);
    for clip in track.clips() {
        let x0 = mapper.seconds_to_pixels(clip.start());
        let x1 = mapper.seconds_to_pixels(clip.end());
        if x1 < 0.0 || x0 > width {
            continue;
        }
        let rect = Rect::from_min_max(
            pos2(x0, band.top() + CLIP_VERTICAL_INSET),
            pos2(x1, band.bottom() - CLIP_VERTICAL_INSET),
        );
        match clip {
            Clip::Audio(audio) => {
                primitives.push(Primitive::rect(rect, COLOR_AUDIO_CLIP));
                // no summary yet (or unreadable): plain block
                if let Some(lod) = cache.get(&audio.source) {
                    primitives.extend(waveform_primitives(&lod, audio, rect, visible, mapper));
                }
            }
            Clip::Midi(midi) => {
                primitives.push(Primitive::rect(rect, COLOR_MIDI_CLIP));
                primitives.extend(note_primitives(midi, rect, visible, mapper));
            }
        }
        if selected == Some(clip.id()) {
            primitives.push(Primitive::outline(rect, Stroke::new(2.0, COLOR_SELECTION)));
        }
    }

    if let Some(area) = &layout.automation {
        let empty = AutomationLane::default();
        let lane = track.automation(&area.key).unwrap_or(&empty);
        primitives.extend(lane_primitives(lane, area, mapper, width, active_point));
    }

    LaneGeometry {
        track: track.id,
        rect: layout.rect,
        primitives,
    }
}

/// Note bars inside a MIDI clip, pitch range fitted to the clip height.
fn note_primitives(clip: &MidiClip, rect: Rect, visible: Rangef, mapper: &CoordinateMapper) -> Vec<Primitive> {
    let Some(lo) = clip.notes.iter().map(|n| n.pitch).min() else {
        return Vec::new();
    };
    let hi = clip.notes.iter().map(|n| n.pitch).max().unwrap_or(lo);
    let rows = (hi - lo) as f32 + 1.0;
    let row_h = rect.height() / rows.max(12.0);
    let left = rect.left().max(visible.min);
    let right = rect.right().min(visible.max);

    clip.notes
        .iter()
        .filter_map(|note| {
            let x0 = mapper.seconds_to_pixels(clip.start + note.start).max(left);
            let x1 = mapper
                .seconds_to_pixels(clip.start + note.start + note.duration)
                .min(right);
            if x1 <= x0 {
                return None;
            }
            let bottom = rect.bottom() - (note.pitch - lo) as f32 * row_h;
            let r = Rect::from_min_max(pos2(x0, bottom - row_h), pos2(x1, bottom));
            Some(Primitive::rect(r, COLOR_MIDI_NOTE))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutomationKey, MidiNote, TrackKind};
    use crate::waveform::LodSettings;
    use egui::Modifiers;
    use std::sync::Arc;

    struct Fixture {
        session: Session,
        timeline: TimelineView,
        transport: Arc<TransportState>,
        cache: WaveformCache,
        synth: TrackId,
        drums: TrackId,
        key: AutomationKey,
    }

    impl Fixture {
        fn new() -> Self {
            let mut session = Session::new(120.0);
            let synth = session.add_track(Track::new("Synth", TrackKind::Midi));
            let drums = session.add_track(Track::new("Drums", TrackKind::Midi));
            let key = AutomationKey::new(1, "volume");
            session.show_automation(synth, Some(key.clone()));
            let transport = Arc::new(TransportState::new());
            let cache = WaveformCache::new(transport.clone(), LodSettings::default());
            let mut timeline = TimelineView::new(EditorConfig::default());
            timeline.set_size(vec2(1600.0, 400.0));
            Self {
                session,
                timeline,
                transport,
                cache,
                synth,
                drums,
                key,
            }
        }

        fn tick(&mut self, input: InputFrame) {
            self.timeline
                .update(&mut self.session, &input, &self.transport, &mut self.cache, 1.0 / 60.0);
        }
    }

    // ruler 0..18, synth 18..98 with automation 98..146, drums 146..226

    #[test]
    fn layout_stacks_tracks_under_ruler() {
        let f = Fixture::new();
        let layouts = f.timeline.layout(&f.session);
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0].clip_band.y_range(), Rangef::new(18.0, 98.0));
        assert_eq!(layouts[0].automation.as_ref().unwrap().rect.y_range(), Rangef::new(98.0, 146.0));
        assert_eq!(layouts[1].rect.y_range(), Rangef::new(146.0, 226.0));

        let hit = |y| f.timeline.hit_test(&layouts, pos2(10.0, y));
        assert_eq!(hit(5.0), Some(HitTarget::Ruler));
        assert_eq!(hit(50.0), Some(HitTarget::Clips(f.synth)));
        assert!(matches!(hit(120.0), Some(HitTarget::Automation(_))));
        assert_eq!(hit(200.0), Some(HitTarget::Clips(f.drums)));
        assert_eq!(hit(300.0), None);
    }

    #[test]
    fn presses_go_to_the_lane_under_the_pointer() {
        let mut f = Fixture::new();
        f.tick(InputFrame::double_click(pos2(400.0, 180.0)));
        assert_eq!(f.session.track(f.drums).unwrap().clips().len(), 1);

        f.tick(InputFrame::press(pos2(400.0, 122.0)));
        assert!(matches!(f.timeline.view.interaction, Interaction::MovingPoint { .. }));
        f.tick(InputFrame::release(pos2(400.0, 122.0)));
        let lane = f.session.track(f.synth).unwrap().automation(&f.key).unwrap();
        assert_eq!(lane.points().last().map(|p| p.time), Some(2.0));
        assert!(f.session.track(f.synth).unwrap().clips().is_empty());
    }

    #[test]
    fn ruler_click_moves_transport() {
        let mut f = Fixture::new();
        f.tick(InputFrame::press(pos2(602.0, 8.0)));
        assert_eq!(f.transport.position(), 3.0);
    }

    #[test]
    fn wheel_scrolls_and_modifier_wheel_zooms() {
        let mut f = Fixture::new();
        f.timeline.view.set_scroll_offset(-1000.0);
        f.tick(InputFrame::hover(pos2(300.0, 50.0)).with_scroll(vec2(0.0, 40.0)));
        assert_eq!(f.timeline.view.scroll_offset(), -960.0);

        f.tick(
            InputFrame::hover(pos2(300.0, 50.0))
                .with_scroll(vec2(0.0, 1.0))
                .with_modifiers(Modifiers::CTRL),
        );
        assert!((f.timeline.view.beat_width - 110.0).abs() < 1e-3);
    }

    #[test]
    fn unchanged_lanes_come_from_cache() {
        let mut f = Fixture::new();
        let clip = MidiClip::new(0.5, 1.0).with_notes(vec![MidiNote {
            pitch: 60,
            velocity: 100,
            start: 0.0,
            duration: 0.5,
        }]);
        f.session.insert_clip(f.drums, Clip::Midi(clip));

        let first = f.timeline.build_geometry(&f.session, &f.cache);
        assert_eq!(first.lanes.len(), 2);
        assert!(first.overlay.len() == 2, "cursor and playhead at x=0");
        let second = f.timeline.build_geometry(&f.session, &f.cache);
        assert!(Arc::ptr_eq(&first.lanes[1], &second.lanes[1]));
        assert_eq!(f.timeline.lane_cache().stats(), (2, 2));

        // editing one track rebuilds only that lane
        f.session.insert_clip(f.drums, Clip::Midi(MidiClip::new(3.0, 1.0)));
        let third = f.timeline.build_geometry(&f.session, &f.cache);
        assert!(Arc::ptr_eq(&first.lanes[0], &third.lanes[0]));
        assert!(!Arc::ptr_eq(&first.lanes[1], &third.lanes[1]));
    }

    #[test]
    fn removing_a_track_clears_references() {
        let mut f = Fixture::new();
        f.tick(InputFrame::double_click(pos2(400.0, 180.0)));
        f.tick(InputFrame::press(pos2(410.0, 180.0)));
        assert!(f.timeline.view.selection.is_some());

        let drums = f.drums;
        assert!(f.timeline.remove_track(&mut f.session, &mut f.cache, drums).is_some());
        assert!(f.timeline.view.selection.is_none());
        assert!(f.timeline.view.interaction.is_idle());
        assert_eq!(f.timeline.layout(&f.session).len(), 1);
    }
}
