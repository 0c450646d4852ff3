use egui::{Pos2, Rect, Stroke, pos2, vec2};

use crate::config::EditingConfig;
use crate::constants::{
    COLOR_AUTOMATION_BG, COLOR_AUTOMATION_LINE, COLOR_AUTOMATION_POINT, COLOR_AUTOMATION_POINT_ACTIVE,
};
use crate::idgen::TrackId;
use crate::input::InputFrame;
use crate::model::{AutomationKey, AutomationLane};
use crate::project::Session;
use crate::ui::coords::CoordinateMapper;
use crate::ui::geometry::Primitive;
use crate::ui::grid::GridGenerator;
use crate::ui::view_state::{Interaction, ViewState};

/// Screen band of one automation lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneArea {
    pub track: TrackId,
    pub key: AutomationKey,
    pub rect: Rect,
}

impl LaneArea {
    pub fn value_at_y(&self, y: f32) -> f32 {
        ((self.rect.bottom() - y) / self.rect.height().max(1.0)).clamp(0.0, 1.0)
    }

    pub fn y_for(&self, value: f32) -> f32 {
        self.rect.bottom() - value.clamp(0.0, 1.0) * self.rect.height()
    }
}

/// Index of the point within `radius` pixels of `pos`, nearest first.
pub fn point_near(lane: &AutomationLane, area: &LaneArea, mapper: &CoordinateMapper, pos: Pos2, radius: f32) -> Option<usize> {
    lane.points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let at = pos2(mapper.seconds_to_pixels(p.time), area.y_for(p.value));
            (i, at.distance(pos))
        })
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

pub struct AutomationLaneEditor {
    hit_radius_px: f32,
    curve_sensitivity: f32,
    time_epsilon: f64,
}

impl AutomationLaneEditor {
    pub fn new(config: &EditingConfig) -> Self {
        Self {
            hit_radius_px: config.point_hit_radius_px,
            curve_sensitivity: config.curve_drag_sensitivity,
            time_epsilon: config.point_time_epsilon,
        }
    }

    /// Process one input frame for the lane in `area`.
    pub fn handle(
        &mut self,
        session: &mut Session,
        view: &mut ViewState,
        grid: &GridGenerator,
        mapper: &CoordinateMapper,
        area: &LaneArea,
        input: &InputFrame,
    ) {
        let Some(pos) = input.pointer else {
            return;
        };
        let snap = view.snapping(input.modifiers.shift);
        let time = mapper.pixels_to_seconds(pos.x);

        match view.interaction.clone() {
            Interaction::MovingPoint {
                track,
                key,
                time: from_time,
                value: from_value,
            } if track == area.track && key == area.key => {
                if input.primary_released {
                    view.interaction = Interaction::Idle;
                } else if input.primary_down && !input.primary_pressed {
                    let t = grid.snap(time, snap).max(0.0);
                    let value = area.value_at_y(pos.y);
                    let eps = self.time_epsilon;
                    let moved = session
                        .edit_automation(track, &key, |lane| {
                            let index = lane.find_point(from_time, from_value)?;
                            lane.move_point(index, t, value, eps).then(|| lane.points()[index])
                        })
                        .flatten();
                    view.interaction = match moved {
                        Some(point) => Interaction::MovingPoint {
                            track,
                            key,
                            time: point.time,
                            value: point.value,
                        },
                        None => {
                            log::debug!("Automation point gone or past its neighbours, stopping");
                            Interaction::Idle
                        }
                    };
                }
            }
            Interaction::BendingCurve {
                track,
                key,
                time: from_time,
                value: from_value,
                base_curve,
                anchor_y,
            } if track == area.track && key == area.key => {
                if input.primary_released {
                    view.interaction = Interaction::Idle;
                } else if input.primary_down {
                    let sensitivity = self.curve_sensitivity;
                    let bent = session
                        .edit_automation(track, &key, |lane| {
                            let index = lane.find_point(from_time, from_value)?;
                            lane.bend_segment(index, base_curve, pos.y - anchor_y, sensitivity);
                            Some(())
                        })
                        .flatten();
                    if bent.is_none() {
                        log::debug!("Bent segment no longer exists, stopping");
                        view.interaction = Interaction::Idle;
                    }
                }
            }
            Interaction::Idle => self.handle_idle(session, view, grid, mapper, area, input, pos, time, snap),
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_idle(
        &mut self,
        session: &mut Session,
        view: &mut ViewState,
        grid: &GridGenerator,
        mapper: &CoordinateMapper,
        area: &LaneArea,
        input: &InputFrame,
        pos: Pos2,
        time: f64,
        snap: bool,
    ) {
        let Some(track) = session.track(area.track) else {
            return;
        };
        let lane = track.automation(&area.key).cloned().unwrap_or_default();
        let hit = point_near(&lane, area, mapper, pos, self.hit_radius_px);

        if input.secondary_clicked {
            if let Some(i) = hit {
                let p = lane.points()[i];
                session.edit_automation(area.track, &area.key, |lane| lane.remove_point(p.time, p.value));
            }
            return;
        }

        if !input.primary_pressed {
            return;
        }

        if let Some(index) = hit {
            let p = lane.points()[index];
            view.interaction = Interaction::MovingPoint {
                track: area.track,
                key: area.key.clone(),
                time: p.time,
                value: p.value,
            };
            return;
        }

        if (input.modifiers.command || input.modifiers.ctrl)
            && let Some(index) = lane.segment_at(time)
        {
            let p = lane.points()[index];
            view.interaction = Interaction::BendingCurve {
                track: area.track,
                key: area.key.clone(),
                time: p.time,
                value: p.value,
                base_curve: p.curve,
                anchor_y: pos.y,
            };
            return;
        }

        let t = grid.snap(time, snap).max(0.0);
        let value = area.value_at_y(pos.y);
        let eps = self.time_epsilon;
        let inserted = session.edit_automation(area.track, &area.key, |lane| {
            let index = lane.insert_point(t, value, eps);
            lane.points()[index]
        });
        if let Some(p) = inserted {
            view.interaction = Interaction::MovingPoint {
                track: area.track,
                key: area.key.clone(),
                time: p.time,
                value: p.value,
            };
        }
    }
}

/// Background, curve and point handles for a lane spanning `width` pixels.
pub fn lane_primitives(
    lane: &AutomationLane,
    area: &LaneArea,
    mapper: &CoordinateMapper,
    width: f32,
    active: Option<usize>,
) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(lane.points().len() + 3);
    out.push(Primitive::rect(area.rect, COLOR_AUTOMATION_BG));

    let (t0, t1) = mapper.visible_range(width);
    let points: Vec<Pos2> = lane
        .profile(t0.max(0.0), t1.max(0.0))
        .into_iter()
        .map(|(t, v)| pos2(mapper.seconds_to_pixels(t), area.y_for(v)))
        .collect();
    out.push(Primitive::Polyline {
        points,
        stroke: Stroke::new(1.5, COLOR_AUTOMATION_LINE),
    });

    for (i, p) in lane.points().iter().enumerate() {
        let x = mapper.seconds_to_pixels(p.time);
        if !(-8.0..=width + 8.0).contains(&x) {
            continue;
        }
        let color = if active == Some(i) {
            COLOR_AUTOMATION_POINT_ACTIVE
        } else {
            COLOR_AUTOMATION_POINT
        };
        let handle = Rect::from_center_size(pos2(x, area.y_for(p.value)), vec2(8.0, 8.0));
        out.push(Primitive::rect(handle, color));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::model::{Track, TrackKind};
    use egui::Modifiers;

    struct Fixture {
        session: Session,
        view: ViewState,
        grid: GridGenerator,
        editor: AutomationLaneEditor,
        area: LaneArea,
    }

    impl Fixture {
        fn new() -> Self {
            let config = EditorConfig::default();
            let mut session = Session::new(120.0);
            let track = session.add_track(Track::new("Synth", TrackKind::Midi));
            let key = AutomationKey::new(3, "cutoff");
            session.show_automation(track, Some(key.clone()));
            session.set_live_value(track, &key, 0.25);
            let view = ViewState::new(&config);
            let mut grid = GridGenerator::new();
            grid.generate(&view.mapper(120.0), view.beat_width, 2000.0, 4);
            Self {
                session,
                view,
                grid,
                editor: AutomationLaneEditor::new(&config.editing),
                area: LaneArea {
                    track,
                    key,
                    rect: Rect::from_min_max(pos2(0.0, 100.0), pos2(2000.0, 200.0)),
                },
            }
        }

        fn frame(&mut self, input: InputFrame) {
            let mapper = self.view.mapper(120.0);
            self.editor
                .handle(&mut self.session, &mut self.view, &self.grid, &mapper, &self.area, &input);
        }

        fn lane(&self) -> AutomationLane {
            self.session
                .track(self.area.track)
                .and_then(|t| t.automation(&self.area.key))
                .cloned()
                .unwrap()
        }
    }

    #[test]
    fn click_inserts_snapped_point_then_drags_it() {
        let mut f = Fixture::new();
        // 200 px/s; x=403 is just past 2.0 s, y=150 is value 0.5
        f.frame(InputFrame::press(pos2(403.0, 150.0)));
        let lane = f.lane();
        assert_eq!(lane.points().len(), 2, "anchor plus new point");
        assert_eq!(lane.points()[0].value, 0.25);
        assert_eq!(lane.points()[1].time, 2.0);
        assert_eq!(lane.points()[1].value, 0.5);
        assert!(matches!(f.view.interaction, Interaction::MovingPoint { time, .. } if time == 2.0));

        f.frame(InputFrame::drag(pos2(500.0, 120.0)));
        assert_eq!(f.lane().points()[1].time, 2.5);
        assert!((f.lane().points()[1].value - 0.8).abs() < 1e-6);

        f.frame(InputFrame::release(pos2(500.0, 120.0)));
        assert!(f.view.interaction.is_idle());
    }

    #[test]
    fn drag_past_neighbour_aborts_without_committing() {
        let mut f = Fixture::new();
        f.frame(InputFrame::press(pos2(400.0, 150.0)));
        f.frame(InputFrame::release(pos2(400.0, 150.0)));
        f.frame(InputFrame::press(pos2(800.0, 150.0)));
        f.frame(InputFrame::release(pos2(800.0, 150.0)));
        // points at 0, 2, 4 s; grab the middle one and pull it past 4 s
        f.frame(InputFrame::press(pos2(400.0, 150.0)));
        assert!(matches!(f.view.interaction, Interaction::MovingPoint { time, .. } if time == 2.0));
        f.frame(InputFrame::drag(pos2(1000.0, 150.0)));
        assert!(f.view.interaction.is_idle());
        let times: Vec<f64> = f.lane().points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn drag_follows_the_grabbed_point_when_lane_is_edited_elsewhere() {
        let mut f = Fixture::new();
        f.frame(InputFrame::press(pos2(400.0, 150.0)));
        f.frame(InputFrame::release(pos2(400.0, 150.0)));
        // new point at 4 s, held for dragging
        f.frame(InputFrame::press(pos2(800.0, 150.0)));

        let (track, key) = (f.area.track, f.area.key.clone());
        f.session
            .edit_automation(track, &key, |lane| lane.insert_point(1.0, 0.7, 1e-3));
        f.frame(InputFrame::drag(pos2(1000.0, 150.0)));
        let times: Vec<f64> = f.lane().points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 5.0]);
        assert!(matches!(f.view.interaction, Interaction::MovingPoint { time, .. } if time == 5.0));

        // the held point disappears: the gesture ends and nothing else moves
        f.session
            .edit_automation(track, &key, |lane| lane.remove_point(5.0, 0.5));
        f.frame(InputFrame::drag(pos2(1100.0, 150.0)));
        assert!(f.view.interaction.is_idle());
        let times: Vec<f64> = f.lane().points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn modifier_click_bends_segment() {
        let mut f = Fixture::new();
        f.frame(InputFrame::press(pos2(400.0, 110.0)));
        f.frame(InputFrame::release(pos2(400.0, 110.0)));
        // rising segment 0 -> 2 s; ctrl-drag upwards
        f.frame(InputFrame::press(pos2(200.0, 170.0)).with_modifiers(Modifiers::CTRL));
        assert!(matches!(f.view.interaction, Interaction::BendingCurve { time, .. } if time == 0.0));
        f.frame(InputFrame::drag(pos2(200.0, 130.0)));
        assert!(f.lane().points()[0].curve < 0.5);
        f.frame(InputFrame::release(pos2(200.0, 130.0)));
        assert!(f.view.interaction.is_idle());
    }

    #[test]
    fn right_click_removes_point_and_collapses_lane() {
        let mut f = Fixture::new();
        f.frame(InputFrame::press(pos2(400.0, 150.0)));
        f.frame(InputFrame::release(pos2(400.0, 150.0)));
        f.frame(InputFrame::right_click(pos2(402.0, 151.0)));
        let lane = f.lane();
        assert!(lane.is_empty());
        assert_eq!(lane.value_at(1.0), 0.25);
    }

    #[test]
    fn flat_lane_renders_at_live_value() {
        let f = Fixture::new();
        let mapper = f.view.mapper(120.0);
        let prims = lane_primitives(&f.lane(), &f.area, &mapper, 2000.0, None);
        match &prims[1] {
            Primitive::Polyline { points, .. } => {
                assert_eq!(points.len(), 2);
                assert!(points.iter().all(|p| p.y == f.area.y_for(0.25)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
