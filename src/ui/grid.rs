//! Visible grid lines and snapping.
use crate::constants::{GRID_MARGIN_PX, GRID_MEASURES_ONLY_BELOW, GRID_SUBDIVISION_STEPS, GRID_SUBDIVISIONS_FROM};
use crate::ui::coords::CoordinateMapper;

/// Upper bound on generated lines, whatever the viewport size.
const MAX_GRID_LINES: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLineKind {
    Measure,
    Beat,
    Subdivision,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub time: f64,
    pub x: f32,
    pub kind: GridLineKind,
}

/// Line density for a given beat width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridResolution {
    Measures,
    Beats,
    Subdivisions(u32),
}

impl GridResolution {
    pub fn for_beat_width(beat_width: f32, numerator: u32) -> Self {
        if beat_width < GRID_MEASURES_ONLY_BELOW {
            GridResolution::Measures
        } else if beat_width < GRID_SUBDIVISIONS_FROM {
            GridResolution::Beats
        } else {
            let per_beat = GRID_SUBDIVISION_STEPS
                .iter()
                .rev()
                .find(|(threshold, _)| beat_width >= *threshold)
                .map(|(_, n)| *n)
                .unwrap_or(numerator.max(1));
            GridResolution::Subdivisions(per_beat)
        }
    }

    /// (ticks per beat, ticks between lines)
    fn ticks(self, numerator: u32) -> (u64, u64) {
        match self {
            GridResolution::Measures => (1, numerator.max(1) as u64),
            GridResolution::Beats => (1, 1),
            GridResolution::Subdivisions(n) => (n.max(1) as u64, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridKey {
    mapper: CoordinateMapper,
    width: f32,
    beat_width: f32,
    numerator: u32,
}

#[derive(Debug, Default)]
pub struct GridGenerator {
    lines: Vec<GridLine>,
    key: Option<GridKey>,
    /// Seconds between adjacent lines at the current resolution.
    step: f64,
}

impl GridGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the candidate set for a viewport `width` pixels wide.
    /// Does nothing if the view has not changed since the last call.
    pub fn generate(&mut self, mapper: &CoordinateMapper, beat_width: f32, width: f32, numerator: u32) {
        let key = GridKey {
            mapper: *mapper,
            width,
            beat_width,
            numerator,
        };
        if self.key == Some(key) {
            return;
        }
        self.key = Some(key);
        self.lines.clear();

        let resolution = GridResolution::for_beat_width(beat_width, numerator);
        let (ticks_per_beat, stride) = resolution.ticks(numerator);
        let ticks_per_measure = ticks_per_beat * numerator.max(1) as u64;
        let seconds_per_tick = 1.0 / (mapper.beats_per_second() * ticks_per_beat as f64);
        let step = seconds_per_tick * stride as f64;
        self.step = step;

        let t0 = mapper.pixels_to_seconds(-GRID_MARGIN_PX).max(0.0);
        let t1 = mapper.pixels_to_seconds(width + GRID_MARGIN_PX);
        if t1 < t0 {
            return;
        }

        let first = (t0 / step).floor() as u64;
        let last = (t1 / step).ceil() as u64;
        for i in first..=last {
            if self.lines.len() >= MAX_GRID_LINES {
                log::warn!("Grid line cap reached at {} lines", MAX_GRID_LINES);
                break;
            }
            let tick = i * stride;
            let time = tick as f64 * seconds_per_tick;
            let kind = if tick % ticks_per_measure == 0 {
                GridLineKind::Measure
            } else if tick % ticks_per_beat == 0 {
                GridLineKind::Beat
            } else {
                GridLineKind::Subdivision
            };
            self.lines.push(GridLine {
                time,
                x: mapper.seconds_to_pixels(time),
                kind,
            });
        }
    }

    pub fn lines(&self) -> &[GridLine] {
        &self.lines
    }

    /// Grid line closest to `time`. Outside the generated window the
    /// nearest line is computed from the current line spacing.
    pub fn find_nearest(&self, time: f64) -> Option<f64> {
        let (first, last) = (self.lines.first()?, self.lines.last()?);
        if (time < first.time || time > last.time) && self.step > 0.0 {
            return Some(((time / self.step).round() * self.step).max(0.0));
        }
        let mut best: Option<(f64, f64)> = None;
        for line in &self.lines {
            let d = (line.time - time).abs();
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((line.time, d));
            }
        }
        best.map(|(t, _)| t)
    }

    /// `time` moved to the nearest line when `enabled`, unchanged otherwise.
    pub fn snap(&self, time: f64, enabled: bool) -> f64 {
        if !enabled {
            return time;
        }
        self.find_nearest(time).unwrap_or(time)
    }
}
