//! Flat 2D primitives handed to the renderer, and the per-lane cache.
use std::num::NonZeroUsize;
use std::sync::Arc;

use egui::{Color32, Pos2, Rect, Stroke, pos2};
use lru::LruCache;

use crate::constants::LANE_CACHE_CAPACITY;
use crate::idgen::{ClipId, TrackId};
use crate::ui::coords::CoordinateMapper;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect { rect: Rect, fill: Color32 },
    Line { from: Pos2, to: Pos2, stroke: Stroke },
    Polyline { points: Vec<Pos2>, stroke: Stroke },
}

impl Primitive {
    pub fn rect(rect: Rect, fill: Color32) -> Self {
        Primitive::Rect { rect, fill }
    }

    pub fn line(from: Pos2, to: Pos2, stroke: impl Into<Stroke>) -> Self {
        Primitive::Line {
            from,
            to,
            stroke: stroke.into(),
        }
    }

    pub fn vline(x: f32, top: f32, bottom: f32, stroke: impl Into<Stroke>) -> Self {
        Self::line(pos2(x, top), pos2(x, bottom), stroke)
    }

    /// Closed polyline around `rect`.
    pub fn outline(rect: Rect, stroke: impl Into<Stroke>) -> Self {
        Primitive::Polyline {
            points: vec![
                rect.left_top(),
                rect.right_top(),
                rect.right_bottom(),
                rect.left_bottom(),
                rect.left_top(),
            ],
            stroke: stroke.into(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Primitive::Rect { rect, .. } => *rect,
            Primitive::Line { from, to, .. } => Rect::from_two_pos(*from, *to),
            Primitive::Polyline { points, .. } => Rect::from_points(points),
        }
    }
}

/// Everything drawn for one track: clip band plus its automation lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneGeometry {
    pub track: TrackId,
    pub rect: Rect,
    pub primitives: Vec<Primitive>,
}

/// One frame's output, in draw order.
#[derive(Debug, Clone, Default)]
pub struct FrameGeometry {
    pub ruler: Vec<Primitive>,
    pub lanes: Vec<Arc<LaneGeometry>>,
    pub overlay: Vec<Primitive>,
}

impl FrameGeometry {
    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.ruler
            .iter()
            .chain(self.lanes.iter().flat_map(|l| l.primitives.iter()))
            .chain(self.overlay.iter())
    }

    pub fn primitive_count(&self) -> usize {
        self.ruler.len() + self.lanes.iter().map(|l| l.primitives.len()).sum::<usize>() + self.overlay.len()
    }

    pub fn lane(&self, track: TrackId) -> Option<&LaneGeometry> {
        self.lanes.iter().find(|l| l.track == track).map(|l| l.as_ref())
    }
}

/// Inputs a lane's geometry depends on. A lane is rebuilt whenever any of
/// them differs from what the cached geometry was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneKey {
    pub revision: u64,
    pub mapper: CoordinateMapper,
    pub rect: Rect,
    pub width: f32,
    pub beat_width: f32,
    pub numerator: u32,
    pub selected: Option<ClipId>,
    pub active_point: Option<usize>,
    pub waveform_revision: u64,
}

pub struct LaneCache {
    entries: LruCache<TrackId, (LaneKey, Arc<LaneGeometry>)>,
    hits: u64,
    misses: u64,
}

impl Default for LaneCache {
    fn default() -> Self {
        Self::new(LANE_CACHE_CAPACITY)
    }
}

impl LaneCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_build(
        &mut self,
        track: TrackId,
        key: LaneKey,
        build: impl FnOnce() -> LaneGeometry,
    ) -> Arc<LaneGeometry> {
        if let Some((cached_key, geometry)) = self.entries.get(&track)
            && *cached_key == key
        {
            self.hits += 1;
            return geometry.clone();
        }
        self.misses += 1;
        let geometry = Arc::new(build());
        self.entries.put(track, (key, geometry.clone()));
        geometry
    }

    pub fn invalidate(&mut self, track: TrackId) {
        self.entries.pop(&track);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
