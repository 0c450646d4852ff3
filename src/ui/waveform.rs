use egui::{Rangef, Rect, Stroke, pos2};

use crate::constants::COLOR_WAVEFORM;
use crate::model::AudioClip;
use crate::ui::coords::CoordinateMapper;
use crate::ui::geometry::Primitive;
use crate::waveform::WaveformLod;

/// Vertical min/max strokes for the visible part of an audio clip.
///
/// Uses the level matching the current zoom and only the lines inside
/// `visible_x`, so cost follows screen width rather than file length.
pub fn waveform_primitives(
    lod: &WaveformLod,
    clip: &AudioClip,
    clip_rect: Rect,
    visible_x: Rangef,
    mapper: &CoordinateMapper,
) -> Vec<Primitive> {
    let pps = mapper.pixels_per_second();
    let Some(level_idx) = lod.select_lod(pps) else {
        return Vec::new();
    };
    let Some(level) = lod.level(level_idx) else {
        return Vec::new();
    };

    let x0 = clip_rect.left().max(visible_x.min);
    let x1 = clip_rect.right().min(visible_x.max);
    if x1 <= x0 {
        return Vec::new();
    }

    let source_time = |x: f32| clip.offset + (x - clip_rect.left()) as f64 / pps;
    let span = lod.peaks_in(level_idx, source_time(x0), source_time(x1));

    let center = clip_rect.center().y;
    let half = clip_rect.height() * 0.45;
    let gain = clip.gain.clamp(0.0, 4.0);
    let stroke = Stroke::new(1.0, COLOR_WAVEFORM);

    let mut out = Vec::with_capacity(span.peaks.len());
    for (i, peak) in span.peaks.iter().enumerate() {
        let t = level.line_start(span.first_line + i);
        let x = clip_rect.left() + ((t - clip.offset) * pps) as f32;
        if x < x0 - 1.0 || x > x1 {
            continue;
        }
        let x = x.max(x0);
        let top = center - (peak.max * gain).clamp(-1.0, 1.0) * half;
        let mut bottom = center - (peak.min * gain).clamp(-1.0, 1.0) * half;
        if bottom - top < 1.0 {
            bottom = top + 1.0;
        }
        out.push(Primitive::line(pos2(x, top), pos2(x, bottom), stroke));
    }
    out
}
