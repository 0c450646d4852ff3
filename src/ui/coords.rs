/// Maps between timeline seconds and viewport pixels.
///
/// `x = t * beats_per_second * effective_beat_width + scroll_offset`, where
/// the effective beat width is `beat_width * zoom * ui_scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    beats_per_second: f64,
    effective_beat_width: f64,
    scroll_offset: f64,
}

impl CoordinateMapper {
    pub fn new(bpm: f64, beat_width: f32, zoom: f32, ui_scale: f32, scroll_offset: f32) -> Self {
        let bpm = if bpm > 0.0 { bpm } else { crate::constants::DEFAULT_BPM };
        let ebw = (beat_width as f64 * zoom as f64 * ui_scale as f64).max(f64::MIN_POSITIVE);
        Self {
            beats_per_second: bpm / 60.0,
            effective_beat_width: ebw,
            scroll_offset: scroll_offset as f64,
        }
    }

    #[inline]
    pub fn seconds_to_pixels(&self, seconds: f64) -> f32 {
        (seconds * self.pixels_per_second() + self.scroll_offset) as f32
    }

    #[inline]
    pub fn pixels_to_seconds(&self, x: f32) -> f64 {
        (x as f64 - self.scroll_offset) / self.pixels_per_second()
    }

    #[inline]
    pub fn pixels_per_second(&self) -> f64 {
        self.beats_per_second * self.effective_beat_width
    }

    pub fn seconds_per_pixel(&self) -> f64 {
        1.0 / self.pixels_per_second()
    }

    pub fn effective_beat_width(&self) -> f64 {
        self.effective_beat_width
    }

    pub fn beats_per_second(&self) -> f64 {
        self.beats_per_second
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset as f32
    }

    /// Time span covered by a viewport `width` pixels wide.
    pub fn visible_range(&self, width: f32) -> (f64, f64) {
        (self.pixels_to_seconds(0.0), self.pixels_to_seconds(width))
    }

    /// A pixel distance expressed as seconds at the current zoom.
    pub fn pixels_to_duration(&self, px: f32) -> f64 {
        px as f64 * self.seconds_per_pixel()
    }

    /// Same mapping with a different scroll offset.
    pub fn with_scroll(mut self, scroll_offset: f32) -> Self {
        self.scroll_offset = scroll_offset as f64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_tolerance() {
        let views = [
            (120.0, 100.0, 1.0, 1.0, 0.0),
            (87.5, 37.0, 1.3, 2.0, -1234.5),
            (200.0, 4800.0, 1.0, 0.75, -98765.0),
            (60.0, 2.0, 1.0, 1.0, -3.0),
        ];
        for (bpm, bw, zoom, scale, scroll) in views {
            let m = CoordinateMapper::new(bpm, bw, zoom, scale, scroll);
            for t in [0.0, 0.001, 1.25, 17.3, 600.0] {
                let back = m.pixels_to_seconds(m.seconds_to_pixels(t));
                // pixels are f32, so allow half a pixel of rounding
                assert!(
                    (back - t).abs() <= m.seconds_per_pixel() * 0.5 + 1e-9,
                    "{t} -> {back} at bpm {bpm} bw {bw}"
                );
            }
        }
    }

    #[test]
    fn known_values() {
        let m = CoordinateMapper::new(120.0, 100.0, 1.0, 1.0, 0.0);
        assert_eq!(m.pixels_per_second(), 200.0);
        assert_eq!(m.seconds_to_pixels(1.0), 200.0);
        assert_eq!(m.pixels_to_seconds(250.0), 1.25);

        let scrolled = m.with_scroll(-100.0);
        assert_eq!(scrolled.seconds_to_pixels(1.0), 100.0);
        assert_eq!(scrolled.visible_range(400.0), (0.5, 2.5));
    }
}
