/// Tempo-aware conversions between seconds and musical time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConverter {
    bpm: f64,
    beats_per_bar: u32,
}

impl TimeConverter {
    pub fn new(bpm: f64, beats_per_bar: u32) -> Self {
        Self {
            bpm: if bpm > 0.0 { bpm } else { crate::constants::DEFAULT_BPM },
            beats_per_bar: beats_per_bar.max(1),
        }
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    #[inline]
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    #[inline]
    pub fn beats_per_second(&self) -> f64 {
        self.bpm / 60.0
    }

    #[inline]
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    #[inline]
    pub fn seconds_per_bar(&self) -> f64 {
        self.seconds_per_beat() * self.beats_per_bar as f64
    }

    /// Convert seconds to beats
    #[inline]
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.beats_per_second()
    }

    /// Convert beats to seconds
    #[inline]
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat()
    }
}

/// Convert a frame count to seconds at `sample_rate`.
#[inline]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    }
}

/// Format time in bars:beats:sixteenths (1-based)
pub fn format_bars_beats_sixteenths(beats: f64, beats_per_bar: u32) -> String {
    let beats = beats.max(0.0);
    let bars = (beats / beats_per_bar as f64) as i32 + 1;
    let beat = (beats % beats_per_bar as f64) as i32 + 1;
    let sixteenth = ((beats % 1.0) * 4.0) as i32 + 1;
    format!("{:03}:{:02}:{:02}", bars, beat, sixteenth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_conversions() {
        let tc = TimeConverter::new(120.0, 4);
        assert_eq!(tc.beats_per_second(), 2.0);
        assert_eq!(tc.seconds_per_bar(), 2.0);
        assert_eq!(tc.beats_to_seconds(3.0), 1.5);
        assert_eq!(tc.seconds_to_beats(1.5), 3.0);
    }

    #[test]
    fn invalid_tempo_falls_back() {
        let tc = TimeConverter::new(0.0, 0);
        assert_eq!(tc.bpm(), crate::constants::DEFAULT_BPM);
        assert_eq!(tc.beats_per_bar(), 1);
    }

    #[test]
    fn bars_beats_label() {
        assert_eq!(format_bars_beats_sixteenths(0.0, 4), "001:01:01");
        assert_eq!(format_bars_beats_sixteenths(5.25, 4), "002:02:02");
    }
}
