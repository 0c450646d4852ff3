//! Multi-resolution min/max summaries of an audio file.
//!
//! A [`WaveformLod`] holds a ladder of levels; each line of a level covers
//! a fixed number of frames and stores the minimum and maximum sample seen
//! across all channels. Finer levels come first.
use rayon::prelude::*;

use crate::audio_import::AudioDecoder;
use crate::config::WaveformConfig;
use crate::constants::{
    BASE_SAMPLES_PER_LINE, DECODE_CHUNK_FRAMES, LOD_DENSITY_FACTOR, LOD_LADDER, MAX_LINES_PER_LEVEL,
};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

impl Peak {
    const EMPTY: Peak = Peak {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    #[inline]
    fn merge(self, other: Peak) -> Peak {
        Peak {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn of(samples: &[f32]) -> Peak {
        samples.iter().fold(Peak::EMPTY, |p, &s| Peak {
            min: p.min.min(s),
            max: p.max.max(s),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LodLevel {
    pub samples_per_line: usize,
    pub lines_per_second: f64,
    pub peaks: Vec<Peak>,
}

impl LodLevel {
    pub fn line_start(&self, index: usize) -> f64 {
        index as f64 / self.lines_per_second
    }

    pub fn line_duration(&self) -> f64 {
        1.0 / self.lines_per_second
    }
}

/// Lines of one level covering a time window.
#[derive(Debug, Clone, Copy)]
pub struct VisibleSpan<'a> {
    pub first_line: usize,
    pub peaks: &'a [Peak],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LodSettings {
    pub base_samples_per_line: usize,
    pub ladder: Vec<usize>,
    pub max_lines_per_level: usize,
    pub chunk_frames: usize,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            base_samples_per_line: BASE_SAMPLES_PER_LINE,
            ladder: LOD_LADDER.to_vec(),
            max_lines_per_level: MAX_LINES_PER_LEVEL,
            chunk_frames: DECODE_CHUNK_FRAMES,
        }
    }
}

impl From<&WaveformConfig> for LodSettings {
    fn from(cfg: &WaveformConfig) -> Self {
        Self {
            base_samples_per_line: cfg.base_samples_per_line,
            ladder: cfg.ladder.clone(),
            max_lines_per_level: cfg.max_lines_per_level,
            chunk_frames: cfg.chunk_frames,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaveformLod {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    levels: Vec<LodLevel>,
}

/// Accumulates base lines into one ladder level.
struct LevelBuilder {
    multiplier: usize,
    samples_per_line: usize,
    peaks: Vec<Peak>,
    acc: Peak,
    acc_count: usize,
    over_cap: bool,
}

impl LevelBuilder {
    fn push(&mut self, base: Peak, cap: usize) {
        if self.over_cap {
            return;
        }
        self.acc = self.acc.merge(base);
        self.acc_count += 1;
        if self.acc_count == self.multiplier {
            self.flush(cap);
        }
    }

    fn flush(&mut self, cap: usize) {
        if self.acc_count == 0 || self.over_cap {
            return;
        }
        self.peaks.push(self.acc);
        self.acc = Peak::EMPTY;
        self.acc_count = 0;
        if self.peaks.len() > cap {
            self.over_cap = true;
            self.peaks = Vec::new();
        }
    }
}

impl WaveformLod {
    /// Decode `decoder` to the end and build every ladder level.
    ///
    /// Levels whose line count would exceed the configured cap are left
    /// out. The returned value is complete; nothing is published while
    /// the build is in progress.
    pub fn build(decoder: &mut dyn AudioDecoder, settings: &LodSettings) -> Result<Self> {
        let sample_rate = decoder.sample_rate().max(1);
        let channels = decoder.channels().max(1) as usize;
        let base = settings.base_samples_per_line.max(1);
        let cap = settings.max_lines_per_level.max(1);
        let known_frames = decoder.total_frames();

        let mut ladder = settings.ladder.clone();
        ladder.retain(|m| *m > 0);
        ladder.sort_unstable();
        ladder.dedup();

        let mut builders: Vec<LevelBuilder> = ladder
            .iter()
            .filter(|&&m| {
                let spl = (base * m) as u64;
                known_frames == 0 || known_frames.div_ceil(spl) <= cap as u64
            })
            .map(|&m| LevelBuilder {
                multiplier: m,
                samples_per_line: base * m,
                peaks: Vec::new(),
                acc: Peak::EMPTY,
                acc_count: 0,
                over_cap: false,
            })
            .collect();
        if builders.len() < ladder.len() {
            log::debug!(
                "Skipping {} waveform levels over the {} line cap",
                ladder.len() - builders.len(),
                cap
            );
        }

        let line_len = base * channels;
        let mut chunk = Vec::with_capacity(settings.chunk_frames * channels);
        let mut carry: Vec<f32> = Vec::with_capacity(line_len);
        let mut frames_read: u64 = 0;

        loop {
            let n = decoder.read_chunk(settings.chunk_frames.max(1), &mut chunk)?;
            if n == 0 {
                break;
            }
            frames_read += n as u64;

            let data: &[f32] = if carry.is_empty() {
                &chunk
            } else {
                carry.extend_from_slice(&chunk);
                &carry
            };
            let whole = data.len() / line_len * line_len;
            let base_peaks: Vec<Peak> = data[..whole].par_chunks(line_len).map(Peak::of).collect();
            let rest = data[whole..].to_vec();

            for peak in base_peaks {
                for b in builders.iter_mut() {
                    b.push(peak, cap);
                }
            }
            carry = rest;
        }

        if !carry.is_empty() {
            let tail = Peak::of(&carry);
            for b in builders.iter_mut() {
                b.push(tail, cap);
            }
        }

        let levels = builders
            .into_iter()
            .filter_map(|mut b| {
                b.flush(cap);
                (!b.over_cap).then(|| LodLevel {
                    samples_per_line: b.samples_per_line,
                    lines_per_second: sample_rate as f64 / b.samples_per_line as f64,
                    peaks: b.peaks,
                })
            })
            .collect();

        Ok(Self {
            duration_seconds: frames_read as f64 / sample_rate as f64,
            sample_rate,
            channels: channels as u16,
            levels,
        })
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&LodLevel> {
        self.levels.get(index)
    }

    /// Level whose line density is closest to `pixels_per_second` times the
    /// density factor. Ties go to the finer level.
    pub fn select_lod(&self, pixels_per_second: f64) -> Option<usize> {
        let target = pixels_per_second * LOD_DENSITY_FACTOR;
        let mut best: Option<(usize, f64)> = None;
        for (i, level) in self.levels.iter().enumerate() {
            let d = (level.lines_per_second - target).abs();
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Lines of `level` overlapping `[t0, t1]`, located by binary search.
    pub fn peaks_in(&self, level: usize, t0: f64, t1: f64) -> VisibleSpan<'_> {
        let Some(lvl) = self.levels.get(level) else {
            return VisibleSpan {
                first_line: 0,
                peaks: &[],
            };
        };
        let (t0, t1) = if t1 < t0 { (t1, t0) } else { (t0, t1) };
        let n = lvl.peaks.len();
        let dur = lvl.line_duration();
        // first line whose end lies past t0
        let start = lower_bound(n, |i| lvl.line_start(i) + dur <= t0);
        // first line starting after t1
        let end = lower_bound(n, |i| lvl.line_start(i) <= t1).max(start);
        VisibleSpan {
            first_line: start,
            peaks: &lvl.peaks[start..end],
        }
    }
}

/// First index in `0..n` for which `pred` is false; `pred` must be
/// true for a prefix and false afterwards.
fn lower_bound(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0usize, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_import::MemoryDecoder;

    fn settings(ladder: &[usize]) -> LodSettings {
        LodSettings {
            base_samples_per_line: 4,
            ladder: ladder.to_vec(),
            max_lines_per_level: 1_000_000,
            chunk_frames: 10,
        }
    }

    fn ramp(frames: usize) -> MemoryDecoder {
        let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
        MemoryDecoder::new(samples, 1, 1000)
    }

    #[test]
    fn levels_have_increasing_samples_per_line() {
        let lod = WaveformLod::build(&mut ramp(1000), &settings(&[5, 1, 2, 2])).unwrap();
        let spl: Vec<usize> = lod.levels().iter().map(|l| l.samples_per_line).collect();
        assert_eq!(spl, vec![4, 8, 20]);
        assert_eq!(lod.levels()[0].peaks.len(), 250);
        assert_eq!(lod.levels()[1].peaks.len(), 125);
        assert_eq!(lod.levels()[2].peaks.len(), 50);
        assert!((lod.duration_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chunk_boundaries_do_not_split_lines() {
        // chunk of 10 frames is not a multiple of the 4-frame line
        let lod = WaveformLod::build(&mut ramp(1000), &settings(&[1])).unwrap();
        let p = lod.levels()[0].peaks[3];
        assert!((p.min - 12.0 / 1000.0).abs() < 1e-6);
        assert!((p.max - 15.0 / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn peaks_span_all_channels() {
        let samples = vec![0.5, -0.25, 0.1, -0.75, 0.2, 0.0, 0.3, 0.9];
        let mut dec = MemoryDecoder::new(samples, 2, 100);
        let lod = WaveformLod::build(&mut dec, &settings(&[1])).unwrap();
        assert_eq!(lod.levels()[0].peaks, vec![Peak { min: -0.75, max: 0.9 }]);
    }

    #[test]
    fn trailing_partial_line_is_kept() {
        let lod = WaveformLod::build(&mut ramp(10), &settings(&[1, 2])).unwrap();
        assert_eq!(lod.levels()[0].peaks.len(), 3);
        assert_eq!(lod.levels()[1].peaks.len(), 2);
    }

    #[test]
    fn levels_over_cap_are_skipped() {
        let mut s = settings(&[1, 10, 100]);
        s.max_lines_per_level = 30;
        let lod = WaveformLod::build(&mut ramp(1000), &s).unwrap();
        let spl: Vec<usize> = lod.levels().iter().map(|l| l.samples_per_line).collect();
        assert_eq!(spl, vec![40, 400]);
    }

    #[test]
    fn select_lod_is_monotonic() {
        let lod = WaveformLod::build(&mut ramp(100_000), &settings(&LOD_LADDER)).unwrap();
        let mut previous = usize::MAX;
        let mut pps = 0.01;
        while pps < 10_000.0 {
            let idx = lod.select_lod(pps).unwrap();
            assert!(idx <= previous, "coarser level at {pps} px/s");
            previous = idx;
            pps *= 1.07;
        }
        // 250 lines/s is the finest level for base 4 at 1 kHz
        assert_eq!(lod.select_lod(1000.0), Some(0));
    }

    #[test]
    fn select_lod_prefers_finer_on_tie() {
        let lod = WaveformLod::build(&mut ramp(1000), &settings(&[1, 2])).unwrap();
        // lines/s are 250 and 125; target 187.5 is equidistant
        assert_eq!(lod.select_lod(125.0), Some(0));
    }

    #[test]
    fn peaks_in_finds_covering_lines() {
        let lod = WaveformLod::build(&mut ramp(1000), &settings(&[1])).unwrap();
        // 250 lines/s, each line 4ms
        let span = lod.peaks_in(0, 0.010, 0.020);
        assert_eq!(span.first_line, 2);
        assert_eq!(span.peaks.len(), 4);

        let all = lod.peaks_in(0, -5.0, 50.0);
        assert_eq!((all.first_line, all.peaks.len()), (0, 250));

        let past = lod.peaks_in(0, 5.0, 6.0);
        assert!(past.peaks.is_empty());
        assert!(lod.peaks_in(9, 0.0, 1.0).peaks.is_empty());
    }
}
