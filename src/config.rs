use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::error::Result;
use crate::paths::config_path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub view: ViewConfig,
    pub editing: EditingConfig,
    pub playback: PlaybackConfig,
    pub waveform: WaveformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub beat_width: f32,
    pub track_height: f32,
    pub automation_lane_height: f32,
    pub ruler_height: f32,
    pub ui_scale: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    pub snap_enabled: bool,
    pub min_clip_duration: f64,
    pub edge_threshold_px: f32,
    pub point_hit_radius_px: f32,
    pub default_midi_clip_beats: f64,
    pub curve_drag_sensitivity: f32,
    pub point_time_epsilon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub follow_playhead: bool,
    pub follow_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    pub base_samples_per_line: usize,
    pub max_lines_per_level: usize,
    pub chunk_frames: usize,
    pub ladder: Vec<usize>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            beat_width: DEFAULT_BEAT_WIDTH,
            track_height: TRACK_HEIGHT,
            automation_lane_height: AUTOMATION_LANE_HEIGHT,
            ruler_height: RULER_HEIGHT,
            ui_scale: 1.0,
        }
    }
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            min_clip_duration: MIN_CLIP_DURATION,
            edge_threshold_px: EDGE_RESIZE_THRESHOLD,
            point_hit_radius_px: AUTOMATION_POINT_RADIUS,
            default_midi_clip_beats: DEFAULT_MIDI_CLIP_BEATS,
            curve_drag_sensitivity: CURVE_DRAG_SENSITIVITY,
            point_time_epsilon: POINT_TIME_EPSILON,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            follow_playhead: true,
            follow_rate: FOLLOW_RATE,
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            base_samples_per_line: BASE_SAMPLES_PER_LINE,
            max_lines_per_level: MAX_LINES_PER_LEVEL,
            chunk_frames: DECODE_CHUNK_FRAMES,
            ladder: LOD_LADDER.to_vec(),
        }
    }
}

impl EditorConfig {
    /// Load from the platform config dir, falling back to defaults.
    pub fn load() -> Self {
        match config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        config.sanitize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn sanitize(&mut self) {
        let w = &mut self.waveform;
        w.base_samples_per_line = w.base_samples_per_line.max(1);
        w.chunk_frames = w.chunk_frames.max(w.base_samples_per_line);
        w.ladder.retain(|&m| m > 0);
        w.ladder.sort_unstable();
        w.ladder.dedup();
        if w.ladder.is_empty() {
            w.ladder = LOD_LADDER.to_vec();
        }
        self.editing.min_clip_duration = self.editing.min_clip_duration.max(1e-3);
        self.view.ui_scale = self.view.ui_scale.max(0.1);
        self.view.beat_width = self.view.beat_width.clamp(MIN_BEAT_WIDTH, MAX_BEAT_WIDTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(&path, r#"{ "editing": { "min_clip_duration": 0.25 } }"#).unwrap();

        let config = EditorConfig::load_from(&path).unwrap();
        assert_eq!(config.editing.min_clip_duration, 0.25);
        assert!(config.editing.snap_enabled);
        assert_eq!(config.waveform.ladder, LOD_LADDER.to_vec());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("timeline.json");
        let mut config = EditorConfig::default();
        config.playback.follow_playhead = false;
        config.waveform.ladder = vec![10, 1, 10, 5];
        config.save_to(&path).unwrap();

        let loaded = EditorConfig::load_from(&path).unwrap();
        assert!(!loaded.playback.follow_playhead);
        assert_eq!(loaded.waveform.ladder, vec![1, 5, 10]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(EditorConfig::load_from(&path).is_err());
    }
}
