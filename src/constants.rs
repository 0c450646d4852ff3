use egui::Color32;

// Tempo / meter defaults
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_TIME_SIGNATURE: (u32, u32) = (4, 4);

// UI Layout Constants
pub const TRACK_HEIGHT: f32 = 80.0;
pub const AUTOMATION_LANE_HEIGHT: f32 = 48.0;
pub const RULER_HEIGHT: f32 = 18.0;
pub const CLIP_VERTICAL_INSET: f32 = 4.0;

// Timeline Constants
pub const DEFAULT_BEAT_WIDTH: f32 = 100.0; // pixels per beat at zoom 1
pub const MIN_BEAT_WIDTH: f32 = 2.0;
pub const MAX_BEAT_WIDTH: f32 = 5000.0;
pub const ZOOM_IN_FACTOR: f32 = 1.1;
pub const ZOOM_OUT_FACTOR: f32 = 0.9;

// Grid resolution thresholds (beat width in px)
pub const GRID_MEASURES_ONLY_BELOW: f32 = 15.0;
pub const GRID_SUBDIVISIONS_FROM: f32 = 60.0;
pub const GRID_SUBDIVISION_STEPS: [(f32, u32); 4] = [(300.0, 8), (600.0, 16), (1200.0, 32), (2400.0, 64)];
pub const GRID_MARGIN_PX: f32 = 32.0;

// Interaction Constants
pub const EDGE_RESIZE_THRESHOLD: f32 = 6.0;
pub const AUTOMATION_POINT_RADIUS: f32 = 6.0;
pub const MIN_CLIP_DURATION: f64 = 0.1; // seconds
pub const DEFAULT_MIDI_CLIP_BEATS: f64 = 4.0;
pub const CURVE_DRAG_SENSITIVITY: f32 = 0.005; // curve units per px
pub const POINT_TIME_EPSILON: f64 = 0.001; // seconds
pub const CURVE_MAX_EXPONENT: f32 = 4.0;
pub const LINEAR_CURVE: f32 = 0.5;

// Playhead follow
pub const FOLLOW_RATE: f32 = 8.0; // 1/s
pub const FOLLOW_LEFT_MARGIN: f32 = 0.25;

// Waveform analysis
pub const BASE_SAMPLES_PER_LINE: usize = 16;
pub const LOD_LADDER: [usize; 12] = [1, 2, 5, 10, 20, 50, 100, 200, 500, 1000, 2000, 5000];
pub const MAX_LINES_PER_LEVEL: usize = 4_000_000;
pub const DECODE_CHUNK_FRAMES: usize = 65_536;
pub const LOD_DENSITY_FACTOR: f64 = 1.5;
pub const HASH_READ_CHUNK: usize = 64 * 1024;

// Geometry cache
pub const LANE_CACHE_CAPACITY: usize = 256;

// Colors
pub const COLOR_RULER_BG: Color32 = Color32::from_gray(22);
pub const COLOR_TRACK_BG_EVEN: Color32 = Color32::from_gray(25);
pub const COLOR_TRACK_BG_ODD: Color32 = Color32::from_gray(30);
pub const COLOR_GRID_MEASURE: Color32 = Color32::from_gray(70);
pub const COLOR_GRID_BEAT: Color32 = Color32::from_gray(50);
pub const COLOR_GRID_SUBDIVISION: Color32 = Color32::from_gray(38);
pub const COLOR_AUDIO_CLIP: Color32 = Color32::from_rgb(60, 90, 120);
pub const COLOR_MIDI_CLIP: Color32 = Color32::from_rgb(100, 150, 200);
pub const COLOR_MIDI_NOTE: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 100);
pub const COLOR_WAVEFORM: Color32 = Color32::from_rgb(150, 200, 240);
pub const COLOR_SELECTION: Color32 = Color32::WHITE;
pub const COLOR_PLAYHEAD: Color32 = Color32::from_rgb(255, 100, 100);
pub const COLOR_CURSOR: Color32 = Color32::from_rgb(255, 220, 120);
pub const COLOR_AUTOMATION_BG: Color32 = Color32::from_gray(22);
pub const COLOR_AUTOMATION_LINE: Color32 = Color32::from_rgb(100, 150, 255);
pub const COLOR_AUTOMATION_POINT: Color32 = Color32::from_rgb(150, 180, 255);
pub const COLOR_AUTOMATION_POINT_ACTIVE: Color32 = Color32::from_rgb(255, 200, 100);

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];
