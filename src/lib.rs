pub mod audio_import;
pub mod audio_snapshot;
pub mod audio_state;
pub mod automation;
pub mod config;
pub mod constants;
pub mod error;
pub mod idgen;
pub mod input;
pub mod model;
pub mod paths;
pub mod project;
pub mod time_utils;
pub mod ui;
pub mod waveform;
pub mod waveform_cache;

pub use error::{Result, TimelineError};
pub use project::Session;
