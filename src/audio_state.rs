use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Transport flags shared between the playback engine and the editor.
///
/// The playback side writes, the editor reads once per tick.
pub struct TransportState {
    pub playing: AtomicBool,
    /// Playhead position in seconds.
    pub position: AtomicCell<f64>,
}

impl TransportState {
    pub fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            position: AtomicCell::new(0.0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn position(&self) -> f64 {
        self.position.load()
    }

    pub fn set_position(&self, seconds: f64) {
        self.position.store(seconds.max(0.0));
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}
