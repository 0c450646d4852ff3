use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::idgen::ClipId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MidiNote {
    pub pitch: u8,
    pub velocity: u8,
    /// Clip-relative start in seconds.
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MidiClip {
    pub id: ClipId,
    pub name: String,
    pub start: f64,
    pub duration: f64,
    /// Kept ordered by `start`.
    pub notes: Vec<MidiNote>,
}

impl MidiClip {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            id: ClipId::fresh(),
            name: "MIDI Clip".to_string(),
            start,
            duration,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, mut notes: Vec<MidiNote>) -> Self {
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.notes = notes;
        self
    }

    /// Identical content placed at `start`, under a fresh id.
    pub fn create_copy_at_time(&self, start: f64) -> Self {
        Self {
            id: ClipId::fresh(),
            start,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioClip {
    pub id: ClipId,
    pub name: String,
    pub source: PathBuf,
    /// Track-relative start in seconds.
    pub start: f64,
    /// Seconds into the source file.
    pub offset: f64,
    pub duration: f64,
    pub gain: f32,
}

impl AudioClip {
    pub fn new(source: impl Into<PathBuf>, start: f64, duration: f64) -> Self {
        let source = source.into();
        let name = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Audio Clip")
            .to_string();
        Self {
            id: ClipId::fresh(),
            name,
            source,
            start,
            offset: 0.0,
            duration,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipKind {
    Audio,
    Midi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Clip {
    Audio(AudioClip),
    Midi(MidiClip),
}

impl Clip {
    pub fn id(&self) -> ClipId {
        match self {
            Clip::Audio(c) => c.id,
            Clip::Midi(c) => c.id,
        }
    }

    pub fn kind(&self) -> ClipKind {
        match self {
            Clip::Audio(_) => ClipKind::Audio,
            Clip::Midi(_) => ClipKind::Midi,
        }
    }

    pub fn is_midi(&self) -> bool {
        matches!(self, Clip::Midi(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Clip::Audio(c) => &c.name,
            Clip::Midi(c) => &c.name,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Clip::Audio(c) => c.start,
            Clip::Midi(c) => c.start,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Clip::Audio(c) => c.duration,
            Clip::Midi(c) => c.duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start() + self.duration()
    }

    pub fn set_start(&mut self, start: f64) {
        match self {
            Clip::Audio(c) => c.start = start,
            Clip::Midi(c) => c.start = start,
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        match self {
            Clip::Audio(c) => c.duration = duration,
            Clip::Midi(c) => c.duration = duration,
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start() && time < self.end()
    }

    /// Deep copy with a fresh id, placed at `start`.
    pub fn copy_at(&self, start: f64) -> Clip {
        match self {
            Clip::Audio(c) => Clip::Audio(AudioClip {
                id: ClipId::fresh(),
                start,
                ..c.clone()
            }),
            Clip::Midi(c) => Clip::Midi(c.create_copy_at_time(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_copy_keeps_content() {
        let clip = MidiClip::new(1.0, 2.0).with_notes(vec![
            MidiNote {
                pitch: 64,
                velocity: 90,
                start: 0.5,
                duration: 0.25,
            },
            MidiNote {
                pitch: 60,
                velocity: 100,
                start: 0.0,
                duration: 0.5,
            },
        ]);
        assert_eq!(clip.notes[0].pitch, 60);

        let copy = clip.create_copy_at_time(8.0);
        assert_ne!(copy.id, clip.id);
        assert_eq!(copy.start, 8.0);
        assert_eq!(copy.duration, clip.duration);
        assert_eq!(copy.notes, clip.notes);
    }

    #[test]
    fn audio_copy_is_deep_and_fresh() {
        let mut original = AudioClip::new("/tmp/kick.wav", 2.0, 1.5);
        original.offset = 0.3;
        original.gain = 0.8;
        let clip = Clip::Audio(original);

        let copy = clip.copy_at(10.0);
        assert_ne!(copy.id(), clip.id());
        assert_eq!(copy.start(), 10.0);
        match (&clip, &copy) {
            (Clip::Audio(a), Clip::Audio(b)) => {
                assert_eq!(a.source, b.source);
                assert_eq!(a.offset, b.offset);
                assert_eq!(a.duration, b.duration);
                assert_eq!(a.gain, b.gain);
            }
            _ => panic!("kind changed"),
        }
    }

    #[test]
    fn contains_is_half_open() {
        let clip = Clip::Midi(MidiClip::new(1.0, 1.0));
        assert!(clip.contains(1.0));
        assert!(clip.contains(1.999));
        assert!(!clip.contains(2.0));
        assert_eq!(clip.name(), "MIDI Clip");
    }
}
