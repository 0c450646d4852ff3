pub mod automation;
pub mod clip;
pub mod track;

pub use automation::{AutomationKey, AutomationLane, AutomationPoint};
pub use clip::{AudioClip, Clip, ClipKind, MidiClip, MidiNote};
pub use track::{Track, TrackKind};
