//! Immutable snapshots of the session for the playback side.
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::idgen::{ClipId, TrackId};
use crate::model::{AutomationKey, AutomationLane, AutomationPoint, Clip, MidiNote, Track, TrackKind};
use crate::project::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub revision: u64,
    pub bpm: f64,
    pub time_signature: (u32, u32),
    pub tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub track_id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    pub clips: Vec<ClipSnapshot>,
    pub automation: Vec<AutomationSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClipContent {
    Audio { source: PathBuf, offset: f64, gain: f32 },
    Midi { notes: Vec<MidiNote> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipSnapshot {
    pub clip_id: ClipId,
    pub start: f64,
    pub duration: f64,
    pub content: ClipContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutomationSnapshot {
    pub key: AutomationKey,
    pub live_value: f32,
    pub points: Vec<AutomationPoint>,
}

impl AutomationSnapshot {
    /// Parameter value at `time`, using the same curve rules as the editor.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut lane = AutomationLane::new(self.live_value);
        lane.points = self.points.clone();
        lane.value_at(time)
    }
}

pub fn build_session_snapshot(session: &Session) -> SessionSnapshot {
    SessionSnapshot {
        revision: session.revision(),
        bpm: session.bpm,
        time_signature: session.time_signature,
        tracks: session.tracks().map(track_to_snapshot).collect(),
    }
}

fn track_to_snapshot(t: &Track) -> TrackSnapshot {
    TrackSnapshot {
        track_id: t.id,
        name: t.name.clone(),
        kind: t.kind,
        clips: t.clips().iter().map(clip_to_snapshot).collect(),
        automation: t
            .automation_lanes()
            .map(|(key, lane)| AutomationSnapshot {
                key: key.clone(),
                live_value: lane.live_value,
                points: lane.points().to_vec(),
            })
            .collect(),
    }
}

fn clip_to_snapshot(c: &Clip) -> ClipSnapshot {
    let content = match c {
        Clip::Audio(a) => ClipContent::Audio {
            source: a.source.clone(),
            offset: a.offset,
            gain: a.gain,
        },
        Clip::Midi(m) => ClipContent::Midi {
            notes: m.notes.clone(),
        },
    };
    ClipSnapshot {
        clip_id: c.id(),
        start: c.start(),
        duration: c.duration(),
        content,
    }
}

/// Hands snapshots to a playback consumer whenever the session changed.
///
/// The channel holds one snapshot; if the consumer has not picked up the
/// previous one, the newer snapshot is retried on the next publish.
pub struct SnapshotPublisher {
    tx: Sender<Arc<SessionSnapshot>>,
    last_sent: Option<u64>,
}

impl SnapshotPublisher {
    pub fn new() -> (Self, Receiver<Arc<SessionSnapshot>>) {
        let (tx, rx) = bounded(1);
        (Self { tx, last_sent: None }, rx)
    }

    /// Returns true if a snapshot was sent.
    pub fn publish(&mut self, session: &mut Session) -> bool {
        if self.last_sent == Some(session.revision()) {
            return false;
        }
        let snapshot = session.snapshot();
        match self.tx.try_send(snapshot) {
            Ok(()) => {
                self.last_sent = Some(session.revision());
                true
            }
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Snapshot consumer disconnected");
                false
            }
        }
    }
}
