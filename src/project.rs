use std::collections::HashMap;
use std::sync::Arc;

use crate::audio_snapshot::{SessionSnapshot, build_session_snapshot};
use crate::constants::{DEFAULT_BPM, DEFAULT_TIME_SIGNATURE};
use crate::idgen::{ClipId, TrackId};
use crate::model::{AutomationKey, AutomationLane, Clip, Track};
use crate::time_utils::TimeConverter;

/// Tracks, clips and automation the editor operates on.
///
/// Tracks are addressed by [`TrackId`] and clips by [`ClipId`]; every
/// mutation goes through this type so per-track revisions and the cached
/// playback snapshot stay in step with the data.
#[derive(Debug, Clone)]
pub struct Session {
    pub bpm: f64,
    pub time_signature: (u32, u32),
    tracks: HashMap<TrackId, Track>,
    track_order: Vec<TrackId>,
    clips_by_id: HashMap<ClipId, TrackId>,
    revision: u64,
    snapshot: Option<Arc<SessionSnapshot>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl Session {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            time_signature: DEFAULT_TIME_SIGNATURE,
            tracks: HashMap::new(),
            track_order: Vec::new(),
            clips_by_id: HashMap::new(),
            revision: 0,
            snapshot: None,
        }
    }

    pub fn time(&self) -> TimeConverter {
        TimeConverter::new(self.bpm, self.time_signature.0)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ---------- tracks ----------

    pub fn add_track(&mut self, mut track: Track) -> TrackId {
        let id = track.id;
        track.sort_clips();
        for clip in &track.clips {
            self.clips_by_id.insert(clip.id(), id);
        }
        self.tracks.insert(id, track);
        self.track_order.push(id);
        self.bump(None);
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let track = self.tracks.remove(&id)?;
        self.track_order.retain(|t| *t != id);
        for clip in &track.clips {
            self.clips_by_id.remove(&clip.id());
        }
        self.bump(None);
        Some(track)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn track_order(&self) -> &[TrackId] {
        &self.track_order
    }

    /// Tracks in display order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.track_order.iter().filter_map(|id| self.tracks.get(id))
    }

    pub fn track_at_index(&self, index: usize) -> Option<TrackId> {
        self.track_order.get(index).copied()
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.track_order.iter().position(|t| *t == id)
    }

    pub fn set_reference_clip(&mut self, track: TrackId, clip: Option<Clip>) {
        if let Some(t) = self.tracks.get_mut(&track) {
            t.reference_clip = clip;
        }
    }

    pub fn show_automation(&mut self, track: TrackId, key: Option<AutomationKey>) {
        if let Some(t) = self.tracks.get_mut(&track) {
            if let Some(key) = &key {
                t.automation.entry(key.clone()).or_default();
            }
            t.shown_automation = key;
            t.touch();
        }
    }

    // ---------- clips ----------

    pub fn owner_of(&self, clip: ClipId) -> Option<TrackId> {
        self.clips_by_id.get(&clip).copied()
    }

    pub fn clip(&self, clip: ClipId) -> Option<&Clip> {
        let track = self.owner_of(clip)?;
        self.tracks.get(&track)?.clip(clip)
    }

    /// Insert `clip` on `track` if the kinds match and it overlaps nothing.
    pub fn insert_clip(&mut self, track: TrackId, clip: Clip) -> Option<ClipId> {
        let t = self.tracks.get_mut(&track)?;
        if !t.kind.accepts(clip.kind()) {
            log::debug!("Rejected {:?} clip on {:?} track {}", clip.kind(), t.kind, t.name);
            return None;
        }
        if clip.duration() <= 0.0 || clip.start() < 0.0 || !t.fits(clip.start(), clip.end(), None) {
            log::debug!(
                "Clip placement at {:.3}s on {} collides, ignored",
                clip.start(),
                t.name
            );
            return None;
        }
        let id = clip.id();
        t.clips.push(clip);
        t.sort_clips();
        self.clips_by_id.insert(id, track);
        self.bump(Some(track));
        Some(id)
    }

    pub fn remove_clip(&mut self, clip: ClipId) -> Option<Clip> {
        let track = self.clips_by_id.remove(&clip)?;
        let t = self.tracks.get_mut(&track)?;
        let idx = t.clips.iter().position(|c| c.id() == clip)?;
        let removed = t.clips.remove(idx);
        self.bump(Some(track));
        Some(removed)
    }

    /// Move a clip to `start`, keeping its duration. Refused on collision.
    pub fn move_clip(&mut self, clip: ClipId, start: f64) -> bool {
        let Some(track) = self.owner_of(clip) else {
            return false;
        };
        let Some(t) = self.tracks.get_mut(&track) else {
            return false;
        };
        let Some(duration) = t.clip(clip).map(Clip::duration) else {
            return false;
        };
        let start = start.max(0.0);
        if !t.fits(start, start + duration, Some(clip)) {
            return false;
        }
        if let Some(c) = t.clip_mut(clip) {
            if c.start() == start {
                return true;
            }
            c.set_start(start);
        }
        t.sort_clips();
        self.bump(Some(track));
        true
    }

    /// Replace a clip's bounds (and the audio source offset, if given).
    /// Refused on collision or non-positive duration.
    pub fn set_clip_span(&mut self, clip: ClipId, start: f64, duration: f64, offset: Option<f64>) -> bool {
        if duration <= 0.0 || start < 0.0 {
            return false;
        }
        let Some(track) = self.owner_of(clip) else {
            return false;
        };
        let Some(t) = self.tracks.get_mut(&track) else {
            return false;
        };
        if !t.fits(start, start + duration, Some(clip)) {
            return false;
        }
        let Some(c) = t.clip_mut(clip) else {
            return false;
        };
        c.set_start(start);
        c.set_duration(duration);
        if let (Clip::Audio(audio), Some(offset)) = (c, offset) {
            audio.offset = offset.max(0.0);
        }
        t.sort_clips();
        self.bump(Some(track));
        true
    }

    // ---------- automation ----------

    /// Run `edit` against the lane for `key`, creating it if needed.
    pub fn edit_automation<R>(
        &mut self,
        track: TrackId,
        key: &AutomationKey,
        edit: impl FnOnce(&mut AutomationLane) -> R,
    ) -> Option<R> {
        let t = self.tracks.get_mut(&track)?;
        let lane = t.automation.entry(key.clone()).or_default();
        let out = edit(lane);
        self.bump(Some(track));
        Some(out)
    }

    /// Update the live parameter value shown by point-less lanes.
    pub fn set_live_value(&mut self, track: TrackId, key: &AutomationKey, value: f32) {
        let value = value.clamp(0.0, 1.0);
        let unchanged = self
            .track(track)
            .and_then(|t| t.automation(key))
            .is_some_and(|lane| lane.live_value == value);
        if !unchanged {
            self.edit_automation(track, key, |lane| lane.live_value = value);
        }
    }

    // ---------- snapshots ----------

    /// Read-only view for playback, rebuilt lazily after mutations.
    pub fn snapshot(&mut self) -> Arc<SessionSnapshot> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        let snapshot = Arc::new(build_session_snapshot(self));
        self.snapshot = Some(snapshot.clone());
        snapshot
    }

    fn bump(&mut self, track: Option<TrackId>) {
        if let Some(t) = track.and_then(|id| self.tracks.get_mut(&id)) {
            t.touch();
        }
        self.revision = self.revision.wrapping_add(1);
        self.snapshot = None;
    }
}
