use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::automation::{AutomationKey, AutomationLane};
use super::clip::{Clip, ClipKind};
use crate::idgen::{ClipId, TrackId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Midi,
}

impl TrackKind {
    pub fn accepts(self, clip: ClipKind) -> bool {
        matches!(
            (self, clip),
            (TrackKind::Audio, ClipKind::Audio) | (TrackKind::Midi, ClipKind::Midi)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    /// Sorted by start time; intervals never overlap.
    pub(crate) clips: Vec<Clip>,
    pub(crate) automation: BTreeMap<AutomationKey, AutomationLane>,
    /// Template for double-click placement.
    pub reference_clip: Option<Clip>,
    /// Lane shown under the track, if any.
    pub shown_automation: Option<AutomationKey>,
    /// Bumped on every mutation of clips or automation.
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::fresh(),
            name: name.into(),
            kind,
            clips: Vec::new(),
            automation: BTreeMap::new(),
            reference_clip: None,
            shown_automation: None,
            revision: 0,
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id() == id)
    }

    pub(crate) fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id() == id)
    }

    pub fn clip_at(&self, time: f64) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(time))
    }

    pub fn automation_lanes(&self) -> impl Iterator<Item = (&AutomationKey, &AutomationLane)> {
        self.automation.iter()
    }

    pub fn automation(&self, key: &AutomationKey) -> Option<&AutomationLane> {
        self.automation.get(key)
    }

    /// True when `[start, end)` is disjoint from every clip except `ignore`.
    pub fn fits(&self, start: f64, end: f64, ignore: Option<ClipId>) -> bool {
        self.clips
            .iter()
            .filter(|c| Some(c.id()) != ignore)
            .all(|other| end <= other.start() || start >= other.end())
    }

    /// End of the nearest clip left of `id` and start of the nearest clip right of it.
    pub fn free_span_around(&self, id: ClipId) -> (f64, f64) {
        let Some(clip) = self.clip(id) else {
            return (0.0, f64::INFINITY);
        };
        let mut lo = 0.0_f64;
        let mut hi = f64::INFINITY;
        for other in self.clips.iter().filter(|c| c.id() != id) {
            if other.end() <= clip.start() {
                lo = lo.max(other.end());
            } else if other.start() >= clip.end() {
                hi = hi.min(other.start());
            }
        }
        (lo, hi)
    }

    pub(crate) fn sort_clips(&mut self) {
        self.clips.sort_by(|a, b| a.start().total_cmp(&b.start()));
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
