//! Process-wide id minting for tracks and clips.
//!
//! Ids are never reused within a process, so a `ClipId` held by an
//! interaction stays meaningful even after other clips are removed.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next() -> u64 {
    // 0 is reserved as "unassigned"
    let id = NEXT.fetch_add(1, Ordering::Relaxed);
    if id == 0 {
        NEXT.fetch_add(1, Ordering::Relaxed)
    } else {
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl TrackId {
    pub fn fresh() -> Self {
        TrackId(next())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl ClipId {
    pub fn fresh() -> Self {
        ClipId(next())
    }
}
