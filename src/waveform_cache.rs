//! Content-addressed cache of waveform summaries built on worker threads.
//!
//! Entries are keyed by the SHA-256 of the file bytes, so the same audio
//! referenced from several tracks (or copied under several names) is
//! analysed once. Each unique file gets one named worker thread; finished
//! summaries come back over a channel and are installed by [`WaveformCache::poll`].
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::audio_import::open_decoder;
use crate::audio_state::TransportState;
use crate::constants::HASH_READ_CHUNK;
use crate::error::Result;
use crate::idgen::TrackId;
use crate::waveform::{LodSettings, WaveformLod};

pub type ContentHash = [u8; 32];

/// Streamed SHA-256 of a file's contents.
pub fn content_hash(path: &Path) -> Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_READ_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

#[derive(Debug, Clone)]
enum Entry {
    Building,
    Ready(Arc<WaveformLod>),
    Failed(String),
}

#[derive(Default)]
struct CacheMaps {
    by_hash: HashMap<ContentHash, Entry>,
    path_hash: HashMap<PathBuf, ContentHash>,
    track_hashes: HashMap<TrackId, HashSet<ContentHash>>,
    /// Paths with a worker running, and the tracks waiting on them.
    in_flight: HashMap<PathBuf, HashSet<TrackId>>,
    failed_paths: HashMap<PathBuf, String>,
}

enum WorkerMsg {
    Done {
        path: PathBuf,
        hash: ContentHash,
        result: std::result::Result<Arc<WaveformLod>, String>,
        elapsed: Duration,
    },
    /// The file's content is already cached or being built.
    Shared { path: PathBuf },
    Unreadable { path: PathBuf, error: String },
}

pub struct WaveformCache {
    maps: Arc<Mutex<CacheMaps>>,
    transport: Arc<TransportState>,
    settings: LodSettings,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
    /// Requests held back while the transport was playing.
    deferred: Vec<(TrackId, PathBuf)>,
    generations_started: Arc<AtomicUsize>,
    /// Bumped whenever an entry becomes ready or fails.
    revision: u64,
}

impl WaveformCache {
    pub fn new(transport: Arc<TransportState>, settings: LodSettings) -> Self {
        let (tx, rx) = unbounded();
        Self {
            maps: Arc::new(Mutex::new(CacheMaps::default())),
            transport,
            settings,
            tx,
            rx,
            deferred: Vec::new(),
            generations_started: Arc::new(AtomicUsize::new(0)),
            revision: 0,
        }
    }

    /// Ask for the waveform of `path` on behalf of `track`.
    ///
    /// Returns immediately. Nothing is started while the transport plays;
    /// such requests are retried by [`poll`](Self::poll) once it stops.
    pub fn request(&mut self, track: TrackId, path: &Path) {
        {
            let mut maps = self.maps.lock();
            if let Some(hash) = maps.path_hash.get(path).copied() {
                maps.track_hashes.entry(track).or_default().insert(hash);
                if maps.by_hash.contains_key(&hash) {
                    return;
                }
            }
            if maps.failed_paths.contains_key(path) {
                return;
            }
            if let Some(waiting) = maps.in_flight.get_mut(path) {
                waiting.insert(track);
                return;
            }
        }

        if self.transport.is_playing() {
            if !self.deferred.iter().any(|(t, p)| *t == track && p == path) {
                log::debug!("Deferring waveform for {} while playing", path.display());
                self.deferred.push((track, path.to_path_buf()));
            }
            return;
        }

        self.maps
            .lock()
            .in_flight
            .insert(path.to_path_buf(), HashSet::from([track]));
        self.spawn_worker(path.to_path_buf());
    }

    fn spawn_worker(&self, path: PathBuf) {
        let maps = self.maps.clone();
        let tx = self.tx.clone();
        let settings = self.settings.clone();
        let started = self.generations_started.clone();
        let name = format!(
            "waveform-{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file")
        );

        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name(name)
            .spawn(move || run_worker(worker_path, maps, tx, settings, started));

        if let Err(e) = spawned {
            log::error!("Failed to spawn waveform worker for {}: {}", path.display(), e);
            let _ = self.tx.send(WorkerMsg::Unreadable {
                path,
                error: e.to_string(),
            });
        }
    }

    /// Install finished results and restart deferred requests if the
    /// transport has stopped. Returns true if any entry changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            let mut maps = self.maps.lock();
            match msg {
                WorkerMsg::Done {
                    path,
                    hash,
                    result,
                    elapsed,
                } => {
                    maps.in_flight.remove(&path);
                    match result {
                        Ok(lod) => {
                            log::info!(
                                "Waveform ready for {} ({:.1}s audio, {} levels) in {:?}",
                                path.display(),
                                lod.duration_seconds,
                                lod.levels().len(),
                                elapsed
                            );
                            maps.by_hash.insert(hash, Entry::Ready(lod));
                        }
                        Err(error) => {
                            log::warn!("Waveform generation failed for {}: {}", path.display(), error);
                            maps.by_hash.insert(hash, Entry::Failed(error));
                        }
                    }
                    changed = true;
                }
                WorkerMsg::Shared { path } => {
                    maps.in_flight.remove(&path);
                    log::debug!("Reusing cached waveform for {}", path.display());
                    changed = true;
                }
                WorkerMsg::Unreadable { path, error } => {
                    maps.in_flight.remove(&path);
                    log::warn!("Cannot read {}: {}", path.display(), error);
                    maps.failed_paths.insert(path, error);
                    changed = true;
                }
            }
        }

        if !self.transport.is_playing() && !self.deferred.is_empty() {
            for (track, path) in std::mem::take(&mut self.deferred) {
                self.request(track, &path);
            }
        }

        if changed {
            self.revision = self.revision.wrapping_add(1);
        }
        changed
    }

    /// The finished summary for `path`, if one is ready.
    pub fn get(&self, path: &Path) -> Option<Arc<WaveformLod>> {
        let maps = self.maps.lock();
        let hash = maps.path_hash.get(path)?;
        match maps.by_hash.get(hash)? {
            Entry::Ready(lod) => Some(lod.clone()),
            Entry::Building | Entry::Failed(_) => None,
        }
    }

    pub fn is_ready(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn has_failed(&self, path: &Path) -> bool {
        self.failure(path).is_some()
    }

    /// Why the waveform for `path` could not be built.
    pub fn failure(&self, path: &Path) -> Option<String> {
        let maps = self.maps.lock();
        if let Some(error) = maps.failed_paths.get(path) {
            return Some(error.clone());
        }
        match maps.path_hash.get(path).and_then(|h| maps.by_hash.get(h))? {
            Entry::Failed(error) => Some(error.clone()),
            Entry::Building | Entry::Ready(_) => None,
        }
    }

    pub fn hash_of(&self, path: &Path) -> Option<ContentHash> {
        self.maps.lock().path_hash.get(path).copied()
    }

    pub fn hashes_for_track(&self, track: TrackId) -> Vec<ContentHash> {
        self.maps
            .lock()
            .track_hashes
            .get(&track)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of distinct content entries.
    pub fn entry_count(&self) -> usize {
        self.maps.lock().by_hash.len()
    }

    /// Workers that went on to decode (deduplicated ones excluded).
    pub fn generations_started(&self) -> usize {
        self.generations_started.load(Ordering::Relaxed)
    }

    pub fn has_pending(&self) -> bool {
        !self.deferred.is_empty() || !self.maps.lock().in_flight.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drop a track's references and any ready entries no track uses.
    pub fn forget_track(&mut self, track: TrackId) {
        self.deferred.retain(|(t, _)| *t != track);
        let mut maps = self.maps.lock();
        maps.track_hashes.remove(&track);
        let used: HashSet<ContentHash> = maps.track_hashes.values().flatten().copied().collect();
        maps.by_hash
            .retain(|hash, entry| matches!(entry, Entry::Building) || used.contains(hash));
        let CacheMaps {
            by_hash, path_hash, ..
        } = &mut *maps;
        path_hash.retain(|_, hash| by_hash.contains_key(hash));
    }

    /// Poll until no worker is running or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if !self.has_pending() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

fn run_worker(
    path: PathBuf,
    maps: Arc<Mutex<CacheMaps>>,
    tx: Sender<WorkerMsg>,
    settings: LodSettings,
    started: Arc<AtomicUsize>,
) {
    let hash = match content_hash(&path) {
        Ok(hash) => hash,
        Err(e) => {
            let _ = tx.send(WorkerMsg::Unreadable {
                path,
                error: e.to_string(),
            });
            return;
        }
    };

    {
        let mut maps = maps.lock();
        maps.path_hash.insert(path.clone(), hash);
        let waiting: Vec<TrackId> = maps
            .in_flight
            .get(&path)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for track in waiting {
            maps.track_hashes.entry(track).or_default().insert(hash);
        }
        if maps.by_hash.contains_key(&hash) {
            drop(maps);
            let _ = tx.send(WorkerMsg::Shared { path });
            return;
        }
        maps.by_hash.insert(hash, Entry::Building);
    }

    started.fetch_add(1, Ordering::Relaxed);
    log::info!("Generating waveform for {}", path.display());
    let t0 = Instant::now();
    let result = open_decoder(&path)
        .and_then(|mut decoder| WaveformLod::build(decoder.as_mut(), &settings))
        .map(Arc::new)
        .map_err(|e| e.to_string());

    let _ = tx.send(WorkerMsg::Done {
        path,
        hash,
        result,
        elapsed: t0.elapsed(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, frames: usize, seed: i16) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(((i as i16) % 200 - 100).wrapping_mul(seed)).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn cache(transport: Arc<TransportState>) -> WaveformCache {
        WaveformCache::new(transport, LodSettings::default())
    }

    #[test]
    fn identical_content_shares_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("copy_of_a.wav");
        write_wav(&a, 4000, 3);
        std::fs::copy(&a, &b).unwrap();

        let mut cache = cache(Arc::new(TransportState::new()));
        let (t1, t2) = (TrackId::fresh(), TrackId::fresh());
        cache.request(t1, &a);
        cache.request(t2, &b);
        assert!(cache.wait_idle(Duration::from_secs(20)));

        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.generations_started(), 1);
        assert_eq!(cache.hash_of(&a), cache.hash_of(&b));
        assert!(Arc::ptr_eq(&cache.get(&a).unwrap(), &cache.get(&b).unwrap()));
        assert_eq!(cache.hashes_for_track(t1), cache.hashes_for_track(t2));
    }

    #[test]
    fn generation_waits_for_transport_to_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.wav");
        write_wav(&path, 2000, 5);

        let transport = Arc::new(TransportState::new());
        transport.set_playing(true);
        let mut cache = cache(transport.clone());
        cache.request(TrackId::fresh(), &path);
        cache.poll();
        assert_eq!(cache.generations_started(), 0);
        assert!(cache.has_pending());

        transport.set_playing(false);
        assert!(cache.wait_idle(Duration::from_secs(20)));
        assert!(cache.is_ready(&path));
        assert_eq!(cache.generations_started(), 1);
    }

    #[test]
    fn missing_file_yields_no_waveform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.wav");
        let mut cache = cache(Arc::new(TransportState::new()));
        cache.request(TrackId::fresh(), &path);
        assert!(cache.wait_idle(Duration::from_secs(20)));
        assert!(cache.get(&path).is_none());
        assert!(cache.has_failed(&path));
    }

    #[test]
    fn undecodable_file_is_marked_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"not a riff header at all").unwrap();
        let mut cache = cache(Arc::new(TransportState::new()));
        cache.request(TrackId::fresh(), &path);
        assert!(cache.wait_idle(Duration::from_secs(20)));
        assert!(cache.get(&path).is_none());
        assert!(cache.has_failed(&path));
    }

    #[test]
    fn forgetting_last_track_drops_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.wav");
        write_wav(&path, 1000, 1);
        let mut cache = cache(Arc::new(TransportState::new()));
        let track = TrackId::fresh();
        cache.request(track, &path);
        assert!(cache.wait_idle(Duration::from_secs(20)));
        assert_eq!(cache.entry_count(), 1);
        cache.forget_track(track);
        assert_eq!(cache.entry_count(), 0);
        assert!(cache.get(&path).is_none());
    }
}
