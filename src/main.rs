use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use egui::{pos2, vec2};

use yadaw_timeline::audio_import::probe_duration;
use yadaw_timeline::audio_snapshot::SnapshotPublisher;
use yadaw_timeline::audio_state::TransportState;
use yadaw_timeline::config::EditorConfig;
use yadaw_timeline::constants::DEFAULT_BPM;
use yadaw_timeline::input::InputFrame;
use yadaw_timeline::model::{AudioClip, AutomationKey, Clip, Track, TrackKind};
use yadaw_timeline::project::Session;
use yadaw_timeline::time_utils::format_bars_beats_sixteenths;
use yadaw_timeline::ui::TimelineView;
use yadaw_timeline::waveform::LodSettings;
use yadaw_timeline::waveform_cache::WaveformCache;

const FRAME_DT: f32 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Starting yadaw-timeline...");

    let config = EditorConfig::load();
    let sources: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let source = match sources.first() {
        Some(path) => path.clone(),
        None => write_demo_tone().context("writing demo tone")?,
    };
    let duration = probe_duration(&source).with_context(|| format!("reading {}", source.display()))?;
    log::info!("Using {} ({:.2}s)", source.display(), duration);

    let transport = Arc::new(TransportState::new());
    let mut cache = WaveformCache::new(transport.clone(), LodSettings::from(&config.waveform));
    let (mut publisher, snapshots) = SnapshotPublisher::new();
    let mut session = Session::new(DEFAULT_BPM);
    let mut timeline = TimelineView::new(config);
    timeline.set_size(vec2(1280.0, 480.0));

    // two audio tracks sharing one file, plus a MIDI track with automation
    let reference = Clip::Audio(AudioClip::new(source.clone(), 0.0, duration.min(4.0)));
    for name in ["Audio 1", "Audio 2"] {
        let track = session.add_track(Track::new(name, TrackKind::Audio));
        session.set_reference_clip(track, Some(reference.clone()));
    }
    let synth = session.add_track(Track::new("MIDI 1", TrackKind::Midi));
    session.show_automation(synth, Some(AutomationKey::new(0, "volume")));

    let layouts = timeline.layout(&session);
    for lane in &layouts {
        let click = InputFrame::double_click(pos2(250.0, lane.clip_band.center().y));
        timeline.update(&mut session, &click, &transport, &mut cache, FRAME_DT);
    }
    if let Some(area) = layouts.iter().find_map(|l| l.automation.clone()) {
        for (x, value) in [(100.0, 0.2), (600.0, 0.9), (1100.0, 0.4)] {
            let at = pos2(x, area.y_for(value));
            timeline.update(&mut session, &InputFrame::press(at), &transport, &mut cache, FRAME_DT);
            timeline.update(&mut session, &InputFrame::release(at), &transport, &mut cache, FRAME_DT);
        }
    }
    for extra in sources.iter().skip(1) {
        for lane in &layouts {
            cache.request(lane.track, extra);
        }
    }

    if !cache.wait_idle(Duration::from_secs(60)) {
        log::warn!("Waveform generation still running, drawing without it");
    }
    if let Some(error) = cache.failure(&source) {
        log::warn!("No waveform for {}: {}", source.display(), error);
    }
    println!(
        "{} waveform entries for {} clips",
        cache.entry_count(),
        session.tracks().map(|t| t.clips().len()).sum::<usize>()
    );

    let geometry = timeline.build_geometry(&session, &cache);
    println!(
        "Frame: {} primitives ({} ruler, {} lanes, {} overlay)",
        geometry.primitive_count(),
        geometry.ruler.len(),
        geometry.lanes.len(),
        geometry.overlay.len()
    );

    if publisher.publish(&mut session)
        && let Ok(snapshot) = snapshots.try_recv()
    {
        println!(
            "Published snapshot r{} with {} tracks",
            snapshot.revision,
            snapshot.tracks.len()
        );
    }

    // ten seconds of simulated playback with follow scrolling
    transport.set_playing(true);
    for frame in 0..600 {
        transport.set_position(frame as f64 * FRAME_DT as f64);
        timeline.update(&mut session, &InputFrame::default(), &transport, &mut cache, FRAME_DT);
    }
    transport.set_playing(false);

    let time = session.time();
    let position = transport.position();
    println!(
        "Stopped at {} (scroll {:.1}px, playhead x {:.1})",
        format_bars_beats_sixteenths(time.seconds_to_beats(position), time.beats_per_bar()),
        timeline.view.scroll_offset(),
        timeline.playhead_x()
    );

    let geometry = timeline.build_geometry(&session, &cache);
    let (hits, misses) = timeline.lane_cache().stats();
    println!(
        "Frame: {} primitives, lane cache {} hits / {} misses",
        geometry.primitive_count(),
        hits,
        misses
    );

    Ok(())
}

/// Two seconds of a 220 Hz sine in the temp dir.
fn write_demo_tone() -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join("yadaw-timeline-demo.wav");
    if path.exists() {
        return Ok(path);
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..88_200u32 {
        let t = i as f32 / 44_100.0;
        let sample = (t * 220.0 * std::f32::consts::TAU).sin() * 0.6;
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(path)
}
