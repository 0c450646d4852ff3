use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use egui::{Key, Modifiers, Pos2, pos2, vec2};
use pretty_assertions::assert_eq;

use yadaw_timeline::audio_state::TransportState;
use yadaw_timeline::config::EditorConfig;
use yadaw_timeline::idgen::TrackId;
use yadaw_timeline::input::InputFrame;
use yadaw_timeline::model::{AudioClip, Clip, MidiClip, Track, TrackKind};
use yadaw_timeline::project::Session;
use yadaw_timeline::ui::{Interaction, TimelineView};
use yadaw_timeline::waveform::LodSettings;
use yadaw_timeline::waveform_cache::WaveformCache;

struct Harness {
    session: Session,
    timeline: TimelineView,
    transport: Arc<TransportState>,
    cache: WaveformCache,
}

impl Harness {
    fn new(width: f32) -> Self {
        let transport = Arc::new(TransportState::new());
        let mut timeline = TimelineView::new(EditorConfig::default());
        timeline.set_size(vec2(width, 400.0));
        Self {
            session: Session::new(120.0),
            cache: WaveformCache::new(transport.clone(), LodSettings::default()),
            transport,
            timeline,
        }
    }

    fn tick(&mut self, input: InputFrame) {
        self.timeline
            .update(&mut self.session, &input, &self.transport, &mut self.cache, 1.0 / 60.0);
    }

    /// Point in `track`'s clip band at pixel `x`.
    fn at(&self, track: TrackId, x: f32) -> Pos2 {
        let layout = self.timeline.layout(&self.session);
        let lane = layout.iter().find(|l| l.track == track).unwrap();
        pos2(x, lane.clip_band.center().y)
    }
}

fn write_wav(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * 8000.0) as usize;
    for i in 0..frames {
        let s = ((i % 80) as i16 - 40) * 600;
        writer.write_sample(s).unwrap();
        writer.write_sample(-s).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn double_click_at_x250_places_clip_on_nearest_grid_line() {
    let mut h = Harness::new(1600.0);
    let track = h.session.add_track(Track::new("MIDI 1", TrackKind::Midi));

    h.tick(InputFrame::double_click(h.at(track, 250.0)));

    let mapper = h.timeline.mapper(&h.session);
    let expected = h.timeline.grid().find_nearest(mapper.pixels_to_seconds(250.0)).unwrap();
    let clips = h.session.track(track).unwrap().clips();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].start(), expected);
    assert_eq!(expected, 1.25);
}

#[test]
fn dragging_end_edge_past_start_clamps_to_minimum_duration() {
    let mut h = Harness::new(1600.0);
    let track = h.session.add_track(Track::new("MIDI 1", TrackKind::Midi));
    let id = h.session.insert_clip(track, Clip::Midi(MidiClip::new(1.0, 2.0))).unwrap();

    // 200 px/s: the clip spans x=200..600
    h.tick(InputFrame::press(h.at(track, 600.0)));
    assert!(matches!(h.timeline.view.interaction, Interaction::ResizingEnd { .. }));

    // end at 0.5 s would make the duration -0.5 s
    h.tick(InputFrame::drag(h.at(track, 100.0)));
    h.tick(InputFrame::release(h.at(track, 100.0)));

    let clip = h.session.clip(id).unwrap();
    assert_eq!(clip.start(), 1.0);
    assert_eq!(clip.duration(), 0.1);
    assert!(h.timeline.view.interaction.is_idle());
}

#[test]
fn paste_at_ten_seconds_copies_audio_clip_and_selects_it() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("take.wav");
    write_wav(&source, 3.0);

    let mut h = Harness::new(2400.0);
    let track = h.session.add_track(Track::new("Audio 1", TrackKind::Audio));
    let mut original = AudioClip::new(&source, 0.0, 2.0);
    original.offset = 0.5;
    original.gain = 0.8;
    let original_id = h.session.insert_clip(track, Clip::Audio(original.clone())).unwrap();

    // select, copy, move the cursor to 10 s, paste
    h.tick(InputFrame::press(h.at(track, 200.0)));
    h.tick(InputFrame::release(h.at(track, 200.0)));
    h.tick(
        InputFrame::hover(h.at(track, 200.0))
            .with_key(Key::C)
            .with_modifiers(Modifiers::CTRL),
    );
    h.tick(InputFrame::press(h.at(track, 2000.0)));
    h.tick(InputFrame::release(h.at(track, 2000.0)));
    assert_eq!(h.timeline.view.cursor_time, 10.0);
    h.tick(
        InputFrame::hover(h.at(track, 2000.0))
            .with_key(Key::V)
            .with_modifiers(Modifiers::CTRL),
    );

    let clips = h.session.track(track).unwrap().clips();
    assert_eq!(clips.len(), 2);
    let pasted = clips.iter().find(|c| c.id() != original_id).unwrap();
    let Clip::Audio(pasted) = pasted else {
        panic!("pasted clip is not audio");
    };
    assert_eq!(pasted.start, 10.0);
    assert_eq!(pasted.duration, original.duration);
    assert_eq!(pasted.offset, original.offset);
    assert_eq!(pasted.source, original.source);
    assert_eq!(pasted.gain, original.gain);
    assert_eq!(h.timeline.view.selection.map(|s| s.clip), Some(pasted.id));
}

#[test]
fn tracks_on_the_same_file_share_one_waveform() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("loop.wav");
    write_wav(&source, 2.0);

    let mut h = Harness::new(1600.0);
    let reference = Clip::Audio(AudioClip::new(&source, 0.0, 2.0));
    let mut tracks = Vec::new();
    for name in ["Audio 1", "Audio 2"] {
        let track = h.session.add_track(Track::new(name, TrackKind::Audio));
        h.session.set_reference_clip(track, Some(reference.clone()));
        tracks.push(track);
    }
    for &track in &tracks {
        h.tick(InputFrame::double_click(h.at(track, 40.0)));
    }
    assert!(h.cache.wait_idle(Duration::from_secs(20)));

    assert_eq!(h.cache.entry_count(), 1);
    assert_eq!(h.cache.generations_started(), 1);
    assert_eq!(h.cache.hashes_for_track(tracks[0]), h.cache.hashes_for_track(tracks[1]));

    let frame = h.timeline.build_geometry(&h.session, &h.cache);
    for &track in &tracks {
        let lane = frame.lane(track).unwrap();
        let strokes = lane
            .primitives
            .iter()
            .filter(|p| {
                matches!(p, yadaw_timeline::ui::Primitive::Line { stroke, .. }
                    if stroke.color == yadaw_timeline::constants::COLOR_WAVEFORM)
            })
            .count();
        assert!(strokes > 0, "lane for {track:?} has no waveform");
    }
}
