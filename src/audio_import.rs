//! Streaming access to audio files for waveform analysis.
//!
//! Decoders hand out interleaved `f32` frames in bounded chunks so a worker
//! never holds a whole file in memory.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::constants::AUDIO_EXTENSIONS;
use crate::error::{Result, TimelineError};

pub trait AudioDecoder: Send {
    fn sample_rate(&self) -> u32;
    /// Frames in the stream; 0 when the container does not say.
    fn total_frames(&self) -> u64;
    fn channels(&self) -> u16;
    /// Clear `out` and fill it with up to `max_frames` interleaved frames.
    /// Returns the number of frames read; 0 means end of stream.
    fn read_chunk(&mut self, max_frames: usize, out: &mut Vec<f32>) -> Result<usize>;

    fn duration_seconds(&self) -> f64 {
        if self.sample_rate() == 0 {
            0.0
        } else {
            self.total_frames() as f64 / self.sample_rate() as f64
        }
    }
}

/// Pick a decoder by file extension.
pub fn open_decoder(path: &Path) -> Result<Box<dyn AudioDecoder>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" => Ok(Box::new(WavDecoder::open(path)?)),
        ext if AUDIO_EXTENSIONS.contains(&ext) => Ok(Box::new(SymphoniaDecoder::open(path)?)),
        _ => Err(TimelineError::Decode(format!(
            "Unsupported audio format: {}",
            extension
        ))),
    }
}

/// Length of an audio file in seconds, read from its header.
pub fn probe_duration(path: &Path) -> Result<f64> {
    Ok(open_decoder(path)?.duration_seconds())
}

pub struct WavDecoder {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    remaining: u64,
}

impl WavDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let remaining = reader.duration() as u64;
        Ok(Self {
            reader,
            spec,
            remaining,
        })
    }
}

impl AudioDecoder for WavDecoder {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn total_frames(&self) -> u64 {
        self.reader.duration() as u64
    }

    fn channels(&self) -> u16 {
        self.spec.channels
    }

    fn read_chunk(&mut self, max_frames: usize, out: &mut Vec<f32>) -> Result<usize> {
        out.clear();
        let frames = (max_frames as u64).min(self.remaining) as usize;
        if frames == 0 {
            return Ok(0);
        }
        let wanted = frames * self.spec.channels as usize;
        out.reserve(wanted);

        match self.spec.sample_format {
            hound::SampleFormat::Float => {
                for s in self.reader.samples::<f32>().take(wanted) {
                    out.push(s?);
                }
            }
            hound::SampleFormat::Int => {
                let max_val = (1_i64 << (self.spec.bits_per_sample.max(1) - 1)) as f32;
                for s in self.reader.samples::<i32>().take(wanted) {
                    out.push(s? as f32 / max_val);
                }
            }
        }

        let read = out.len() / self.spec.channels.max(1) as usize;
        self.remaining = self.remaining.saturating_sub(read as u64);
        if read < frames {
            // header promised more than the file holds
            self.remaining = 0;
        }
        Ok(read)
    }
}

pub struct SymphoniaDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
    sample_buf: Option<SampleBuffer<f32>>,
    pending: Vec<f32>,
    finished: bool,
}

impl SymphoniaDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| TimelineError::Decode("No audio tracks found".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| TimelineError::Decode("Unknown sample rate".to_string()))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let total_frames = params.n_frames.unwrap_or(0);

        let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            total_frames,
            sample_buf: None,
            pending: Vec::new(),
            finished: false,
        })
    }

    /// Decode one packet into `pending`. Returns false at end of stream.
    fn decode_next(&mut self) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let buf = self.sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                    });
                    buf.copy_interleaved_ref(decoded);
                    self.pending.extend_from_slice(buf.samples());
                    return Ok(true);
                }
                // corrupt frames happen near the end of some files
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_chunk(&mut self, max_frames: usize, out: &mut Vec<f32>) -> Result<usize> {
        out.clear();
        let ch = self.channels.max(1) as usize;
        let wanted = max_frames * ch;
        while self.pending.len() < wanted && !self.finished {
            if !self.decode_next()? {
                self.finished = true;
            }
        }
        let take = wanted.min(self.pending.len() / ch * ch);
        out.extend(self.pending.drain(..take));
        Ok(take / ch)
    }
}

/// Decoder over samples already in memory.
pub struct MemoryDecoder {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    cursor: usize,
}

impl MemoryDecoder {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
            cursor: 0,
        }
    }
}

impl AudioDecoder for MemoryDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_chunk(&mut self, max_frames: usize, out: &mut Vec<f32>) -> Result<usize> {
        out.clear();
        let ch = self.channels as usize;
        let end = (self.cursor + max_frames * ch).min(self.samples.len() / ch * ch);
        out.extend_from_slice(&self.samples[self.cursor..end]);
        let frames = (end - self.cursor) / ch;
        self.cursor = end;
        Ok(frames)
    }
}
