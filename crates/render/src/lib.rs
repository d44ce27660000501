mod wav;

use std::path::Path;

use seq_transport::{Clock, Pattern, STEP_COUNT, SampleBank, Tempo, TrackId, firing_tracks};
use tracing::debug;

pub use wav::{HEADER_LEN, encode_wav, pcm16, write_wav};

/// Channel count of an export when the caller does not ask for one.
pub const DEFAULT_CHANNELS: u16 = 2;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("sample for track {track} is not loaded")]
    SampleNotLoaded { track: TrackId },

    #[error("track {track} is {found} Hz but other samples are {expected} Hz")]
    SampleRateMismatch {
        track: TrackId,
        expected: u32,
        found: u32,
    },

    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    #[error("no sample data loaded, cannot pick a sample rate")]
    NoSampleData,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Planar float audio produced by an offline render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl RenderedBuffer {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn to_wav(&self) -> Result<Vec<u8>, RenderError> {
        encode_wav(self.sample_rate, &self.channels)
    }
}

/// Render exactly one bar of `pattern` at `tempo`.
///
/// Everything is checked before mixing starts, so the call either returns the
/// whole bar or an error, never a partial buffer. The buffer runs at the
/// samples' native rate; each triggered sample is added in at its tick's
/// frame and cut off at the end of the bar.
pub fn render_bar(
    pattern: &Pattern,
    tempo: Tempo,
    bank: &SampleBank,
    channels: u16,
) -> Result<RenderedBuffer, RenderError> {
    if channels == 0 {
        return Err(RenderError::InvalidBuffer("no output channels".to_string()));
    }

    let sample_rate = match bank.common_sample_rate() {
        Ok(Some(rate)) => rate,
        Ok(None) => return Err(RenderError::NoSampleData),
        Err(mismatch) => {
            return Err(RenderError::SampleRateMismatch {
                track: mismatch.track,
                expected: mismatch.expected,
                found: mismatch.found,
            });
        }
    };

    if let Some(track) = (0..pattern.track_count())
        .map(TrackId)
        .find(|&track| pattern.track_is_used(track) && !bank.is_loaded(track))
    {
        return Err(RenderError::SampleNotLoaded { track });
    }

    let frames = tempo.bar_frames(sample_rate) as usize;
    let mut output = vec![vec![0.0f32; frames]; channels as usize];
    let mut clock = Clock::new(tempo, sample_rate, 0);
    let mut triggers = 0usize;

    for _ in 0..STEP_COUNT {
        let tick = clock.advance();
        for track in firing_tracks(pattern, &tick) {
            let Some(audio) = bank.sample(track) else {
                continue;
            };
            let gain = bank.gain(track);
            let start = tick.frame as usize;
            let len = audio.frames().min(frames.saturating_sub(start));

            for (ch, out) in output.iter_mut().enumerate() {
                for (i, sample) in out[start..start + len].iter_mut().enumerate() {
                    *sample += audio.frame_sample(i, ch) * gain;
                }
            }
            triggers += 1;
        }
    }

    debug!(
        frames,
        sample_rate,
        triggers,
        bpm = tempo.bpm(),
        "offline render completed"
    );

    Ok(RenderedBuffer {
        sample_rate,
        channels: output,
    })
}

/// Render one bar and encode it as WAV bytes.
pub fn render_wav(
    pattern: &Pattern,
    tempo: Tempo,
    bank: &SampleBank,
    channels: u16,
) -> Result<Vec<u8>, RenderError> {
    render_bar(pattern, tempo, bank, channels)?.to_wav()
}

/// Render one bar straight to a WAV file.
pub fn render_to_file(
    pattern: &Pattern,
    tempo: Tempo,
    bank: &SampleBank,
    channels: u16,
    path: &Path,
) -> Result<(), RenderError> {
    let bytes = render_wav(pattern, tempo, bank, channels)?;
    write_wav(&bytes, path)
}
