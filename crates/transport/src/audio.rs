use std::sync::Arc;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Shared, immutable decoded sample data.
///
/// `AudioArc` keeps interleaved samples in an `Arc<[f32]>` next to the
/// sample rate and channel count, so cloning only bumps a reference count.
/// The sample bank, the live player and the offline renderer all hold clones
/// of the same data; nobody ever mutates it.
///
/// # Memory Layout
///
/// ```text
/// AudioArc (24 bytes on stack)
/// ├─ samples: Arc<[f32]> (16 bytes) ────> Heap: [f32; N]
/// ├─ sample_rate: u32 (4 bytes)
/// └─ channels: u16 (2 bytes)
/// ```
///
/// # Examples
///
/// ```
/// use seq_transport::AudioArc;
///
/// let audio = AudioArc::new(vec![0.0, 0.5, 1.0, 0.5], 44100, 2);
/// let shared = audio.clone();
/// assert_eq!(audio.frames(), 2);
/// assert_eq!(shared.samples()[2], 1.0);
/// ```
#[derive(Clone)]
pub struct AudioArc {
    /// Interleaved samples: [L, R, L, R, ...] for stereo.
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioArc {
    /// Create a new `AudioArc` from owned interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0 or if `samples.len()` is not divisible by `channels`.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        }
    }

    /// Build a mono `AudioArc`, mostly useful for fixtures and synthesized clicks.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// The shared slice itself, for reference-count checks.
    pub fn samples_arc(&self) -> &Arc<[f32]> {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample at `frame` for an output channel.
    ///
    /// Output channels beyond the sample's own channel count wrap around, so a
    /// mono sample feeds every output channel.
    #[inline]
    pub fn frame_sample(&self, frame: usize, output_channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples[frame * channels + output_channel % channels]
    }

    /// Resample to `target_sample_rate`.
    ///
    /// Returns a cheap clone when the rate already matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use seq_transport::AudioArc;
    ///
    /// let audio = AudioArc::new(vec![0.0; 4410], 44100, 1);
    /// let resampled = audio.resample(48000).unwrap();
    /// assert_eq!(resampled.sample_rate(), 48000);
    /// ```
    pub fn resample(&self, target_sample_rate: u32) -> anyhow::Result<Self> {
        if self.sample_rate == target_sample_rate {
            return Ok(self.clone());
        }
        resample_audio_arc(self, target_sample_rate)
    }
}

impl std::fmt::Debug for AudioArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArc")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

/// Sinc-resample an `AudioArc` to `target_sample_rate`.
pub fn resample_audio_arc(audio: &AudioArc, target_sample_rate: u32) -> anyhow::Result<AudioArc> {
    if audio.sample_rate == target_sample_rate {
        return Ok(audio.clone());
    }
    if audio.is_empty() {
        return Ok(AudioArc::new(Vec::new(), target_sample_rate, audio.channels));
    }

    let channels = audio.channels as usize;
    let input_frames = audio.frames();
    let ratio = target_sample_rate as f64 / audio.sample_rate as f64;

    // rubato wants planar input
    let mut planar = vec![Vec::with_capacity(input_frames); channels];
    for frame in audio.samples.chunks_exact(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            planar[ch].push(sample);
        }
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_frames, channels)?;
    let output = resampler.process(&planar, None)?;

    let output_frames = output.first().map_or(0, Vec::len);
    let mut interleaved = Vec::with_capacity(output_frames * channels);
    for frame_idx in 0..output_frames {
        for channel in &output {
            interleaved.push(channel[frame_idx]);
        }
    }

    Ok(AudioArc::new(interleaved, target_sample_rate, audio.channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(frequency: f32, sample_rate: u32, duration_secs: f32, channels: u16) -> AudioArc {
        let frames = (sample_rate as f32 * duration_secs) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let value = (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin();
            for _ in 0..channels {
                samples.push(value);
            }
        }
        AudioArc::new(samples, sample_rate, channels)
    }

    #[test]
    fn test_audio_arc_new() {
        let audio = AudioArc::new(vec![0.0, 0.1, 0.2, 0.3], 44100, 2);
        assert_eq!(audio.sample_rate(), 44100);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frames(), 2);
        assert!(!audio.is_empty());
    }

    #[test]
    #[should_panic(expected = "channels must be greater than 0")]
    fn test_audio_arc_zero_channels() {
        AudioArc::new(vec![0.0], 44100, 0);
    }

    #[test]
    #[should_panic(expected = "samples.len() must be divisible by channels")]
    fn test_audio_arc_invalid_length() {
        AudioArc::new(vec![0.0, 0.1, 0.2], 44100, 2);
    }

    #[test]
    fn test_clone_shares_samples() {
        let audio = AudioArc::new(vec![0.0; 1000], 44100, 2);
        let other = audio.clone();
        assert_eq!(Arc::strong_count(audio.samples_arc()), 2);
        assert_eq!(other.frames(), 500);
    }

    #[test]
    fn test_frame_sample_wraps_mono_to_every_channel() {
        let audio = AudioArc::mono(vec![0.25, 0.5], 44100);
        assert_eq!(audio.frame_sample(1, 0), 0.5);
        assert_eq!(audio.frame_sample(1, 1), 0.5);

        let stereo = AudioArc::new(vec![0.1, 0.2, 0.3, 0.4], 44100, 2);
        assert_eq!(stereo.frame_sample(1, 0), 0.3);
        assert_eq!(stereo.frame_sample(1, 1), 0.4);
    }

    #[test]
    fn test_duration() {
        let audio = AudioArc::new(vec![0.0; 44100 * 2], 44100, 2);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resample_same_rate_is_cheap_clone() {
        let audio = sine(440.0, 44100, 0.05, 2);
        let resampled = audio.resample(44100).unwrap();
        assert_eq!(resampled.frames(), audio.frames());
        assert_eq!(Arc::strong_count(audio.samples_arc()), 2);
    }

    #[test]
    fn test_resample_upsampling_length() {
        let audio = sine(440.0, 44100, 0.1, 2);
        let resampled = audio.resample(48000).unwrap();

        assert_eq!(resampled.sample_rate(), 48000);
        assert_eq!(resampled.channels(), 2);

        let expected = (audio.frames() as f64 * 48000.0 / 44100.0) as i64;
        let tolerance = (expected as f64 * 0.03) as i64;
        assert!(
            (resampled.frames() as i64 - expected).abs() <= tolerance,
            "expected ~{} frames, got {}",
            expected,
            resampled.frames()
        );
    }

    #[test]
    fn test_resample_empty() {
        let audio = AudioArc::mono(Vec::new(), 44100);
        let resampled = audio.resample(48000).unwrap();
        assert!(resampled.is_empty());
        assert_eq!(resampled.sample_rate(), 48000);
    }
}
