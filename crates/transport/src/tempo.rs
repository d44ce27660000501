use crate::{BEATS_PER_BAR, STEP_COUNT, STEPS_PER_BEAT};

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 240.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Tempo in beats per minute, always within `[MIN_BPM, MAX_BPM]`.
///
/// Every timing quantity in the sequencer is derived from [`Tempo::step_secs`],
/// so the live player and the offline renderer cannot disagree about where a
/// step lands.
///
/// ```
/// use seq_transport::Tempo;
///
/// assert_eq!(Tempo::new(120.0).step_secs(), 0.125);
/// assert_eq!(Tempo::new(10.0).bpm(), 40.0);
/// assert_eq!(Tempo::new(9999.0).bpm(), 240.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tempo(f64);

impl Tempo {
    /// Clamp `bpm` into range. NaN falls back to [`DEFAULT_BPM`].
    pub fn new(bpm: f64) -> Self {
        if bpm.is_nan() {
            return Self(DEFAULT_BPM);
        }
        Self(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.0
    }

    pub fn beat_secs(&self) -> f64 {
        60.0 / self.0
    }

    /// Duration of one sixteenth-note step: `(60 / bpm) / 4`.
    pub fn step_secs(&self) -> f64 {
        self.beat_secs() / STEPS_PER_BEAT as f64
    }

    /// Duration of one bar. Multiplying by a power of two is exact, so this is
    /// bit-identical to `BEATS_PER_BAR * (60 / bpm)`.
    pub fn bar_secs(&self) -> f64 {
        self.step_secs() * STEP_COUNT as f64
    }

    pub fn step_frames(&self, sample_rate: u32) -> f64 {
        self.step_secs() * sample_rate as f64
    }

    pub fn bar_frames(&self, sample_rate: u32) -> u64 {
        frames_for(self.bar_secs(), sample_rate)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl From<f64> for Tempo {
    fn from(bpm: f64) -> Self {
        Self::new(bpm)
    }
}

impl std::fmt::Display for Tempo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Nearest whole frame for a duration in seconds.
pub fn frames_for(secs: f64, sample_rate: u32) -> u64 {
    (secs * sample_rate as f64).round() as u64
}

const _: () = assert!(STEP_COUNT as u32 == STEPS_PER_BEAT * BEATS_PER_BAR);
