mod audio;
mod bank;
mod clock;
mod pattern;
mod tempo;
mod track;

pub use audio::{AudioArc, resample_audio_arc};
pub use bank::{RateMismatch, SampleBank, SampleSlot};
pub use clock::{Clock, Tick, firing_tracks, next_step};
pub use pattern::{Pattern, PatternError, Row};
pub use tempo::{DEFAULT_BPM, MAX_BPM, MIN_BPM, Tempo, frames_for};
pub use track::{Track, TrackId, db_to_gain, default_kit};

/// Steps in one bar: sixteenth notes of a 4/4 bar.
pub const STEP_COUNT: usize = 16;
pub const STEPS_PER_BEAT: u32 = 4;
pub const BEATS_PER_BAR: u32 = 4;

/// Transport commands sent to the live engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start from the top of the bar, `lead_frames` after the command is seen.
    Play { lead_frames: u64 },
    /// Halt future ticks. Sounding samples ring out.
    Stop,
    SetTempo(Tempo),
}

/// Notifications from the live engine. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Step just fired, or `None` once stopped.
    Cursor(Option<usize>),
    /// A tick wanted this track but its sample was not loaded.
    SampleSkipped(TrackId),
}
