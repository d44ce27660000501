use std::fmt;

use seq_transport::{STEP_COUNT, STEPS_PER_BEAT};

/// A step position written as `bar.beat.sixteenth`, each counting from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalPosition {
    pub bar: u32,
    pub beat: u32,
    pub sixteenth: u32,
}

impl MusicalPosition {
    /// Position of the `index`-th tick since playback started.
    pub fn from_tick(index: u64) -> Self {
        let steps_per_bar = STEP_COUNT as u64;
        let in_bar = (index % steps_per_bar) as u32;
        Self {
            bar: (index / steps_per_bar) as u32 + 1,
            beat: in_bar / STEPS_PER_BEAT + 1,
            sixteenth: in_bar % STEPS_PER_BEAT + 1,
        }
    }

    /// Position of a cursor step within the bar.
    pub fn from_step(step: usize) -> Self {
        Self::from_tick((step % STEP_COUNT) as u64)
    }
}

impl fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.bar, self.beat, self.sixteenth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_positions() {
        assert_eq!(MusicalPosition::from_step(0).to_string(), "1.1.1");
        assert_eq!(MusicalPosition::from_step(4).to_string(), "1.2.1");
        assert_eq!(MusicalPosition::from_step(15).to_string(), "1.4.4");
    }

    #[test]
    fn test_tick_positions_count_bars() {
        assert_eq!(MusicalPosition::from_tick(16).to_string(), "2.1.1");
        assert_eq!(MusicalPosition::from_tick(37).to_string(), "3.2.2");
    }
}
