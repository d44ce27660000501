//! Step clock shared by the live player and the offline renderer.
//!
//! Tick times are computed from an anchor (`start + index * step`), never by
//! adding a step to the previous tick, so rounding never accumulates.

use crate::{Pattern, STEP_COUNT, Tempo, TrackId};

/// One scheduled step activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Ticks since the clock started, counting from 0.
    pub index: u64,
    /// Step of the bar this tick plays, `index % STEP_COUNT`.
    pub step: usize,
    /// Scheduled output frame.
    pub frame: u64,
}

#[derive(Debug, Clone)]
pub struct Clock {
    tempo: Tempo,
    sample_rate: u32,
    anchor_frame: u64,
    anchor_tick: u64,
    next_tick: u64,
}

impl Clock {
    /// A clock whose first tick lands on `start_frame`.
    pub fn new(tempo: Tempo, sample_rate: u32, start_frame: u64) -> Self {
        Self {
            tempo,
            sample_rate,
            anchor_frame: start_frame,
            anchor_tick: 0,
            next_tick: 0,
        }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Scheduled frame of tick `index` under the current tempo.
    ///
    /// Indices before the current anchor are clamped to it.
    pub fn tick_frame(&self, index: u64) -> u64 {
        let since_anchor = index.saturating_sub(self.anchor_tick);
        let offset = (since_anchor as f64 * self.tempo.step_frames(self.sample_rate)).round();
        self.anchor_frame + offset as u64
    }

    pub fn next_frame(&self) -> u64 {
        self.tick_frame(self.next_tick)
    }

    /// Emit the next tick.
    pub fn advance(&mut self) -> Tick {
        let index = self.next_tick;
        let tick = Tick {
            index,
            step: (index % STEP_COUNT as u64) as usize,
            frame: self.tick_frame(index),
        };
        self.next_tick += 1;
        tick
    }

    /// Change tempo from the next pending tick on. That tick keeps the frame it
    /// already had; spacing after it follows the new tempo.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        if tempo == self.tempo {
            return;
        }
        self.anchor_frame = self.next_frame();
        self.anchor_tick = self.next_tick;
        self.tempo = tempo;
    }
}

/// Cursor rule: `(cursor + 1) mod STEP_COUNT`, step 0 after "stopped".
pub fn next_step(cursor: Option<usize>) -> usize {
    cursor.map_or(0, |step| (step + 1) % STEP_COUNT)
}

/// Tracks that fire on `tick`.
///
/// The one scheduling decision both playback paths share; it reads the pattern
/// handed to it and nothing else.
pub fn firing_tracks<'a>(
    pattern: &'a Pattern,
    tick: &Tick,
) -> impl Iterator<Item = TrackId> + use<'a> {
    pattern.active_tracks(tick.step)
}
