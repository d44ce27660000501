use crate::{STEP_COUNT, TrackId};

pub type Row = [bool; STEP_COUNT];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("track {track} out of range (pattern has {tracks} tracks)")]
    TrackOutOfRange { track: usize, tracks: usize },

    #[error("step {step} out of range (pattern has {} steps)", STEP_COUNT)]
    StepOutOfRange { step: usize },
}

/// The track × step activation grid for one bar.
///
/// A `Pattern` is a plain value. Mutations that other threads must observe go
/// through [`Pattern::toggled`], which returns a new grid and leaves the
/// original untouched, so a reader holding a snapshot never sees a
/// half-applied edit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    rows: Vec<Row>,
}

impl Pattern {
    /// An empty grid with `track_count` rows.
    pub fn new(track_count: usize) -> Self {
        Self {
            rows: vec![[false; STEP_COUNT]; track_count],
        }
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn track_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_set(&self, track: TrackId, step: usize) -> bool {
        self.rows
            .get(track.0)
            .and_then(|row| row.get(step))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, track: TrackId, step: usize, on: bool) -> Result<(), PatternError> {
        self.check(track, step)?;
        self.rows[track.0][step] = on;
        Ok(())
    }

    /// Copy of this pattern with one cell flipped.
    pub fn toggled(&self, track: TrackId, step: usize) -> Result<Self, PatternError> {
        self.check(track, step)?;
        let mut next = self.clone();
        next.rows[track.0][step] = !next.rows[track.0][step];
        Ok(next)
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            *row = [false; STEP_COUNT];
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|on| !on))
    }

    /// Tracks whose cell at `step` is set, in track order.
    pub fn active_tracks(&self, step: usize) -> impl Iterator<Item = TrackId> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(_, row)| row.get(step).copied().unwrap_or(false))
            .map(|(index, _)| TrackId(index))
    }

    /// Whether the track fires anywhere in the bar.
    pub fn track_is_used(&self, track: TrackId) -> bool {
        self.rows
            .get(track.0)
            .is_some_and(|row| row.iter().any(|&on| on))
    }

    fn check(&self, track: TrackId, step: usize) -> Result<(), PatternError> {
        if track.0 >= self.rows.len() {
            return Err(PatternError::TrackOutOfRange {
                track: track.0,
                tracks: self.rows.len(),
            });
        }
        if step >= STEP_COUNT {
            return Err(PatternError::StepOutOfRange { step });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pattern_is_empty() {
        let pattern = Pattern::new(3);
        assert_eq!(pattern.track_count(), 3);
        assert!(pattern.is_empty());
        assert!(pattern.rows().iter().all(|row| row.len() == STEP_COUNT));
    }

    #[test]
    fn test_toggled_leaves_original_untouched() {
        let original = Pattern::new(3);
        let toggled = original.toggled(TrackId(1), 7).unwrap();

        assert!(!original.is_set(TrackId(1), 7));
        assert!(toggled.is_set(TrackId(1), 7));

        let back = toggled.toggled(TrackId(1), 7).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_out_of_range() {
        let pattern = Pattern::new(3);
        assert_eq!(
            pattern.toggled(TrackId(3), 0),
            Err(PatternError::TrackOutOfRange { track: 3, tracks: 3 })
        );
        assert_eq!(
            pattern.toggled(TrackId(0), 16),
            Err(PatternError::StepOutOfRange { step: 16 })
        );
        assert!(!pattern.is_set(TrackId(9), 99));
    }

    #[test]
    fn test_active_tracks() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 4, true).unwrap();
        pattern.set(TrackId(2), 4, true).unwrap();
        pattern.set(TrackId(1), 5, true).unwrap();

        let at_four: Vec<TrackId> = pattern.active_tracks(4).collect();
        assert_eq!(at_four, vec![TrackId(0), TrackId(2)]);
        assert_eq!(pattern.active_tracks(0).count(), 0);
        assert!(pattern.track_is_used(TrackId(1)));

        pattern.clear();
        assert!(pattern.is_empty());
        assert!(!pattern.track_is_used(TrackId(1)));
    }
}
