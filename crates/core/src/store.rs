use std::sync::Arc;

use seq_transport::{Pattern, PatternError, TrackId};

/// Owner of the current pattern.
///
/// Readers take an `Arc` snapshot that never changes under them; every edit
/// builds a new pattern and swaps it in whole.
#[derive(Debug, Clone)]
pub struct PatternStore {
    current: Arc<Pattern>,
}

impl PatternStore {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            current: Arc::new(pattern),
        }
    }

    pub fn snapshot(&self) -> Arc<Pattern> {
        Arc::clone(&self.current)
    }

    /// Flip one cell. Returns the cell's new state.
    pub fn toggle(&mut self, track: TrackId, step: usize) -> Result<bool, PatternError> {
        let next = self.current.toggled(track, step)?;
        let on = next.is_set(track, step);
        self.current = Arc::new(next);
        Ok(on)
    }

    pub fn set(&mut self, track: TrackId, step: usize, on: bool) -> Result<(), PatternError> {
        let mut next = (*self.current).clone();
        next.set(track, step, on)?;
        self.current = Arc::new(next);
        Ok(())
    }

    pub fn clear(&mut self) {
        let mut next = (*self.current).clone();
        next.clear();
        self.current = Arc::new(next);
    }
}
