mod load;
mod save;
mod store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use seq_transport::{Pattern, Row, STEP_COUNT, Tempo, Track, TrackId, default_kit};

pub use load::load_project;
pub use save::save_project;
pub use store::ProjectStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub bpm: f64,
    pub tracks: Vec<TrackData>,
    /// One row per track, `STEP_COUNT` cells each.
    pub pattern: Vec<Vec<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub name: String,
    pub sample: PathBuf,
    pub gain_db: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("project '{0}' not found")]
    NotFound(String),

    #[error("invalid project name '{0}'")]
    InvalidName(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

impl Project {
    pub fn new(name: impl Into<String>, tempo: Tempo, tracks: &[Track], pattern: &Pattern) -> Self {
        Self {
            name: name.into(),
            bpm: tempo.bpm(),
            tracks: tracks
                .iter()
                .map(|track| TrackData {
                    name: track.name.clone(),
                    sample: track.sample.clone(),
                    gain_db: track.gain_db,
                })
                .collect(),
            pattern: pattern.rows().iter().map(|row| row.to_vec()).collect(),
        }
    }

    /// An empty pattern on the reference kit.
    pub fn with_default_kit(name: impl Into<String>, tempo: Tempo) -> Self {
        let kit = default_kit();
        Self::new(name, tempo, &kit, &Pattern::new(kit.len()))
    }

    /// Stored tempo, clamped into the playable range.
    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.bpm)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(index, data)| {
                Track::new(TrackId(index), data.name.clone(), data.sample.clone(), data.gain_db)
            })
            .collect()
    }

    /// The stored grid, checked against the track list and the bar length.
    pub fn pattern(&self) -> Result<Pattern, ProjectError> {
        if self.pattern.len() != self.tracks.len() {
            return Err(ProjectError::InvalidPattern(format!(
                "{} rows for {} tracks",
                self.pattern.len(),
                self.tracks.len()
            )));
        }

        let rows = self
            .pattern
            .iter()
            .enumerate()
            .map(|(index, cells)| {
                Row::try_from(cells.as_slice()).map_err(|_| {
                    ProjectError::InvalidPattern(format!(
                        "row {index} has {} steps, expected {STEP_COUNT}",
                        cells.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pattern::from_rows(rows))
    }
}
