use std::path::PathBuf;

/// Index of a track in the kit. Track order is fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

impl TrackId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One drum voice of the kit: a name, the sample it plays and its level.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Sample reference, resolved against the samples root when loading.
    pub sample: PathBuf,
    pub gain_db: f32,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, sample: impl Into<PathBuf>, gain_db: f32) -> Self {
        Self {
            id,
            name: name.into(),
            sample: sample.into(),
            gain_db,
        }
    }

    /// Linear amplitude for `gain_db`.
    pub fn gain(&self) -> f32 {
        db_to_gain(self.gain_db)
    }
}

pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// The reference three-piece kit.
pub fn default_kit() -> Vec<Track> {
    vec![
        Track::new(TrackId(0), "Kick", "kick.wav", -3.0),
        Track::new(TrackId(1), "Snare", "snare.wav", -6.0),
        Track::new(TrackId(2), "Hat", "hh.wav", -10.0),
    ]
}
