use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::loader::{BackgroundLoader, SampleLoad, decode_tracks};
use crate::store::PatternStore;
use crate::time::MusicalPosition;
use seq_engine::AudioEngineHandle;
use seq_project::{Project, ProjectError};
use seq_render::{DEFAULT_CHANNELS, RenderError, RenderedBuffer, render_bar, write_wav};
use seq_transport::{
    AudioArc, Command, Pattern, PatternError, SampleBank, Status, Tempo, Track, TrackId,
    frames_for,
};
use tracing::{debug, info, warn};

/// Delay between `start` and the first tick, so the first step is not cut
/// short by the block already in flight.
pub const DEFAULT_START_LEAD: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("pattern has {rows} rows for {tracks} tracks")]
    TrackCountMismatch { rows: usize, tracks: usize },

    #[error("no track {track}")]
    UnknownTrack { track: TrackId },

    #[error("no audio output attached")]
    NoOutput,

    #[error("engine command queue is full")]
    CommandQueueFull,

    #[error("audio engine: {0:#}")]
    Engine(anyhow::Error),
}

/// Everything an export needs, captured by value.
///
/// Later edits to the session do not reach a job that was already prepared.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pattern: Arc<Pattern>,
    tempo: Tempo,
    bank: SampleBank,
    channels: u16,
}

impl RenderJob {
    pub fn render_buffer(&self) -> Result<RenderedBuffer, RenderError> {
        render_bar(&self.pattern, self.tempo, &self.bank, self.channels)
    }

    /// Render one bar to WAV bytes.
    pub fn run(&self) -> Result<Vec<u8>, RenderError> {
        self.render_buffer()?.to_wav()
    }

    pub fn run_to_file(&self, path: &Path) -> Result<(), RenderError> {
        let bytes = self.run()?;
        write_wav(&bytes, path)?;
        info!(
            path = %path.display(),
            bytes = bytes.len(),
            channels = self.channels,
            "pattern exported"
        );
        Ok(())
    }
}

pub struct Session {
    tracks: Vec<Track>,
    patterns: PatternStore,
    tempo: Tempo,
    bank: SampleBank,
    engine: Option<AudioEngineHandle>,
    loader: Option<BackgroundLoader>,
    cursor: Option<usize>,
    playback_state: PlaybackState,
    start_lead: Duration,
}

impl Session {
    /// A session with no audio output. Call [`Session::attach_output`] to play.
    pub fn new(tracks: Vec<Track>, pattern: Pattern, tempo: Tempo) -> Result<Self, SessionError> {
        if pattern.track_count() != tracks.len() {
            return Err(SessionError::TrackCountMismatch {
                rows: pattern.track_count(),
                tracks: tracks.len(),
            });
        }

        let bank = SampleBank::new(&tracks);
        Ok(Self {
            tracks,
            patterns: PatternStore::new(pattern),
            tempo,
            bank,
            engine: None,
            loader: None,
            cursor: None,
            playback_state: PlaybackState::Stopped,
            start_lead: DEFAULT_START_LEAD,
        })
    }

    pub fn from_project(project: &Project) -> Result<Self, SessionError> {
        Self::new(project.tracks(), project.pattern()?, project.tempo())
    }

    pub fn to_project(&self, name: impl Into<String>) -> Project {
        Project::new(name, self.tempo, &self.tracks, &self.patterns.snapshot())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Look a track up by case-insensitive name or 1-based number.
    pub fn find_track(&self, key: &str) -> Option<TrackId> {
        if let Ok(number) = key.parse::<usize>() {
            return (1..=self.tracks.len())
                .contains(&number)
                .then(|| TrackId(number - 1));
        }
        self.tracks
            .iter()
            .find(|track| track.name.eq_ignore_ascii_case(key))
            .map(|track| track.id)
    }

    pub fn set_start_lead(&mut self, lead: Duration) {
        self.start_lead = lead;
    }

    // Pattern

    pub fn pattern(&self) -> Arc<Pattern> {
        self.patterns.snapshot()
    }

    /// Flip one cell and return its new state. Audible from the next tick.
    pub fn toggle(&mut self, track: TrackId, step: usize) -> Result<bool, SessionError> {
        let on = self.patterns.toggle(track, step)?;
        self.publish_pattern();
        Ok(on)
    }

    pub fn set_step(&mut self, track: TrackId, step: usize, on: bool) -> Result<(), SessionError> {
        self.patterns.set(track, step, on)?;
        self.publish_pattern();
        Ok(())
    }

    pub fn clear_pattern(&mut self) {
        self.patterns.clear();
        self.publish_pattern();
    }

    fn publish_pattern(&self) {
        if let Some(engine) = &self.engine {
            engine.publish_pattern((*self.patterns.snapshot()).clone());
        }
    }

    // Tempo

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Set the tempo, clamped to the playable range. Returns what was applied.
    ///
    /// If the engine cannot take the change the session keeps its old tempo.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<Tempo, SessionError> {
        let tempo = Tempo::new(bpm);
        if tempo == self.tempo {
            return Ok(tempo);
        }
        if let Some(engine) = self.engine.as_mut() {
            if !engine.send(Command::SetTempo(tempo)) {
                return Err(SessionError::CommandQueueFull);
            }
        }
        self.tempo = tempo;
        debug!(bpm = tempo.bpm(), "tempo set");
        Ok(tempo)
    }

    // Samples

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    pub fn install_sample(&mut self, track: TrackId, audio: AudioArc) -> Result<(), SessionError> {
        if !self.bank.insert(track, audio) {
            return Err(SessionError::UnknownTrack { track });
        }
        self.publish_bank()
    }

    /// Decode every track's sample in parallel and install what succeeded.
    /// Returns the failures, which leave their slots unloaded.
    pub fn load_samples(&mut self, samples_root: &Path) -> Result<Vec<(TrackId, anyhow::Error)>, SessionError> {
        let loads = decode_tracks(&self.tracks, samples_root);
        let failures = self.apply_loads(loads);
        self.publish_bank()?;
        Ok(failures)
    }

    /// Decode samples on a background thread. Results are installed by
    /// [`Session::poll`] as they arrive.
    pub fn spawn_sample_loading(&mut self, samples_root: &Path) {
        self.loader = Some(BackgroundLoader::spawn(
            self.tracks.clone(),
            samples_root.to_path_buf(),
        ));
    }

    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(|loader| !loader.is_finished())
    }

    fn apply_loads(&mut self, loads: Vec<SampleLoad>) -> Vec<(TrackId, anyhow::Error)> {
        let mut failures = Vec::new();
        for load in loads {
            match load.result {
                Ok(audio) => {
                    info!(
                        track = %load.track,
                        frames = audio.frames(),
                        sample_rate = audio.sample_rate(),
                        "sample loaded"
                    );
                    self.bank.insert(load.track, audio);
                }
                Err(e) => {
                    warn!(track = %load.track, "failed to load sample: {e:#}");
                    failures.push((load.track, e));
                }
            }
        }
        failures
    }

    fn publish_bank(&self) -> Result<(), SessionError> {
        if let Some(engine) = &self.engine {
            engine.publish_bank(&self.bank).map_err(SessionError::Engine)?;
        }
        Ok(())
    }

    // Transport

    /// Open the default output device. Playback picks up the current pattern,
    /// tempo and samples.
    pub fn attach_output(&mut self) -> Result<(), SessionError> {
        if self.engine.is_some() {
            return Ok(());
        }
        let engine = seq_engine::start((*self.patterns.snapshot()).clone(), &self.bank, self.tempo)
            .map_err(SessionError::Engine)?;
        self.attach_engine(engine);
        Ok(())
    }

    /// Use an already running engine, replacing any attached one. Its pattern
    /// and samples are brought up to date.
    pub fn attach_engine(&mut self, engine: AudioEngineHandle) {
        self.engine = Some(engine);
        self.cursor = None;
        self.playback_state = PlaybackState::Stopped;
        self.publish_pattern();
        if let Err(e) = self.publish_bank() {
            warn!("failed to publish samples: {e}");
        }
    }

    pub fn has_output(&self) -> bool {
        self.engine.is_some()
    }

    /// Start looping from step 0 after the start lead. A no-op while playing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let lead = self.start_lead;
        let engine = self.engine.as_mut().ok_or(SessionError::NoOutput)?;
        if self.playback_state.is_playing() {
            return Ok(());
        }

        let lead_frames = frames_for(lead.as_secs_f64(), engine.sample_rate());
        if !engine.send(Command::Play { lead_frames }) {
            return Err(SessionError::CommandQueueFull);
        }
        self.cursor = None;
        self.playback_state = PlaybackState::Playing;
        info!(bpm = self.tempo.bpm(), lead_frames, "playback started");
        Ok(())
    }

    /// Stop scheduling ticks. Sounding samples ring out.
    ///
    /// The session stays playing if the engine cannot take the command.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if let Some(engine) = self.engine.as_mut() {
            if !engine.send(Command::Stop) {
                return Err(SessionError::CommandQueueFull);
            }
        }
        self.cursor = None;
        self.playback_state = PlaybackState::Stopped;
        Ok(())
    }

    /// Install finished background loads and drain engine notifications.
    /// Returns the latest cursor.
    pub fn poll(&mut self) -> Option<usize> {
        if let Some(loader) = self.loader.as_mut() {
            let loads = loader.drain();
            let finished = loader.is_finished();
            if !loads.is_empty() {
                self.apply_loads(loads);
                if let Err(e) = self.publish_bank() {
                    warn!("failed to publish samples: {e}");
                }
            }
            if finished {
                self.loader = None;
            }
        }

        if let Some(engine) = self.engine.as_mut() {
            for status in engine.drain_status() {
                match status {
                    Status::Cursor(cursor) => {
                        // a late tick from before a stop must not revive the cursor
                        if self.playback_state.is_playing() {
                            self.cursor = cursor;
                        }
                    }
                    Status::SampleSkipped(track) => {
                        debug!(%track, "trigger skipped, sample not loaded");
                    }
                }
            }
            engine.collect();
        }

        self.cursor
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn position(&self) -> Option<MusicalPosition> {
        self.cursor.map(MusicalPosition::from_step)
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state.is_playing()
    }

    // Export

    /// Capture the current pattern, tempo and samples for an offline render.
    pub fn prepare_render(&self, channels: u16) -> RenderJob {
        RenderJob {
            pattern: self.patterns.snapshot(),
            tempo: self.tempo,
            bank: self.bank.clone(),
            channels,
        }
    }

    pub fn render(&self) -> Result<Vec<u8>, RenderError> {
        self.prepare_render(DEFAULT_CHANNELS).run()
    }

    pub fn render_to_file(&self, path: &Path) -> Result<(), RenderError> {
        self.prepare_render(DEFAULT_CHANNELS).run_to_file(path)
    }
}
