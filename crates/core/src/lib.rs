mod loader;
pub mod session;
mod store;
pub mod time;

pub use loader::{BackgroundLoader, SampleLoad, decode_tracks};
pub use session::{DEFAULT_START_LEAD, PlaybackState, RenderJob, Session, SessionError};
pub use store::PatternStore;
pub use time::MusicalPosition;

pub use seq_decode::decode_file;
pub use seq_project::{Project, ProjectError, ProjectStore, TrackData};
pub use seq_render::{DEFAULT_CHANNELS, RenderError, RenderedBuffer};
pub use seq_transport::{
    AudioArc, MAX_BPM, MIN_BPM, Pattern, PatternError, STEP_COUNT, Tempo, Track, TrackId,
    default_kit,
};
