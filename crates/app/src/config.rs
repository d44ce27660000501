use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory sample references are resolved against.
    pub samples_dir: PathBuf,
    pub projects_dir: PathBuf,
    pub export_channels: u16,
    pub start_lead_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            samples_dir: PathBuf::from("samples"),
            projects_dir: dirs::data_dir()
                .map(|p| p.join("stepseq").join("projects"))
                .unwrap_or_else(|| PathBuf::from("projects")),
            export_channels: 2,
            start_lead_ms: 50,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stepseq").join("config.toml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read a config file. A missing file gives the defaults; an unreadable
    /// or malformed one is reported and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), "failed to read config: {e}");
                return Self::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), "ignoring malformed config: {e}");
            Self::default()
        })
    }

    pub fn start_lead(&self) -> Duration {
        Duration::from_millis(self.start_lead_ms)
    }
}
