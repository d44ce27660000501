use crate::{Project, ProjectError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read a project file. JSON is tried first, then MessagePack.
pub fn load_project(path: &Path) -> Result<Project, ProjectError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).or_else(|json_err| {
        debug!(path = %path.display(), error = %json_err, "not JSON, trying MessagePack");
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        rmp_serde::decode::from_read(reader).map_err(ProjectError::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackData;
    use seq_transport::STEP_COUNT;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn two_track_project() -> Project {
        let mut kick = vec![false; STEP_COUNT];
        kick[0] = true;
        kick[8] = true;
        Project {
            name: "Two Tracks".to_string(),
            bpm: 96.0,
            tracks: vec![
                TrackData {
                    name: "Kick".to_string(),
                    sample: PathBuf::from("kick.wav"),
                    gain_db: -3.0,
                },
                TrackData {
                    name: "Clap".to_string(),
                    sample: PathBuf::from("clap.wav"),
                    gain_db: 0.0,
                },
            ],
            pattern: vec![kick, vec![false; STEP_COUNT]],
        }
    }

    #[test]
    fn test_load_project_file_not_found() {
        let result = load_project(Path::new("/nonexistent/project.json"));
        assert!(matches!(result.unwrap_err(), ProjectError::Io(_)));
    }

    #[test]
    fn test_load_project_invalid_format() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("invalid.json");
        std::fs::write(&path, b"not valid json or msgpack").expect("write");

        let result = load_project(&path);
        assert!(matches!(result.unwrap_err(), ProjectError::Deserialize(_)));
    }

    #[test]
    fn test_load_json_project() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("beat.json");
        let project = two_track_project();

        let file = std::fs::File::create(&path).expect("create");
        serde_json::to_writer(std::io::BufWriter::new(file), &project).expect("encode");

        let loaded = load_project(&path).expect("load");
        assert_eq!(loaded, project);
        assert!(loaded.pattern().expect("pattern").is_set(seq_transport::TrackId(0), 8));
    }

    #[test]
    fn test_load_msgpack_project() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("beat.json");
        let project = two_track_project();

        let bytes = rmp_serde::encode::to_vec(&project).expect("encode");
        std::fs::write(&path, bytes).expect("write");

        assert_eq!(load_project(&path).expect("load"), project);
    }
}
