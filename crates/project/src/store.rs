use crate::{Project, ProjectError, load_project, save_project};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSION: &str = "json";

/// A directory of named project files, one `<name>.json` per project.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds project `name`. Names must be a single plain path
    /// component.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, ProjectError> {
        let valid = !name.trim().is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(ProjectError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.{EXTENSION}")))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|path| path.is_file())
    }

    /// Write `project` under its own name, creating the store directory if
    /// needed. Returns the written path.
    pub fn save(&self, project: &Project) -> Result<PathBuf, ProjectError> {
        let path = self.path_for(&project.name)?;
        fs::create_dir_all(&self.root)?;
        save_project(&path, project)?;
        info!(name = %project.name, path = %path.display(), "project saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Project, ProjectError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ProjectError::NotFound(name.to_string()));
        }
        load_project(&path)
    }

    /// Names of all stored projects, sorted. A missing directory lists as
    /// empty.
    pub fn list(&self) -> Result<Vec<String>, ProjectError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
