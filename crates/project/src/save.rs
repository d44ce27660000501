use crate::{Project, ProjectError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn save_project(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, project)?;
    writer.flush()?;

    Ok(())
}
