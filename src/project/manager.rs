// Project manager - saving and loading training snapshots and section files

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::snapshot::TrainingSnapshot;
use crate::training::beat_map::SectionSnapshot;
use crate::training::session::{SessionError, TrainingSession};

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("No data directory is available on this system")]
    NoDataDir,

    #[error(transparent)]
    Session(#[from] SessionError),
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), ProjectError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ProjectError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save_snapshot<P: AsRef<Path>>(
    snapshot: &TrainingSnapshot,
    path: P,
) -> Result<(), ProjectError> {
    write_json(snapshot, &path)?;
    info!("Saved training snapshot to {}", path.as_ref().display());
    Ok(())
}

pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<TrainingSnapshot, ProjectError> {
    read_json(path)
}

/// Read and validate a snapshot file into a fresh session
pub fn load_session<P: AsRef<Path>>(path: P) -> Result<TrainingSession, ProjectError> {
    let session = read_snapshot(&path)?.into_session()?;
    info!(
        "Loaded training snapshot {} ({} sections, {} parts)",
        path.as_ref().display(),
        session.map().sections().len(),
        session.map().parts().len()
    );
    Ok(session)
}

pub fn save_section<P: AsRef<Path>>(section: &SectionSnapshot, path: P) -> Result<(), ProjectError> {
    write_json(section, path)
}

pub fn read_section<P: AsRef<Path>>(path: P) -> Result<SectionSnapshot, ProjectError> {
    read_json(path)
}

/// Writes exports under one directory using the suggested file names
pub struct ProjectManager {
    export_dir: PathBuf,
}

impl ProjectManager {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Export the whole session as `<rhythm name>_<YYYYMMDD>.json`
    pub fn export_session(
        &self,
        session: &TrainingSession,
        date: NaiveDate,
    ) -> Result<PathBuf, ProjectError> {
        let snapshot = TrainingSnapshot::from_session(session);
        let path = self.export_dir.join(snapshot.suggested_filename(date));
        save_snapshot(&snapshot, &path)?;
        Ok(path)
    }

    /// Export one section as `<num>_<den>_<bpm>_<name>.json`
    pub fn export_section(
        &self,
        session: &TrainingSession,
        index: usize,
    ) -> Result<PathBuf, ProjectError> {
        let section = session.export_section(index)?;
        let path = self.export_dir.join(section.suggested_filename());
        save_section(&section, &path)?;
        info!("Exported section {} to {}", index + 1, path.display());
        Ok(path)
    }

    /// Replace a section of `session` with the contents of a section file.
    /// The session is untouched when reading or validation fails.
    pub fn import_section<P: AsRef<Path>>(
        &self,
        session: &mut TrainingSession,
        index: usize,
        path: P,
    ) -> Result<(), ProjectError> {
        let section = read_section(&path)?;
        session.import_section(index, section)?;
        info!(
            "Imported {} into section {}",
            path.as_ref().display(),
            index + 1
        );
        Ok(())
    }
}
