// Preset library - named training snapshots stored as JSON files

use std::fs;
use std::path::{Path, PathBuf};

use super::manager::{ProjectError, load_session, save_snapshot};
use super::snapshot::TrainingSnapshot;
use crate::training::session::TrainingSession;

/// Directory of `<name>.json` training snapshots
pub struct PresetLibrary {
    dir: PathBuf,
}

impl PresetLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/metal_metronome/presets`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("metal_metronome").join("presets"))
    }

    pub fn open_default() -> Result<Self, ProjectError> {
        Self::default_dir()
            .map(Self::new)
            .ok_or(ProjectError::NoDataDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preset names, sorted. A missing directory holds no presets.
    pub fn list(&self) -> Result<Vec<String>, ProjectError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        let file = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };
        self.dir.join(file)
    }

    /// Load a preset exactly like an imported snapshot
    pub fn load(&self, name: &str) -> Result<TrainingSession, ProjectError> {
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(ProjectError::PresetNotFound(name.to_string()));
        }
        load_session(path)
    }

    pub fn save(&self, name: &str, session: &TrainingSession) -> Result<PathBuf, ProjectError> {
        let path = self.path_of(name);
        save_snapshot(&TrainingSnapshot::from_session(session), &path)?;
        Ok(path)
    }
}
