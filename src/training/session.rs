// Training session - editable training state guarded against edits during playback

use serde_json::Value;

use super::beat_map::{BeatMap, BeatMapError, SectionSnapshot};
use super::compiler::{CompileError, CompiledProgram, compile};
use super::section::{Beat, Section};
use super::tempo_program::TempoChangeProgram;
use crate::sequencer::accent::TrainingAccent;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("stop playback before editing the training program")]
    PlaybackActive,

    #[error(transparent)]
    BeatMap(#[from] BeatMapError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Owner of the training configuration.
///
/// `tempo_setting` and `accent_type` are UI state carried through snapshots
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSession {
    map: BeatMap,
    program: TempoChangeProgram,
    rhythm_name: String,
    tempo_setting: Value,
    accent_type: Value,
    playing: bool,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingSession {
    /// One 4/4 section with one empty part
    pub fn new() -> Self {
        let mut map = BeatMap::new();
        map.add_section();
        // a fresh map has no parts, so this cannot hit the part limit
        let _ = map.add_part("Part 1");
        Self::from_parts(map, TempoChangeProgram::default(), String::new(), Value::Null, Value::Null)
    }

    pub fn from_parts(
        map: BeatMap,
        program: TempoChangeProgram,
        rhythm_name: String,
        tempo_setting: Value,
        accent_type: Value,
    ) -> Self {
        Self {
            map,
            program,
            rhythm_name,
            tempo_setting,
            accent_type,
            playing: false,
        }
    }

    pub fn map(&self) -> &BeatMap {
        &self.map
    }

    pub fn program(&self) -> &TempoChangeProgram {
        &self.program
    }

    pub fn rhythm_name(&self) -> &str {
        &self.rhythm_name
    }

    pub fn tempo_setting(&self) -> &Value {
        &self.tempo_setting
    }

    pub fn accent_type(&self) -> &Value {
        &self.accent_type
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Mirrors the driver's run state
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Run a structural edit on the beat map, refused while playing
    pub fn edit<F, R>(&mut self, edit: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut BeatMap) -> Result<R, BeatMapError>,
    {
        if self.playing {
            log::warn!("edit refused: playback is running");
            return Err(SessionError::PlaybackActive);
        }
        edit(&mut self.map).map_err(|e| {
            log::warn!("edit rejected: {e}");
            SessionError::BeatMap(e)
        })
    }

    pub fn add_section(&mut self) -> Result<usize, SessionError> {
        self.edit(|map| Ok(map.add_section()))
    }

    pub fn update_section_numerator(&mut self, index: usize, numerator: u8) -> Result<(), SessionError> {
        self.edit(|map| map.update_section_numerator(index, numerator))
    }

    pub fn duplicate_section(&mut self, index: usize) -> Result<usize, SessionError> {
        self.edit(|map| map.duplicate_section(index))
    }

    pub fn remove_section(&mut self, index: usize) -> Result<Section, SessionError> {
        self.edit(|map| map.remove_section(index))
    }

    pub fn save_beat(
        &mut self,
        section: usize,
        beat: usize,
        part: usize,
        figure: Beat,
    ) -> Result<(), SessionError> {
        self.edit(|map| map.save_beat(section, beat, part, figure))
    }

    pub fn toggle_accent(&mut self, global: usize) -> Result<TrainingAccent, SessionError> {
        self.edit(|map| map.toggle_accent(global))
    }

    pub fn import_section(&mut self, index: usize, data: SectionSnapshot) -> Result<(), SessionError> {
        self.edit(|map| map.import_section(index, data))
    }

    /// Exporting reads only, so it is allowed during playback
    pub fn export_section(&self, index: usize) -> Result<SectionSnapshot, SessionError> {
        Ok(self.map.export_section(index)?)
    }

    pub fn set_program(&mut self, program: TempoChangeProgram) -> Result<(), SessionError> {
        if self.playing {
            return Err(SessionError::PlaybackActive);
        }
        self.program = program;
        Ok(())
    }

    pub fn set_rhythm_name(&mut self, name: impl Into<String>) {
        self.rhythm_name = name.into();
    }

    /// Replace the whole state, as after loading a snapshot
    pub fn replace(&mut self, other: TrainingSession) -> Result<(), SessionError> {
        if self.playing {
            return Err(SessionError::PlaybackActive);
        }
        *self = other;
        Ok(())
    }

    pub fn compile(&self) -> Result<CompiledProgram, SessionError> {
        Ok(compile(&self.map, &self.program)?)
    }
}
