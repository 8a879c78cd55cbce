// Training snapshot - the full exchange format of a training configuration

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manager::ProjectError;
use crate::sequencer::accent::TrainingAccent;
use crate::training::beat_map::{BeatMap, sanitize_file_stem};
use crate::training::section::{Part, Section};
use crate::training::session::TrainingSession;
use crate::training::tempo_program::{LoopMode, TempoChangeProgram};

/// Every field of a training configuration, keyed the way exported files are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSnapshot {
    pub sections: Vec<Section>,
    pub parts: Vec<Part>,
    #[serde(default)]
    pub rhythm_name: String,
    /// UI state, kept verbatim
    #[serde(default)]
    pub tempo_setting: Value,
    /// UI state, kept verbatim
    #[serde(default)]
    pub accent_type: Value,
    #[serde(default)]
    pub accent_list: Vec<TrainingAccent>,
    pub loop_mode: LoopMode,
    pub tempo_step: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    pub loop_change_count: u32,
    pub loop_repeat_limit: u32,
    #[serde(default)]
    pub count_in: bool,
}

impl TrainingSnapshot {
    pub fn from_session(session: &TrainingSession) -> Self {
        let map = session.map();
        let program = session.program();
        Self {
            sections: map.sections().to_vec(),
            parts: map.parts().to_vec(),
            rhythm_name: session.rhythm_name().to_string(),
            tempo_setting: session.tempo_setting().clone(),
            accent_type: session.accent_type().clone(),
            accent_list: map.accents().to_vec(),
            loop_mode: program.mode,
            tempo_step: program.tempo_step,
            min_tempo: program.min_tempo,
            max_tempo: program.max_tempo,
            loop_change_count: program.loop_change_count,
            loop_repeat_limit: program.loop_repeat_limit,
            count_in: program.count_in,
        }
    }

    pub fn program(&self) -> TempoChangeProgram {
        TempoChangeProgram {
            mode: self.loop_mode,
            tempo_step: self.tempo_step,
            min_tempo: self.min_tempo,
            max_tempo: self.max_tempo,
            loop_change_count: self.loop_change_count,
            loop_repeat_limit: self.loop_repeat_limit,
            count_in: self.count_in,
        }
    }

    /// Validate and build a session. Figures are normalized and the accent
    /// list is fitted to the beat count.
    pub fn into_session(self) -> Result<TrainingSession, ProjectError> {
        validate_sections(&self.sections)?;
        let program = self.program();
        let map = BeatMap::from_parts(self.sections, self.parts, self.accent_list)
            .map_err(|e| ProjectError::InvalidStructure(e.to_string()))?;
        Ok(TrainingSession::from_parts(
            map,
            program,
            self.rhythm_name,
            self.tempo_setting,
            self.accent_type,
        ))
    }

    /// `<rhythm name>_<YYYYMMDD>.json`
    pub fn suggested_filename(&self, date: NaiveDate) -> String {
        format!(
            "{}_{}.json",
            sanitize_file_stem(&self.rhythm_name),
            date.format("%Y%m%d")
        )
    }
}

/// Section fields a file may get wrong without failing to parse
pub fn validate_sections(sections: &[Section]) -> Result<(), ProjectError> {
    for (index, section) in sections.iter().enumerate() {
        if section.numerator == 0 || section.numerator > crate::sequencer::timeline::MAX_NUMERATOR {
            return Err(ProjectError::InvalidStructure(format!(
                "Section {} numerator must be between 1 and 20",
                index + 1
            )));
        }
        if section.bpm == 0 {
            return Err(ProjectError::InvalidStructure(format!(
                "Section {} tempo must be at least 1 BPM",
                index + 1
            )));
        }
        if section.loop_count == 0 {
            return Err(ProjectError::InvalidStructure(format!(
                "Section {} loop count must be at least 1",
                index + 1
            )));
        }
    }
    Ok(())
}
