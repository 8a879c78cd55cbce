// Training data model: sections (measures), beat slots and parts

use serde::{Deserialize, Serialize};

use crate::sequencer::instruments::DEFAULT_SOUND;
use crate::sequencer::timeline::{Denominator, NoteValue};

pub const DEFAULT_BPM: u32 = 120;

/// Most parts a training configuration may hold
pub const MAX_PARTS: usize = 4;

/// Section setting a tied figure must keep constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseField {
    Tempo,
    NoteValue,
    Denominator,
}

/// One measure-equivalent block of the training program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub numerator: u8,
    pub denominator: Denominator,
    pub note_value: NoteValue,
    pub bpm: u32,
    pub loop_count: u32,
}

impl Section {
    pub fn new(numerator: u8, denominator: Denominator, note_value: NoteValue, bpm: u32) -> Self {
        Self {
            name: None,
            description: String::new(),
            numerator,
            denominator,
            note_value,
            bpm,
            loop_count: 1,
        }
    }

    /// First pulse setting that differs from `other`, if any. A figure may
    /// only run across sections with the same pulse.
    pub fn pulse_difference(&self, other: &Section) -> Option<PulseField> {
        if self.bpm != other.bpm {
            Some(PulseField::Tempo)
        } else if self.note_value != other.note_value {
            Some(PulseField::NoteValue)
        } else if self.denominator != other.denominator {
            Some(PulseField::Denominator)
        } else {
            None
        }
    }

    /// Name used in file names and messages
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "none",
        }
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new(4, Denominator::QUARTER, NoteValue::Quarter, DEFAULT_BPM)
    }
}

/// One beat slot of one part.
///
/// A figure occupies `n` consecutive slots: the first has `is_start = true`
/// and carries `n`, `m`, `sound` and one volume per subdivision; the `n - 1`
/// following slots are continuations (`is_start = false`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beat {
    pub is_start: bool,
    pub n: u8,
    pub m: u8,
    pub sound: String,
    pub volumes: Vec<f32>,
}

impl Beat {
    /// Silent one-beat kick, the content of a fresh slot
    pub fn placeholder() -> Self {
        Self {
            is_start: true,
            n: 1,
            m: 1,
            sound: DEFAULT_SOUND.to_string(),
            volumes: vec![0.0],
        }
    }

    pub fn continuation() -> Self {
        Self {
            is_start: false,
            ..Self::placeholder()
        }
    }

    /// Start slot of an `n`-beat, `m`-subdivision figure.
    /// Volumes are padded with 1.0 (or truncated) to `m` entries.
    pub fn figure(n: u8, m: u8, sound: impl Into<String>, mut volumes: Vec<f32>) -> Self {
        volumes.resize(m as usize, 1.0);
        Self {
            is_start: true,
            n,
            m,
            sound: sound.into(),
            volumes,
        }
    }

    /// Number of slots the figure starting here covers (1 for continuations)
    pub fn span(&self) -> usize {
        if self.is_start { self.n.max(1) as usize } else { 1 }
    }

    /// Volume of subdivision `index`, 1.0 when the list is short
    pub fn volume_at(&self, index: usize) -> f32 {
        self.volumes.get(index).copied().unwrap_or(1.0)
    }
}

impl Default for Beat {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// One limb: a label and one beat slot per global beat index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub label: String,
    pub beats: Vec<Beat>,
}

impl Part {
    pub fn new(label: impl Into<String>, total_beats: usize) -> Self {
        Self {
            label: label.into(),
            beats: vec![Beat::placeholder(); total_beats],
        }
    }
}
