// Live rhythm mode - configuration and pure schedule derivation
//
// A live configuration is a click voice (one step per beat of the bar) plus up
// to four rhythm voices, each an n-beat cell split into m equal subdivisions.
// `derive_schedule` turns it into per-voice step tables; installing them on a
// clock is the job of `playback::live::LiveEngine`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::accent::LiveAccent;
use super::instruments::{DEFAULT_SOUND, Hit, live_click};
use super::timeline::{Denominator, MAX_NUMERATOR, NoteValue, TimeSignature, seconds_per_beat};

pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 300.0;
pub const MAX_RHYTHM_VOICES: usize = 4;
pub const MAX_UNIT_BEATS: u8 = 8;
pub const MAX_UNIT_SUBDIVISIONS: u8 = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveError {
    #[error("numerator must be between 1 and 20, got {0}")]
    NumeratorOutOfRange(u8),

    #[error("rhythm unit {n}/{m} is out of range (n 1-8, m 1-32)")]
    UnitOutOfRange { n: u8, m: u8 },

    #[error("at most 4 rhythm voices are supported")]
    TooManyVoices,

    #[error("no rhythm voice at index {0}")]
    VoiceOutOfRange(usize),

    #[error("no beat at index {0}")]
    BeatOutOfRange(usize),

    #[error("expected {expected} accents for the bar, got {found}")]
    AccentCountMismatch { expected: usize, found: usize },

    #[error("tempo must be a finite number")]
    NonFiniteBpm,

    #[error("{0} is not implemented yet")]
    Unimplemented(&'static str),
}

/// Self-contained repeating cell: `m` equal hits over `n` beats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmUnit {
    pub n: u8,
    pub m: u8,
}

impl RhythmUnit {
    pub fn new(n: u8, m: u8) -> Result<Self, LiveError> {
        if (1..=MAX_UNIT_BEATS).contains(&n) && (1..=MAX_UNIT_SUBDIVISIONS).contains(&m) {
            Ok(Self { n, m })
        } else {
            Err(LiveError::UnitOutOfRange { n, m })
        }
    }
}

impl Default for RhythmUnit {
    fn default() -> Self {
        Self { n: 1, m: 1 }
    }
}

/// One limb in live mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVoice {
    pub unit: RhythmUnit,
    pub sound: String,
    #[serde(default)]
    pub muted: bool,
}

impl LiveVoice {
    pub fn new(unit: RhythmUnit) -> Self {
        Self {
            unit,
            sound: DEFAULT_SOUND.to_string(),
            muted: false,
        }
    }
}

impl Default for LiveVoice {
    fn default() -> Self {
        Self::new(RhythmUnit::default())
    }
}

/// Live mode settings. The accent list always has one entry per beat of the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RhythmConfigFile")]
pub struct RhythmConfig {
    bpm: f64,
    time_signature: TimeSignature,
    note_value: NoteValue,
    accents: Vec<LiveAccent>,
    voices: Vec<LiveVoice>,
}

/// Unchecked form of `RhythmConfig` as read from disk
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RhythmConfigFile {
    bpm: f64,
    time_signature: TimeSignature,
    note_value: NoteValue,
    accents: Vec<LiveAccent>,
    #[serde(default)]
    voices: Vec<LiveVoice>,
}

impl TryFrom<RhythmConfigFile> for RhythmConfig {
    type Error = LiveError;

    fn try_from(file: RhythmConfigFile) -> Result<Self, Self::Error> {
        if !file.bpm.is_finite() {
            return Err(LiveError::NonFiniteBpm);
        }
        let numerator = file.time_signature.numerator;
        if !(1..=MAX_NUMERATOR).contains(&numerator) {
            return Err(LiveError::NumeratorOutOfRange(numerator));
        }
        if file.accents.len() != numerator as usize {
            return Err(LiveError::AccentCountMismatch {
                expected: numerator as usize,
                found: file.accents.len(),
            });
        }
        if file.voices.len() > MAX_RHYTHM_VOICES {
            return Err(LiveError::TooManyVoices);
        }
        for voice in &file.voices {
            RhythmUnit::new(voice.unit.n, voice.unit.m)?;
        }
        Ok(Self {
            bpm: file.bpm.clamp(MIN_BPM, MAX_BPM),
            time_signature: file.time_signature,
            note_value: file.note_value,
            accents: file.accents,
            voices: file.voices,
        })
    }
}

impl RhythmConfig {
    pub fn new(bpm: f64, time_signature: TimeSignature, note_value: NoteValue) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            time_signature,
            note_value,
            accents: LiveAccent::default_pattern(time_signature.numerator as usize),
            voices: Vec::new(),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn note_value(&self) -> NoteValue {
        self.note_value
    }

    pub fn accents(&self) -> &[LiveAccent] {
        &self.accents
    }

    pub fn voices(&self) -> &[LiveVoice] {
        &self.voices
    }

    /// Clamped to 30-300 bpm
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Resizes the accent list: new beats are `normal`, removed beats are dropped
    pub fn set_numerator(&mut self, numerator: u8) -> Result<(), LiveError> {
        if !(1..=MAX_NUMERATOR).contains(&numerator) {
            return Err(LiveError::NumeratorOutOfRange(numerator));
        }
        self.time_signature.numerator = numerator;
        if self.accents.is_empty() {
            self.accents = LiveAccent::default_pattern(numerator as usize);
        } else {
            self.accents.resize(numerator as usize, LiveAccent::Normal);
        }
        Ok(())
    }

    pub fn set_denominator(&mut self, denominator: Denominator) {
        self.time_signature.denominator = denominator;
    }

    pub fn set_note_value(&mut self, note_value: NoteValue) {
        self.note_value = note_value;
    }

    pub fn set_accent(&mut self, beat: usize, accent: LiveAccent) -> Result<(), LiveError> {
        let slot = self
            .accents
            .get_mut(beat)
            .ok_or(LiveError::BeatOutOfRange(beat))?;
        *slot = accent;
        Ok(())
    }

    /// Cycle one beat's accent, returning the new level
    pub fn toggle_accent(&mut self, beat: usize) -> Result<LiveAccent, LiveError> {
        let slot = self
            .accents
            .get_mut(beat)
            .ok_or(LiveError::BeatOutOfRange(beat))?;
        *slot = slot.next();
        Ok(*slot)
    }

    pub fn add_voice(&mut self, voice: LiveVoice) -> Result<usize, LiveError> {
        if self.voices.len() >= MAX_RHYTHM_VOICES {
            return Err(LiveError::TooManyVoices);
        }
        RhythmUnit::new(voice.unit.n, voice.unit.m)?;
        self.voices.push(voice);
        Ok(self.voices.len() - 1)
    }

    pub fn remove_voice(&mut self, index: usize) -> Result<LiveVoice, LiveError> {
        if index >= self.voices.len() {
            return Err(LiveError::VoiceOutOfRange(index));
        }
        Ok(self.voices.remove(index))
    }

    pub fn set_unit(&mut self, index: usize, unit: RhythmUnit) -> Result<(), LiveError> {
        RhythmUnit::new(unit.n, unit.m)?;
        self.voice_mut(index)?.unit = unit;
        Ok(())
    }

    pub fn set_muted(&mut self, index: usize, muted: bool) -> Result<(), LiveError> {
        self.voice_mut(index)?.muted = muted;
        Ok(())
    }

    pub fn set_sound(&mut self, index: usize, sound: impl Into<String>) -> Result<(), LiveError> {
        self.voice_mut(index)?.sound = sound.into();
        Ok(())
    }

    fn voice_mut(&mut self, index: usize) -> Result<&mut LiveVoice, LiveError> {
        self.voices
            .get_mut(index)
            .ok_or(LiveError::VoiceOutOfRange(index))
    }
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self::new(120.0, TimeSignature::four_four(), NoteValue::Quarter)
    }
}

/// Identifies one independently scheduled stream of sound events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoiceId {
    /// Metronome click stream
    Click,
    /// Rhythm voice (limb / part), zero-based
    Rhythm(usize),
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceId::Click => f.write_str("click"),
            VoiceId::Rhythm(index) => write!(f, "part{}", index + 1),
        }
    }
}

/// Step table of one voice: a hit (or silence) per step, `interval` seconds apart
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSchedule {
    pub voice: VoiceId,
    pub interval: f64,
    pub steps: Vec<Option<Hit>>,
}

impl VoiceSchedule {
    /// Length of one full cycle in seconds
    pub fn cycle_seconds(&self) -> f64 {
        self.interval * self.steps.len() as f64
    }
}

/// Everything the live engine needs to install on the clock
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveSchedule {
    pub voices: Vec<VoiceSchedule>,
}

impl LiveSchedule {
    pub fn voice(&self, id: VoiceId) -> Option<&VoiceSchedule> {
        self.voices.iter().find(|v| v.voice == id)
    }

    /// Voices whose step table differs between `self` and `next`, including
    /// voices that appear in only one of them
    pub fn changed_voices(&self, next: &LiveSchedule) -> Vec<VoiceId> {
        let mut changed: Vec<VoiceId> = Vec::new();
        for schedule in &self.voices {
            if next.voice(schedule.voice) != Some(schedule) {
                changed.push(schedule.voice);
            }
        }
        for schedule in &next.voices {
            if self.voice(schedule.voice).is_none() {
                changed.push(schedule.voice);
            }
        }
        changed.sort();
        changed
    }
}

/// Derive the step tables for a configuration. Pure: no clock involved.
///
/// The click voice fires once per beat. Rhythm voice `k` fires every
/// `seconds_per_beat * n / m`, cycling through its `m` subdivisions on its own
/// period; muted voices keep cycling without sound.
pub fn derive_schedule(config: &RhythmConfig) -> LiveSchedule {
    let beat = seconds_per_beat(
        config.bpm,
        config.time_signature.denominator,
        config.note_value,
    );

    let mut voices = Vec::with_capacity(config.voices.len() + 1);
    voices.push(VoiceSchedule {
        voice: VoiceId::Click,
        interval: beat,
        steps: config.accents.iter().map(|a| live_click(*a)).collect(),
    });

    for (index, voice) in config.voices.iter().enumerate() {
        let RhythmUnit { n, m } = voice.unit;
        let hit = (!voice.muted).then(|| Hit::new(voice.sound.as_str(), 1.0));
        voices.push(VoiceSchedule {
            voice: VoiceId::Rhythm(index),
            interval: beat * n as f64 / m as f64,
            steps: vec![hit; m as usize],
        });
    }

    LiveSchedule { voices }
}
