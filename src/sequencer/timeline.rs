// Timeline - Musical time representation
// Converts tempo, time signature and reference note value into seconds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Denominators accepted for a time signature
pub const VALID_DENOMINATORS: [u8; 5] = [1, 2, 4, 8, 16];

/// Highest numerator the editors accept
pub const MAX_NUMERATOR: u8 = 20;

/// Rejected denominator value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid time signature denominator {0} (expected 1, 2, 4, 8 or 16)")]
pub struct InvalidDenominator(pub u8);

/// Bottom half of a time signature, restricted to 1, 2, 4, 8 or 16
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Denominator(u8);

impl Denominator {
    pub const WHOLE: Self = Self(1);
    pub const HALF: Self = Self(2);
    pub const QUARTER: Self = Self(4);
    pub const EIGHTH: Self = Self(8);
    pub const SIXTEENTH: Self = Self(16);

    pub fn new(value: u8) -> Result<Self, InvalidDenominator> {
        if VALID_DENOMINATORS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidDenominator(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Beat length relative to a quarter note (4/4 = 1.0, 6/8 = 0.5)
    pub fn quarter_multiplier(self) -> f64 {
        4.0 / self.0 as f64
    }
}

impl Default for Denominator {
    fn default() -> Self {
        Self::QUARTER
    }
}

impl TryFrom<u8> for Denominator {
    type Error = InvalidDenominator;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Denominator> for u8 {
    fn from(denominator: Denominator) -> Self {
        denominator.0
    }
}

impl fmt::Display for Denominator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference pulse the tempo is counted in
///
/// Training sections only use `Quarter` and `Eighth`; the live engine also
/// accepts `DottedEighth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteValue {
    #[default]
    Quarter,
    Eighth,
    DottedEighth,
}

impl NoteValue {
    /// Length of the reference pulse, in quarter notes
    pub fn quarter_factor(self) -> f64 {
        match self {
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::DottedEighth => 0.75,
        }
    }

    /// Reference note counted in whole-note divisions (4, 8, or 12 for the
    /// dotted eighth)
    pub fn note_base(self) -> f64 {
        match self {
            NoteValue::Quarter => 4.0,
            NoteValue::Eighth => 8.0,
            NoteValue::DottedEighth => 12.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::DottedEighth => "dotted-eighth",
        }
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seconds between two live clicks.
///
/// `60 / bpm` is the length of one reference pulse counted as a quarter note;
/// the denominator rescales it to the written beat and the note value scales
/// the reference pulse itself (an eighth pulse is half a quarter).
///
/// `bpm` must be positive. The function does not clamp it.
pub fn seconds_per_beat(bpm: f64, denominator: Denominator, note_value: NoteValue) -> f64 {
    (60.0 / bpm) * denominator.quarter_multiplier() * note_value.quarter_factor()
}

/// Seconds taken by one beat of a training section.
///
/// `(60 / bpm) * note_base / denominator`: the reference note is counted in
/// whole-note divisions, so an eighth reference at 4/4 gives a beat twice as
/// long as a quarter reference. Saved training files rely on this scale.
pub fn training_seconds_per_beat(
    bpm: f64,
    denominator: Denominator,
    note_value: NoteValue,
) -> f64 {
    (60.0 / bpm) * note_value.note_base() / denominator.value() as f64
}

/// Seconds between two subdivisions of an `n`-beat training figure split into
/// `m` parts
pub fn subdivision_seconds(
    bpm: f64,
    denominator: Denominator,
    note_value: NoteValue,
    n: u8,
    m: u8,
) -> f64 {
    training_seconds_per_beat(bpm, denominator, note_value) * n as f64 / m.max(1) as f64
}

/// Time signature (numerator/denominator)
/// Example: 7/8 = TimeSignature { numerator: 7, denominator: Denominator::EIGHTH }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: Denominator,
}

impl TimeSignature {
    /// Returns `None` when the numerator is outside 1..=20
    pub fn new(numerator: u8, denominator: Denominator) -> Option<Self> {
        (1..=MAX_NUMERATOR).contains(&numerator).then_some(Self {
            numerator,
            denominator,
        })
    }

    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: Denominator::QUARTER,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_per_beat_reference_values() {
        assert_eq!(
            seconds_per_beat(120.0, Denominator::QUARTER, NoteValue::Quarter),
            0.5
        );
        assert_eq!(
            seconds_per_beat(60.0, Denominator::QUARTER, NoteValue::Eighth),
            0.5
        );
        // Eighth-note meter at a quarter-note pulse: half the quarter value
        assert_eq!(
            seconds_per_beat(120.0, Denominator::EIGHTH, NoteValue::Quarter),
            0.25
        );
        assert!(
            (seconds_per_beat(60.0, Denominator::QUARTER, NoteValue::DottedEighth) - 0.75).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_seconds_per_beat_decreases_with_bpm() {
        for denominator in VALID_DENOMINATORS {
            let denominator = Denominator::new(denominator).unwrap();
            for note_value in [NoteValue::Quarter, NoteValue::Eighth, NoteValue::DottedEighth] {
                let mut previous = f64::INFINITY;
                for bpm in (30..=300).step_by(7) {
                    let current = seconds_per_beat(bpm as f64, denominator, note_value);
                    assert!(current < previous);
                    previous = current;
                }
            }
        }
    }

    #[test]
    fn test_training_seconds_per_beat() {
        assert_eq!(
            training_seconds_per_beat(120.0, Denominator::QUARTER, NoteValue::Quarter),
            0.5
        );
        // eighth reference counts 8 per whole note: 60/60 * 8/4
        assert_eq!(
            training_seconds_per_beat(60.0, Denominator::QUARTER, NoteValue::Eighth),
            2.0
        );
        assert_eq!(
            training_seconds_per_beat(120.0, Denominator::EIGHTH, NoteValue::Eighth),
            0.5
        );
        assert_eq!(
            training_seconds_per_beat(120.0, Denominator::EIGHTH, NoteValue::Quarter),
            0.25
        );
        // the live pulse is unaffected
        assert_eq!(
            seconds_per_beat(60.0, Denominator::QUARTER, NoteValue::Eighth),
            0.5
        );
    }

    #[test]
    fn test_subdivision_seconds() {
        // Four beats split in four at 120 bpm: one subdivision per beat
        let interval = subdivision_seconds(120.0, Denominator::QUARTER, NoteValue::Quarter, 4, 4);
        assert_eq!(interval, 0.5);

        // One beat split in three
        let triplet = subdivision_seconds(60.0, Denominator::QUARTER, NoteValue::Quarter, 1, 3);
        assert!((triplet - 1.0 / 3.0).abs() < 1e-12);

        // eighth-referenced training section
        let eighths = subdivision_seconds(60.0, Denominator::QUARTER, NoteValue::Eighth, 1, 2);
        assert_eq!(eighths, 1.0);
    }

    #[test]
    fn test_denominator_validation() {
        assert!(Denominator::new(4).is_ok());
        assert!(Denominator::new(16).is_ok());
        assert_eq!(Denominator::new(3), Err(InvalidDenominator(3)));
        assert_eq!(Denominator::new(0), Err(InvalidDenominator(0)));
    }

    #[test]
    fn test_denominator_serde() {
        let json = serde_json::to_string(&Denominator::EIGHTH).unwrap();
        assert_eq!(json, "8");
        let parsed: Denominator = serde_json::from_str("16").unwrap();
        assert_eq!(parsed, Denominator::SIXTEENTH);
        assert!(serde_json::from_str::<Denominator>("6").is_err());
    }

    #[test]
    fn test_note_value_serde_names() {
        assert_eq!(
            serde_json::to_string(&NoteValue::DottedEighth).unwrap(),
            "\"dotted-eighth\""
        );
        let parsed: NoteValue = serde_json::from_str("\"eighth\"").unwrap();
        assert_eq!(parsed, NoteValue::Eighth);
    }

    #[test]
    fn test_time_signature() {
        let ts = TimeSignature::four_four();
        assert_eq!(ts.to_string(), "4/4");

        assert!(TimeSignature::new(0, Denominator::QUARTER).is_none());
        assert!(TimeSignature::new(21, Denominator::QUARTER).is_none());
        assert_eq!(
            TimeSignature::new(7, Denominator::EIGHTH).unwrap().to_string(),
            "7/8"
        );
    }
}
