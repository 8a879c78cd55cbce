// Accent levels for the click voice
// Live mode and training mode use different vocabularies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accent of one beat in live (rhythm) mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveAccent {
    Accent,
    #[default]
    Normal,
    Ghost,
    None,
}

impl LiveAccent {
    /// Next level in the toggle cycle: accent -> normal -> ghost -> none -> accent
    pub fn next(self) -> Self {
        match self {
            LiveAccent::Accent => LiveAccent::Normal,
            LiveAccent::Normal => LiveAccent::Ghost,
            LiveAccent::Ghost => LiveAccent::None,
            LiveAccent::None => LiveAccent::Accent,
        }
    }

    /// Default accent pattern for a bar: downbeat accented, the rest normal
    pub fn default_pattern(numerator: usize) -> Vec<Self> {
        (0..numerator)
            .map(|i| {
                if i == 0 {
                    LiveAccent::Accent
                } else {
                    LiveAccent::Normal
                }
            })
            .collect()
    }
}

/// Accent of one beat slot in training mode
///
/// `Bell` only appears on generated count-in steps. Users cannot toggle to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingAccent {
    Strong,
    #[default]
    Normal,
    Weak,
    None,
    Bell,
}

impl TrainingAccent {
    /// Next level in the toggle cycle: strong -> normal -> weak -> none -> strong
    pub fn next(self) -> Self {
        match self {
            TrainingAccent::Strong => TrainingAccent::Normal,
            TrainingAccent::Normal => TrainingAccent::Weak,
            TrainingAccent::Weak => TrainingAccent::None,
            TrainingAccent::None | TrainingAccent::Bell => TrainingAccent::Strong,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrainingAccent::Strong => "strong",
            TrainingAccent::Normal => "normal",
            TrainingAccent::Weak => "weak",
            TrainingAccent::None => "none",
            TrainingAccent::Bell => "bell",
        }
    }
}

impl fmt::Display for TrainingAccent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_accent_cycle() {
        let mut accent = LiveAccent::Accent;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(accent);
            accent = accent.next();
        }
        assert_eq!(accent, LiveAccent::Accent);
        assert_eq!(
            seen,
            vec![
                LiveAccent::Accent,
                LiveAccent::Normal,
                LiveAccent::Ghost,
                LiveAccent::None
            ]
        );
    }

    #[test]
    fn test_training_accent_cycle_skips_bell() {
        let mut accent = TrainingAccent::Strong;
        for _ in 0..16 {
            accent = accent.next();
            assert_ne!(accent, TrainingAccent::Bell);
        }
        assert_eq!(TrainingAccent::Bell.next(), TrainingAccent::Strong);
        assert_eq!(TrainingAccent::None.next(), TrainingAccent::Strong);
    }

    #[test]
    fn test_default_pattern() {
        let pattern = LiveAccent::default_pattern(3);
        assert_eq!(
            pattern,
            vec![LiveAccent::Accent, LiveAccent::Normal, LiveAccent::Normal]
        );
        assert!(LiveAccent::default_pattern(0).is_empty());
    }

    #[test]
    fn test_accent_serde_names() {
        assert_eq!(
            serde_json::to_string(&TrainingAccent::Strong).unwrap(),
            "\"strong\""
        );
        let parsed: Vec<TrainingAccent> =
            serde_json::from_str(r#"["normal","weak","none","bell"]"#).unwrap();
        assert_eq!(parsed[3], TrainingAccent::Bell);
        let live: LiveAccent = serde_json::from_str("\"ghost\"").unwrap();
        assert_eq!(live, LiveAccent::Ghost);
    }
}
