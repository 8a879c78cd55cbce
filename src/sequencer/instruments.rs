// Instrument selection for click and rhythm voices

use super::accent::{LiveAccent, TrainingAccent};

/// Sample names known to the bundled sound set
pub const INSTRUMENTS: [&str; 25] = [
    "kick",
    "kick_sub",
    "snare",
    "snare_ghost",
    "snare_rim",
    "tom_high1",
    "tom_high2",
    "tom_mid1",
    "tom_mid2",
    "tom_low1",
    "tom_low2",
    "hihat_closed",
    "hihat_open",
    "hihat_pedal",
    "crash1",
    "crash2",
    "ride_bell",
    "ride_crash",
    "ride_tip",
    "china",
    "splash",
    "bell",
    "click",
    "click_high",
    "click_low",
];

/// Default sound of an unassigned beat slot
pub const DEFAULT_SOUND: &str = "kick";

pub fn is_known_instrument(name: &str) -> bool {
    INSTRUMENTS.contains(&name)
}

/// One sample trigger request: which sample and how loud
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub instrument: String,
    pub gain: f32,
}

impl Hit {
    pub fn new(instrument: impl Into<String>, gain: f32) -> Self {
        Self {
            instrument: instrument.into(),
            gain,
        }
    }

    /// Silent hits are reported to the visualization but never triggered
    pub fn is_audible(&self) -> bool {
        self.gain > 0.0
    }
}

/// Click sample for a training-mode accent
pub fn training_click(accent: TrainingAccent) -> Hit {
    match accent {
        TrainingAccent::Bell => Hit::new("bell", 1.0),
        TrainingAccent::Strong => Hit::new("click_high", 1.0),
        TrainingAccent::Normal => Hit::new("click", 1.0),
        TrainingAccent::Weak => Hit::new("click", 0.5),
        TrainingAccent::None => Hit::new("click", 0.0),
    }
}

/// Click sample for a live-mode accent. `None` stays silent.
pub fn live_click(accent: LiveAccent) -> Option<Hit> {
    match accent {
        LiveAccent::Accent => Some(Hit::new("click_high", 1.0)),
        LiveAccent::Normal => Some(Hit::new("click", 1.0)),
        LiveAccent::Ghost => Some(Hit::new("click_low", 1.0)),
        LiveAccent::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_click_mapping() {
        assert_eq!(training_click(TrainingAccent::Bell), Hit::new("bell", 1.0));
        assert_eq!(
            training_click(TrainingAccent::Strong),
            Hit::new("click_high", 1.0)
        );
        assert_eq!(training_click(TrainingAccent::Weak).gain, 0.5);
        assert!(!training_click(TrainingAccent::None).is_audible());
    }

    #[test]
    fn test_live_click_mapping() {
        assert_eq!(
            live_click(LiveAccent::Ghost).map(|hit| hit.instrument),
            Some("click_low".to_string())
        );
        assert!(live_click(LiveAccent::None).is_none());
    }

    #[test]
    fn test_every_mapped_sample_is_known() {
        for accent in [
            TrainingAccent::Strong,
            TrainingAccent::Normal,
            TrainingAccent::Weak,
            TrainingAccent::None,
            TrainingAccent::Bell,
        ] {
            assert!(is_known_instrument(&training_click(accent).instrument));
        }
        assert!(is_known_instrument(DEFAULT_SOUND));
        assert!(!is_known_instrument("cowbell"));
    }
}
