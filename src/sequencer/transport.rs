// Transport - Play state shared by the live engine and the training driver

use std::fmt;

/// Transport state of a playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Looping,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Looping)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Idle => f.write_str("idle"),
            TransportState::Looping => f.write_str("looping"),
        }
    }
}

/// Token identifying one playback run.
///
/// Every timer scheduled by a run carries the run's generation. Bumping the
/// generation on stop or restart turns any late timer into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Advance to a fresh generation, invalidating the previous one
    pub fn bump(&mut self) -> Generation {
        self.0 = self.0.wrapping_add(1);
        *self
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_state() {
        assert!(!TransportState::default().is_playing());
        assert!(TransportState::Looping.is_playing());
        assert_eq!(TransportState::Idle.to_string(), "idle");
    }

    #[test]
    fn test_generation_bump() {
        let mut generation = Generation::default();
        let first = generation.bump();
        let second = generation.bump();
        assert_ne!(first, second);
        assert_eq!(second, generation);
        assert_eq!(second.value(), 2);
    }
}
