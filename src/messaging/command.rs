// Commandes - control thread → audio thread

/// Message consumed by the audio callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCommand {
    /// Start sample `sample` of the bank at absolute frame `at_frame`.
    /// `epoch` is the silence epoch the trigger was sent under.
    Trigger {
        sample: usize,
        gain: f32,
        at_frame: u64,
        epoch: u64,
    },
    /// Drop every sounding voice and every trigger sent before `epoch`
    Silence { epoch: u64 },
}
