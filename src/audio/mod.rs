// Module audio - Gestion du backend CPAL et callback temps-réel

pub mod engine;
pub mod mixer;
pub mod player;
pub mod samples;
pub mod stream_clock;
pub mod timing;

pub use engine::AudioEngine;
pub use mixer::Mixer;
pub use player::EnginePlayer;
pub use samples::{SampleBank, SampleBuffer, load_wav};
pub use stream_clock::{LOOKAHEAD, StreamClock};
pub use timing::AudioTiming;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0:?}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Sample file error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Sample {0} contains no audio")]
    EmptySample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
