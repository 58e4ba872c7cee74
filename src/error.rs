//! Error types for the sound driver

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoundDriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    #[error("No data chunk found in WAV data")]
    MissingDataChunk,

    #[error("Unsupported input format. format_type: {format_type} bits_per_sample: {bits_per_sample}")]
    UnsupportedFormat {
        format_type: u16,
        bits_per_sample: u16,
    },

    #[error("Sample allocation error: {0}")]
    SampleAllocation(String),

    #[error("Invalid attenuation parameters: {0}")]
    InvalidAttenuation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SoundDriverError>;
