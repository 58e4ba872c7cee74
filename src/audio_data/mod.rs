//! Sample handles and WAV loading

mod wav_loader;

pub use wav_loader::{load_wav, load_wav_bytes, load_wav_file};

/// A sample uploaded to the backend's sample store.
///
/// Only the handle and playback rate are kept here; the data itself belongs to the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sample {
    pub handle: i32,
    pub sample_rate: u32,
}

impl Sample {
    /// Returned by the loaders when input is rejected.
    pub const INVALID: Sample = Sample {
        handle: -1,
        sample_rate: 0,
    };

    pub fn new(handle: i32, sample_rate: u32) -> Self {
        Self {
            handle,
            sample_rate,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.handle >= 0
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::INVALID
    }
}
