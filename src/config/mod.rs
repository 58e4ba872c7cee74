//! Configuration for the sound driver

mod source_config;

pub use crate::backend::ReverbParams;
pub use source_config::SourceConfig;

use crate::math::Pose;

/// Configuration descriptor for a [`crate::SoundDriver`]
#[derive(Debug, Clone)]
pub struct SoundDriverDesc {
    /// Initial listener pose
    pub listener: Pose,
    /// Reverb unit settings pushed to the backend at construction (None leaves the backend's own)
    pub reverb: Option<ReverbParams>,
    /// Whether [`crate::DriverEvent`]s are buffered for [`crate::SoundDriver::poll_events`]
    pub record_events: bool,
}

impl Default for SoundDriverDesc {
    fn default() -> Self {
        Self {
            listener: Pose::identity(),
            reverb: None,
            record_events: true,
        }
    }
}

impl SoundDriverDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(mut self, pose: Pose) -> Self {
        self.listener = pose;
        self
    }

    pub fn reverb(mut self, params: ReverbParams) -> Self {
        self.reverb = Some(params);
        self
    }

    pub fn record_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }
}
