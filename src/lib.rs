//! Virtual voice management for a 32-voice sound chip.
//!
//! Any number of [`emitter`]s can be playing at once. [`SoundDriver::update`] maps them
//! onto the hardware voices by priority, steals voices from less important sounds when
//! needed, and keeps the gain and pan of positioned emitters in step with the listener.
//! The hardware itself sits behind the [`AudioBackend`] trait.

pub mod audio_data;
pub mod backend;
pub mod config;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod events;
pub mod math;
pub mod playback;
pub mod spatial;
pub mod voice;

pub use audio_data::Sample;
pub use backend::{
    AudioBackend, ChannelBackend, MixerLink, ParamValue, RecordingBackend, ReverbParams,
    SampleFormat, VoiceCommand, VoiceParam, channel_backend,
};
pub use config::{SoundDriverDesc, SourceConfig};
pub use driver::SoundDriver;
pub use emitter::{Emitter, EmitterId};
pub use error::{Result, SoundDriverError};
pub use events::DriverEvent;
pub use math::{Pose, Quat, Vec3};
pub use playback::PlaybackDesc;
pub use spatial::{Attenuation, AttenuationModel};
pub use voice::{HW_VOICE_COUNT, HardwareVoice};
