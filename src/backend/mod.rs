//! Boundary to the hardware scheduling layer and sample store.
//!
//! The driver never mixes audio itself. Every change it makes to a hardware voice is a
//! command stamped with a target time, handed to an [`AudioBackend`] which applies it
//! ahead of the audible present. Two implementations ship with the crate:
//!
//! - [`RecordingBackend`]: deterministic in-memory backend with a manual clock, used by
//!   tests and headless tools
//! - [`ChannelBackend`]: forwards commands over a channel to a mixer thread

mod channel;
mod recording;

pub use channel::{ChannelBackend, MixerLink, channel_backend};
pub use recording::{RecordingBackend, UploadedSample};

use crate::error::Result;

/// Per-voice parameters understood by the hardware scheduler.
///
/// Discriminants match the hardware numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VoiceParam {
    Volume = 0,
    Pitch = 1,
    Detune = 2,
    Pan = 3,
    SampleData = 4,
    SampleRate = 5,
    LoopEnable = 6,
    LoopStart = 7,
    LoopEnd = 8,
    ReverbEnable = 9,
    FadeInLength = 10,
    FadeOutLength = 11,
}

/// Value carried by a scheduled parameter change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
}

/// Raw PCM layout accepted by [`AudioBackend::alloc_sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SampleFormat {
    PcmS8 = 0,
    PcmS16 = 1,
}

/// Parameters of the global reverb unit shared by every voice with reverb enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Values above 1 may be unstable
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
    pub wet: f32,
    pub dry: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            width: 1.0,
            wet: 0.2,
            dry: 0.8,
        }
    }
}

/// A single command issued to the scheduling layer.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceCommand {
    Start {
        slot: usize,
        time: f64,
    },
    Stop {
        slot: usize,
        time: f64,
    },
    SetParam {
        slot: usize,
        param: VoiceParam,
        value: ParamValue,
        time: f64,
    },
    Upload {
        handle: i32,
        format: Option<SampleFormat>,
        block_size: Option<u32>,
        data: Vec<u8>,
    },
    Free {
        handle: i32,
    },
    SetReverb(ReverbParams),
}

impl VoiceCommand {
    /// Hardware slot this command targets, if any.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::Start { slot, .. } | Self::Stop { slot, .. } | Self::SetParam { slot, .. } => {
                Some(*slot)
            }
            _ => None,
        }
    }

    /// Target time of the command, if it is scheduled.
    pub fn time(&self) -> Option<f64> {
        match self {
            Self::Start { time, .. } | Self::Stop { time, .. } | Self::SetParam { time, .. } => {
                Some(*time)
            }
            _ => None,
        }
    }
}

/// Contract of the hardware scheduling layer and sample store.
///
/// All `queue_*` calls are "apply at time t", never "apply now". A time in the past
/// means "as soon as possible".
pub trait AudioBackend {
    /// Current schedule time in seconds.
    fn time(&self) -> f64;

    fn queue_start_voice(&mut self, slot: usize, time: f64);

    fn queue_stop_voice(&mut self, slot: usize, time: f64);

    fn queue_set_param_i(&mut self, slot: usize, param: VoiceParam, value: i32, time: f64);

    fn queue_set_param_f(&mut self, slot: usize, param: VoiceParam, value: f32, time: f64);

    /// Whether the voice in `slot` is audibly playing right now.
    fn voice_state(&self, slot: usize) -> bool;

    /// Uploads raw PCM data and returns its handle.
    fn alloc_sample(&mut self, data: &[u8], format: SampleFormat) -> Result<i32>;

    /// Uploads IMA-ADPCM data made of `block_size` byte blocks and returns its handle.
    fn alloc_compressed(&mut self, data: &[u8], block_size: u32) -> Result<i32>;

    fn free_sample(&mut self, handle: i32);

    /// Total sample memory in use, in bytes.
    fn usage(&self) -> u32;

    fn set_reverb_params(&mut self, params: ReverbParams);
}
