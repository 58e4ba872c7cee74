//! Event types for the sound driver

use crate::emitter::EmitterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// An emitter took over a hardware voice
    EmitterAssigned { emitter: EmitterId, slot: usize },
    /// An emitter found its hardware voice claimed by someone else
    VoiceStolen { emitter: EmitterId, slot: usize },
    /// A non-looping emitter finished and left the registry
    EmitterRetired { emitter: EmitterId },
    /// A one-shot found no voice and was not played
    OneShotDropped { priority: u8 },
}

impl DriverEvent {
    pub fn emitter(&self) -> Option<EmitterId> {
        match self {
            Self::EmitterAssigned { emitter, .. }
            | Self::VoiceStolen { emitter, .. }
            | Self::EmitterRetired { emitter } => Some(*emitter),
            Self::OneShotDropped { .. } => None,
        }
    }

    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::EmitterAssigned { slot, .. } | Self::VoiceStolen { slot, .. } => Some(*slot),
            _ => None,
        }
    }
}
