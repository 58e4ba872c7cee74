//! Playback descriptions and the parameter batches written to hardware voices.

use crate::audio_data::Sample;
use crate::backend::{AudioBackend, VoiceParam};

/// What to play and how, independent of where the sound sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackDesc {
    /// 0 is most important, 255 least
    pub priority: u8,
    pub sample: Sample,
    pub reverb: bool,
    /// Ignored by one-shots
    pub looping: bool,
    pub volume: f32,
    pub pitch: f32,
}

impl PlaybackDesc {
    /// Full volume, normal pitch, lowest priority, no reverb, no loop.
    pub fn new(sample: Sample) -> Self {
        Self {
            priority: u8::MAX,
            sample,
            reverb: false,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn reverb(mut self, reverb: bool) -> Self {
        self.reverb = reverb;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

/// Full state of a hardware voice at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub sample: Sample,
    pub looping: bool,
    pub reverb: bool,
    /// Post-attenuation volume
    pub gain: f32,
    pub pitch: f32,
    pub pan: f32,
}

impl VoiceParams {
    /// Writes every parameter of `slot` at `time`.
    ///
    /// The scheduler treats commands sharing a timestamp as one state transition, so the
    /// order here is part of the contract and every field is written each time, even the
    /// ones pinned to zero.
    pub fn schedule<B: AudioBackend + ?Sized>(&self, backend: &mut B, slot: usize, time: f64) {
        backend.queue_set_param_i(slot, VoiceParam::SampleData, self.sample.handle, time);
        backend.queue_set_param_i(
            slot,
            VoiceParam::SampleRate,
            self.sample.sample_rate as i32,
            time,
        );
        backend.queue_set_param_i(slot, VoiceParam::LoopEnable, self.looping as i32, time);
        // Loops always span the whole sample.
        backend.queue_set_param_i(slot, VoiceParam::LoopStart, 0, time);
        backend.queue_set_param_i(slot, VoiceParam::LoopEnd, 0, time);
        backend.queue_set_param_i(slot, VoiceParam::ReverbEnable, self.reverb as i32, time);
        backend.queue_set_param_f(slot, VoiceParam::Volume, self.gain, time);
        backend.queue_set_param_f(slot, VoiceParam::Pitch, self.pitch, time);
        backend.queue_set_param_f(slot, VoiceParam::Detune, 0.0, time);
        backend.queue_set_param_f(slot, VoiceParam::Pan, self.pan, time);
        backend.queue_set_param_f(slot, VoiceParam::FadeOutLength, 0.0, time);
    }

    /// Batch written for a one-shot: never loops and leaves the loop points alone.
    pub fn schedule_one_shot<B: AudioBackend + ?Sized>(
        &self,
        backend: &mut B,
        slot: usize,
        time: f64,
    ) {
        backend.queue_set_param_i(slot, VoiceParam::SampleData, self.sample.handle, time);
        backend.queue_set_param_i(
            slot,
            VoiceParam::SampleRate,
            self.sample.sample_rate as i32,
            time,
        );
        backend.queue_set_param_i(slot, VoiceParam::LoopEnable, 0, time);
        backend.queue_set_param_i(slot, VoiceParam::ReverbEnable, self.reverb as i32, time);
        backend.queue_set_param_f(slot, VoiceParam::Volume, self.gain, time);
        backend.queue_set_param_f(slot, VoiceParam::Pitch, self.pitch, time);
        backend.queue_set_param_f(slot, VoiceParam::Detune, 0.0, time);
        backend.queue_set_param_f(slot, VoiceParam::Pan, self.pan, time);
        backend.queue_set_param_f(slot, VoiceParam::FadeOutLength, 0.0, time);
    }
}
