use super::{AudioBackend, ParamValue, ReverbParams, SampleFormat, VoiceCommand, VoiceParam};
use crate::error::{Result, SoundDriverError};
use crate::voice::HW_VOICE_COUNT;
use crossbeam_channel::{Receiver, Sender, TryIter};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const _: () = assert!(HW_VOICE_COUNT <= u32::BITS as usize);

/// State published by the mixer thread and read by the driver thread.
#[derive(Debug, Default)]
struct SharedState {
    /// `f64` bit pattern of the mixer clock
    clock: AtomicU64,
    /// Bit `n` set while voice `n` is audible
    playing: AtomicU32,
}

/// Creates a connected backend / mixer pair.
///
/// The [`ChannelBackend`] goes to the [`crate::SoundDriver`]; the [`MixerLink`] goes to
/// whatever thread owns the actual mixer.
pub fn channel_backend() -> (ChannelBackend, MixerLink) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let shared = Arc::new(SharedState::default());

    let backend = ChannelBackend {
        sender,
        shared: shared.clone(),
        next_handle: 0,
        sample_sizes: HashMap::new(),
    };
    let link = MixerLink { receiver, shared };
    (backend, link)
}

/// Backend that forwards every command to a mixer thread.
pub struct ChannelBackend {
    sender: Sender<VoiceCommand>,
    shared: Arc<SharedState>,
    next_handle: i32,
    sample_sizes: HashMap<i32, usize>,
}

impl ChannelBackend {
    fn send(&self, command: VoiceCommand) {
        if let Err(e) = self.sender.send(command) {
            log::warn!("Mixer disconnected, dropping command: {:?}", e.into_inner());
        }
    }

    fn upload(
        &mut self,
        data: &[u8],
        format: Option<SampleFormat>,
        block_size: Option<u32>,
    ) -> Result<i32> {
        let handle = self.next_handle;

        self.sender
            .send(VoiceCommand::Upload {
                handle,
                format,
                block_size,
                data: data.to_vec(),
            })
            .map_err(|_| SoundDriverError::Backend("Failed to send sample upload".to_string()))?;

        self.next_handle += 1;
        self.sample_sizes.insert(handle, data.len());
        Ok(handle)
    }
}

impl AudioBackend for ChannelBackend {
    fn time(&self) -> f64 {
        f64::from_bits(self.shared.clock.load(Ordering::Acquire))
    }

    fn queue_start_voice(&mut self, slot: usize, time: f64) {
        self.send(VoiceCommand::Start { slot, time });
    }

    fn queue_stop_voice(&mut self, slot: usize, time: f64) {
        self.send(VoiceCommand::Stop { slot, time });
    }

    fn queue_set_param_i(&mut self, slot: usize, param: VoiceParam, value: i32, time: f64) {
        self.send(VoiceCommand::SetParam {
            slot,
            param,
            value: ParamValue::Int(value),
            time,
        });
    }

    fn queue_set_param_f(&mut self, slot: usize, param: VoiceParam, value: f32, time: f64) {
        self.send(VoiceCommand::SetParam {
            slot,
            param,
            value: ParamValue::Float(value),
            time,
        });
    }

    fn voice_state(&self, slot: usize) -> bool {
        self.shared.playing.load(Ordering::Acquire) & (1 << slot) != 0
    }

    fn alloc_sample(&mut self, data: &[u8], format: SampleFormat) -> Result<i32> {
        self.upload(data, Some(format), None)
    }

    fn alloc_compressed(&mut self, data: &[u8], block_size: u32) -> Result<i32> {
        self.upload(data, None, Some(block_size))
    }

    fn free_sample(&mut self, handle: i32) {
        if self.sample_sizes.remove(&handle).is_some() {
            self.send(VoiceCommand::Free { handle });
        }
    }

    fn usage(&self) -> u32 {
        self.sample_sizes.values().sum::<usize>() as u32
    }

    fn set_reverb_params(&mut self, params: ReverbParams) {
        self.send(VoiceCommand::SetReverb(params));
    }
}

/// Mixer-side end of a [`channel_backend`] pair.
pub struct MixerLink {
    receiver: Receiver<VoiceCommand>,
    shared: Arc<SharedState>,
}

impl MixerLink {
    /// Publishes the mixer clock read by [`AudioBackend::time`].
    pub fn set_time(&self, time: f64) {
        self.shared.clock.store(time.to_bits(), Ordering::Release);
    }

    pub fn set_voice_playing(&self, slot: usize, playing: bool) {
        let bit = 1u32 << slot;
        if playing {
            self.shared.playing.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.shared.playing.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    pub fn is_voice_playing(&self, slot: usize) -> bool {
        self.shared.playing.load(Ordering::Acquire) & (1 << slot) != 0
    }

    /// Commands queued so far, without blocking.
    pub fn drain(&self) -> TryIter<'_, VoiceCommand> {
        self.receiver.try_iter()
    }

    pub fn receiver(&self) -> &Receiver<VoiceCommand> {
        &self.receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_reach_mixer() {
        let (mut backend, link) = channel_backend();

        backend.queue_set_param_f(2, VoiceParam::Volume, 0.5, 1.25);
        backend.queue_start_voice(2, 1.25);

        let commands: Vec<_> = link.drain().collect();
        assert_eq!(
            commands,
            vec![
                VoiceCommand::SetParam {
                    slot: 2,
                    param: VoiceParam::Volume,
                    value: ParamValue::Float(0.5),
                    time: 1.25,
                },
                VoiceCommand::Start {
                    slot: 2,
                    time: 1.25
                },
            ]
        );
    }

    #[test]
    fn test_mixer_state_is_visible_to_backend() {
        let (backend, link) = channel_backend();

        link.set_time(3.5);
        link.set_voice_playing(31, true);
        link.set_voice_playing(0, true);
        link.set_voice_playing(0, false);

        assert_eq!(backend.time(), 3.5);
        assert!(backend.voice_state(31));
        assert!(!backend.voice_state(0));
        assert!(link.is_voice_playing(31));
        assert!(!link.is_voice_playing(0));
    }

    #[test]
    fn test_upload_fails_when_mixer_is_gone() {
        let (mut backend, link) = channel_backend();
        drop(link);

        let result = backend.alloc_sample(&[0, 1], SampleFormat::PcmS16);
        assert!(matches!(result, Err(SoundDriverError::Backend(_))));
        assert_eq!(backend.usage(), 0);

        // Scheduling on a dead link only logs.
        backend.queue_stop_voice(1, 0.0);
    }
}
