use super::{AudioBackend, ParamValue, ReverbParams, SampleFormat, VoiceCommand, VoiceParam};
use crate::error::{Result, SoundDriverError};
use crate::voice::HW_VOICE_COUNT;
use std::collections::HashMap;

/// Sample data held by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSample {
    /// `None` for IMA-ADPCM uploads
    pub format: Option<SampleFormat>,
    pub block_size: Option<u32>,
    pub data: Vec<u8>,
}

/// Deterministic in-memory backend.
///
/// Time only moves when told to. A voice counts as playing from its start command until
/// a stop command or [`RecordingBackend::finish_voice`]; scheduled times are recorded
/// but not waited for.
#[derive(Debug)]
pub struct RecordingBackend {
    time: f64,
    playing: [bool; HW_VOICE_COUNT],
    commands: Vec<VoiceCommand>,
    samples: HashMap<i32, UploadedSample>,
    next_handle: i32,
    capacity: Option<usize>,
    reverb: Option<ReverbParams>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            playing: [false; HW_VOICE_COUNT],
            commands: Vec::new(),
            samples: HashMap::new(),
            next_handle: 0,
            capacity: None,
            reverb: None,
        }
    }

    /// Limits total sample memory; uploads beyond it fail.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds;
    }

    /// Simulates the voice in `slot` reaching the end of its sample.
    pub fn finish_voice(&mut self, slot: usize) {
        self.playing[slot] = false;
    }

    pub fn set_voice_playing(&mut self, slot: usize, playing: bool) {
        self.playing[slot] = playing;
    }

    pub fn commands(&self) -> &[VoiceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<VoiceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn commands_for_slot(&self, slot: usize) -> Vec<&VoiceCommand> {
        self.commands
            .iter()
            .filter(|command| command.slot() == Some(slot))
            .collect()
    }

    /// Parameters set on `slot`, in issue order.
    pub fn params_for_slot(&self, slot: usize) -> Vec<(VoiceParam, ParamValue)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                VoiceCommand::SetParam {
                    slot: s,
                    param,
                    value,
                    ..
                } if *s == slot => Some((*param, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn sample(&self, handle: i32) -> Option<&UploadedSample> {
        self.samples.get(&handle)
    }

    pub fn reverb_params(&self) -> Option<ReverbParams> {
        self.reverb
    }

    fn store(
        &mut self,
        data: &[u8],
        format: Option<SampleFormat>,
        block_size: Option<u32>,
    ) -> Result<i32> {
        if let Some(capacity) = self.capacity {
            let used = self.usage() as usize;
            if used + data.len() > capacity {
                return Err(SoundDriverError::SampleAllocation(format!(
                    "{} bytes requested, {} of {} bytes in use",
                    data.len(),
                    used,
                    capacity
                )));
            }
        }

        let handle = self.next_handle;
        self.next_handle += 1;

        self.samples.insert(
            handle,
            UploadedSample {
                format,
                block_size,
                data: data.to_vec(),
            },
        );
        self.commands.push(VoiceCommand::Upload {
            handle,
            format,
            block_size,
            data: data.to_vec(),
        });
        Ok(handle)
    }
}

impl AudioBackend for RecordingBackend {
    fn time(&self) -> f64 {
        self.time
    }

    fn queue_start_voice(&mut self, slot: usize, time: f64) {
        self.playing[slot] = true;
        self.commands.push(VoiceCommand::Start { slot, time });
    }

    fn queue_stop_voice(&mut self, slot: usize, time: f64) {
        self.playing[slot] = false;
        self.commands.push(VoiceCommand::Stop { slot, time });
    }

    fn queue_set_param_i(&mut self, slot: usize, param: VoiceParam, value: i32, time: f64) {
        self.commands.push(VoiceCommand::SetParam {
            slot,
            param,
            value: ParamValue::Int(value),
            time,
        });
    }

    fn queue_set_param_f(&mut self, slot: usize, param: VoiceParam, value: f32, time: f64) {
        self.commands.push(VoiceCommand::SetParam {
            slot,
            param,
            value: ParamValue::Float(value),
            time,
        });
    }

    fn voice_state(&self, slot: usize) -> bool {
        self.playing[slot]
    }

    fn alloc_sample(&mut self, data: &[u8], format: SampleFormat) -> Result<i32> {
        self.store(data, Some(format), None)
    }

    fn alloc_compressed(&mut self, data: &[u8], block_size: u32) -> Result<i32> {
        self.store(data, None, Some(block_size))
    }

    fn free_sample(&mut self, handle: i32) {
        if self.samples.remove(&handle).is_some() {
            self.commands.push(VoiceCommand::Free { handle });
        }
    }

    fn usage(&self) -> u32 {
        self.samples
            .values()
            .map(|sample| sample.data.len() as u32)
            .sum()
    }

    fn set_reverb_params(&mut self, params: ReverbParams) {
        self.reverb = Some(params);
        self.commands.push(VoiceCommand::SetReverb(params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_drive_voice_state() {
        let mut backend = RecordingBackend::new();
        assert!(!backend.voice_state(3));

        backend.queue_start_voice(3, 0.5);
        assert!(backend.voice_state(3));

        backend.finish_voice(3);
        assert!(!backend.voice_state(3));

        backend.queue_start_voice(3, 1.0);
        backend.queue_stop_voice(3, 0.0);
        assert!(!backend.voice_state(3));
        assert_eq!(backend.commands_for_slot(3).len(), 3);
    }

    #[test]
    fn test_clock_and_command_log() {
        let mut backend = RecordingBackend::new();
        backend.set_time(1.0);
        backend.advance(0.25);
        assert_eq!(backend.time(), 1.25);

        backend.queue_start_voice(0, backend.time());
        backend.set_reverb_params(ReverbParams::default());

        let taken = backend.take_commands();
        assert_eq!(
            taken,
            vec![
                VoiceCommand::Start {
                    slot: 0,
                    time: 1.25
                },
                VoiceCommand::SetReverb(ReverbParams::default()),
            ]
        );
        assert!(backend.commands().is_empty());
        assert_eq!(backend.reverb_params(), Some(ReverbParams::default()));
    }

    #[test]
    fn test_capacity_limits_uploads() {
        let mut backend = RecordingBackend::new().with_capacity(4);

        let handle = backend
            .alloc_sample(&[1, 2, 3], SampleFormat::PcmS8)
            .unwrap();
        assert_eq!(backend.usage(), 3);

        let result = backend.alloc_sample(&[4, 5], SampleFormat::PcmS8);
        assert!(matches!(result, Err(SoundDriverError::SampleAllocation(_))));

        backend.free_sample(handle);
        assert_eq!(backend.usage(), 0);
        assert!(backend.alloc_compressed(&[0; 4], 4).is_ok());
    }
}
