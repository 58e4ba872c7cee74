//! Stand-in for the hardware mixer.
//!
//! Runs on its own thread, applies the driver's commands as they arrive and reports
//! voices as finished once their sample would have played out. Nothing is rendered.

use crossbeam_channel::RecvTimeoutError;
use sound_driver::{
    HW_VOICE_COUNT, MixerLink, ParamValue, SampleFormat, VoiceCommand, VoiceParam,
};
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Default)]
pub struct MixerStats {
    pub commands: usize,
    pub voices_started: usize,
    pub voices_finished: usize,
}

#[derive(Debug, Clone, Copy)]
struct MixerVoice {
    sample: i32,
    sample_rate: i32,
    pitch: f32,
    looping: bool,
    playing: bool,
    end: Option<f64>,
}

impl Default for MixerVoice {
    fn default() -> Self {
        Self {
            sample: -1,
            sample_rate: 0,
            pitch: 1.0,
            looping: false,
            playing: false,
            end: None,
        }
    }
}

struct Mixer {
    link: MixerLink,
    origin: Instant,
    /// Length of each uploaded sample in frames
    samples: HashMap<i32, usize>,
    voices: [MixerVoice; HW_VOICE_COUNT],
    stats: MixerStats,
}

/// Starts the mixer thread. It exits once the driver side of the channel is dropped.
pub fn spawn(link: MixerLink) -> JoinHandle<MixerStats> {
    thread::spawn(move || {
        let mut mixer = Mixer {
            link,
            origin: Instant::now(),
            samples: HashMap::new(),
            voices: [MixerVoice::default(); HW_VOICE_COUNT],
            stats: MixerStats::default(),
        };
        mixer.run();
        mixer.stats
    })
}

impl Mixer {
    fn run(&mut self) {
        loop {
            let now = self.origin.elapsed().as_secs_f64();
            self.link.set_time(now);
            self.retire_finished(now);

            match self.link.receiver().recv_timeout(POLL_INTERVAL) {
                Ok(command) => self.apply(command, now),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("Mixer stopped");
    }

    fn retire_finished(&mut self, now: f64) {
        for (slot, voice) in self.voices.iter_mut().enumerate() {
            if voice.playing && voice.end.is_some_and(|end| end <= now) {
                voice.playing = false;
                self.link.set_voice_playing(slot, false);
                self.stats.voices_finished += 1;
            }
        }
    }

    fn apply(&mut self, command: VoiceCommand, now: f64) {
        self.stats.commands += 1;

        match command {
            VoiceCommand::Upload {
                handle,
                format,
                data,
                ..
            } => {
                let frames = match format {
                    Some(SampleFormat::PcmS8) => data.len(),
                    Some(SampleFormat::PcmS16) => data.len() / 2,
                    // 4 bits per sample, ignoring block headers
                    None => data.len() * 2,
                };
                self.samples.insert(handle, frames);
            }
            VoiceCommand::Free { handle } => {
                self.samples.remove(&handle);
            }
            VoiceCommand::SetParam {
                slot, param, value, ..
            } => {
                let voice = &mut self.voices[slot];
                match (param, value) {
                    (VoiceParam::SampleData, ParamValue::Int(handle)) => voice.sample = handle,
                    (VoiceParam::SampleRate, ParamValue::Int(rate)) => voice.sample_rate = rate,
                    (VoiceParam::LoopEnable, ParamValue::Int(looping)) => {
                        voice.looping = looping != 0
                    }
                    (VoiceParam::Pitch, ParamValue::Float(pitch)) => voice.pitch = pitch,
                    _ => {}
                }
            }
            VoiceCommand::Start { slot, time } => {
                let start = time.max(now);
                let voice = &mut self.voices[slot];
                voice.playing = true;
                voice.end = if voice.looping {
                    None
                } else {
                    let frames = self.samples.get(&voice.sample).copied().unwrap_or(0);
                    let rate = voice.sample_rate.max(1) as f64 * voice.pitch.max(0.01) as f64;
                    Some(start + frames as f64 / rate)
                };
                self.link.set_voice_playing(slot, true);
                self.stats.voices_started += 1;
            }
            VoiceCommand::Stop { slot, .. } => {
                self.voices[slot].playing = false;
                self.link.set_voice_playing(slot, false);
            }
            VoiceCommand::SetReverb(params) => {
                log::info!("Reverb set to {:?}", params);
            }
        }
    }
}
