//! The sound driver: virtual emitters multiplexed onto the hardware voices.
//!
//! Emitters are logical sounds that may outnumber the hardware voices. Each call to
//! [`SoundDriver::update`] walks the registry once, gives looping emitters without a
//! voice another chance at one, refreshes the parameters of every emitter that still
//! owns its voice, and retires non-looping emitters whose sound has ended.
//!
//! All scheduling goes through the [`AudioBackend`]; the driver never talks to a mixer
//! directly and is meant to be driven from a single thread.


use std::io::{Read, Seek};
use std::path::Path;

use crate::audio_data::{self, Sample};
use crate::backend::{AudioBackend, ReverbParams};
use crate::config::{SoundDriverDesc, SourceConfig};
use crate::emitter::{Emitter, EmitterId, EmitterRegistry};
use crate::error::Result;
use crate::events::DriverEvent;
use crate::math::{Pose, Quat, Vec3};
use crate::playback::{PlaybackDesc, VoiceParams};
use crate::spatial::{Attenuation, spatialize};
use crate::voice::{HW_VOICE_COUNT, HardwareVoice, VoicePool};

/// Time value that makes the scheduler act at once.
const IMMEDIATE: f64 = 0.0;

pub struct SoundDriver<B: AudioBackend> {
    backend: B,
    voices: VoicePool,
    emitters: EmitterRegistry,
    listener: Pose,
    events: Vec<DriverEvent>,
    record_events: bool,
}

impl<B: AudioBackend> SoundDriver<B> {
    /// Creates a driver with every voice idle, no emitters and the listener from `desc`.
    pub fn new(mut backend: B, desc: SoundDriverDesc) -> Self {
        if let Some(reverb) = desc.reverb {
            backend.set_reverb_params(reverb);
        }

        log::info!(
            "Sound driver initialized ({} hardware voices)",
            HW_VOICE_COUNT
        );

        Self {
            backend,
            voices: VoicePool::new(),
            emitters: EmitterRegistry::new(),
            listener: desc.listener,
            events: Vec::new(),
            record_events: desc.record_events,
        }
    }

    /// Runs one tick over every valid emitter, in creation order.
    pub fn update(&mut self) {
        let mut index = 0;
        while let Some(&id) = self.emitters.ids().get(index) {
            let Some(emitter) = self.emitters.get(id) else {
                index += 1;
                continue;
            };
            let looping = emitter.looping;

            if looping && emitter.claim.is_none() {
                self.assign_voice(id);
            } else {
                self.refresh_voice(id);
            }

            if !looping && self.has_finished(id) {
                self.stop(id);
                log::trace!("Emitter {} finished", id);
                self.push_event(DriverEvent::EmitterRetired { emitter: id });
                // The next emitter moved into this position.
                continue;
            }

            index += 1;
        }
    }

    /// Starts a non-spatial emitter at a fixed pan.
    pub fn play(&mut self, desc: &PlaybackDesc, pan: f32) -> EmitterId {
        self.play_source(desc, SourceConfig::non_spatial(pan))
    }

    /// Starts an emitter positioned in the world. Gain and pan follow the listener.
    pub fn play_3d(
        &mut self,
        desc: &PlaybackDesc,
        position: Vec3,
        attenuation: Attenuation,
    ) -> EmitterId {
        self.play_source(desc, SourceConfig::spatial(position, attenuation))
    }

    /// Starts an emitter from any [`SourceConfig`].
    ///
    /// A voice is requested right away. If none can be had the emitter is still
    /// registered: looping emitters keep trying on every update, others are retired by
    /// the next one.
    pub fn play_source(&mut self, desc: &PlaybackDesc, source: SourceConfig) -> EmitterId {
        let id = self.emitters.insert(Emitter::new(desc, source));
        if !self.assign_voice(id) {
            log::debug!(
                "No voice available for emitter {} (priority {})",
                id,
                desc.priority
            );
        }
        id
    }

    /// Fire-and-forget playback at a fixed pan. Never loops.
    ///
    /// Returns false if every voice holds something more important; the sound is then
    /// dropped.
    pub fn play_one_shot(&mut self, desc: &PlaybackDesc, pan: f32) -> bool {
        self.one_shot(desc, desc.volume, pan)
    }

    /// Fire-and-forget playback at a world position, spatialized once at start.
    pub fn play_one_shot_3d(
        &mut self,
        desc: &PlaybackDesc,
        position: Vec3,
        attenuation: Attenuation,
    ) -> bool {
        let spatial = spatialize(position, &attenuation, &self.listener, desc.volume);
        self.one_shot(desc, spatial.gain, spatial.pan)
    }

    /// Stops an emitter and takes it out of the update loop.
    ///
    /// The voice is only silenced while the emitter still owns it. Its storage stays
    /// around until [`SoundDriver::destroy`], so the id keeps resolving as invalid.
    /// Stopping twice is a no-op.
    pub fn stop(&mut self, id: EmitterId) {
        let Some(emitter) = self.emitters.get(id) else {
            log::debug!("Ignoring stop for unknown emitter {}", id);
            return;
        };
        if !emitter.valid {
            return;
        }

        if let Some(claim) = emitter.claim {
            if self.voices.owns(claim) {
                self.voices.release(claim.slot);
                self.voices
                    .queue_stop(&mut self.backend, claim.slot, IMMEDIATE);
            }
        }

        self.emitters.unlink(id);
    }

    /// Stops the emitter if needed and frees its storage. `id` goes stale.
    pub fn destroy(&mut self, id: EmitterId) {
        self.stop(id);
        self.emitters.remove(id);
    }

    /// Moves a 3D emitter. Takes effect on the next update.
    pub fn set_position(&mut self, id: EmitterId, position: Vec3) {
        let Some(emitter) = self.emitters.get_mut(id) else {
            log::debug!("Ignoring position for unknown emitter {}", id);
            return;
        };

        match &mut emitter.source {
            SourceConfig::Spatial { position: p, .. } => *p = position,
            SourceConfig::NonSpatial { .. } => {
                log::debug!("Emitter {} is not spatial; position ignored", id);
            }
        }
    }

    /// Moves and turns the listener. Takes effect on the next update.
    pub fn set_listener(&mut self, position: Vec3, rotation: Quat) {
        self.listener = Pose::new(position, rotation);
    }

    pub fn set_listener_pose(&mut self, pose: Pose) {
        self.listener = pose;
    }

    pub fn listener(&self) -> Pose {
        self.listener
    }

    /// Loads a WAV blob into sample memory.
    ///
    /// Failures are logged and yield [`Sample::INVALID`]; use
    /// [`SoundDriver::try_load_wav_bytes`] to see the error.
    pub fn load_wav_bytes(&mut self, data: &[u8]) -> Sample {
        self.try_load_wav_bytes(data).unwrap_or_else(|e| {
            log::error!("Failed to load WAV: {}", e);
            Sample::INVALID
        })
    }

    /// Loads a WAV stream into sample memory, yielding [`Sample::INVALID`] on failure.
    pub fn load_wav<R: Read + Seek>(&mut self, reader: R) -> Sample {
        self.try_load_wav(reader).unwrap_or_else(|e| {
            log::error!("Failed to load WAV: {}", e);
            Sample::INVALID
        })
    }

    pub fn try_load_wav_bytes(&mut self, data: &[u8]) -> Result<Sample> {
        let sample = audio_data::load_wav_bytes(&mut self.backend, data)?;
        log::debug!(
            "Loaded sample {} at {} Hz ({} bytes)",
            sample.handle,
            sample.sample_rate,
            data.len()
        );
        Ok(sample)
    }

    pub fn try_load_wav<R: Read + Seek>(&mut self, reader: R) -> Result<Sample> {
        let sample = audio_data::load_wav(&mut self.backend, reader)?;
        log::debug!(
            "Loaded sample {} at {} Hz from stream",
            sample.handle,
            sample.sample_rate
        );
        Ok(sample)
    }

    pub fn try_load_wav_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Sample> {
        let path = path.as_ref();
        let sample = audio_data::load_wav_file(&mut self.backend, path)?;
        log::debug!("Loaded sample {} from {}", sample.handle, path.display());
        Ok(sample)
    }

    /// Returns a sample's memory to the backend. Invalid samples are ignored.
    ///
    /// Emitters still referring to it are not touched.
    pub fn free_sample(&mut self, sample: Sample) {
        if sample.is_valid() {
            self.backend.free_sample(sample.handle);
        }
    }

    /// Bytes of sample memory in use.
    pub fn sample_memory_usage(&self) -> u32 {
        self.backend.usage()
    }

    pub fn set_reverb_params(&mut self, params: ReverbParams) {
        self.backend.set_reverb_params(params);
    }

    /// Returns the emitter behind `id`, including stopped ones that were not destroyed.
    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.get(id)
    }

    /// Whether `id` is still part of the update loop.
    pub fn is_valid(&self, id: EmitterId) -> bool {
        self.emitters.get(id).is_some_and(|e| e.valid)
    }

    /// Whether `id` is valid and currently owns a hardware voice.
    pub fn is_assigned(&self, id: EmitterId) -> bool {
        self.emitters
            .get(id)
            .filter(|e| e.valid)
            .and_then(|e| e.claim)
            .is_some_and(|claim| self.voices.owns(claim))
    }

    /// Valid emitters in update order.
    pub fn active_emitters(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> + '_ {
        self.emitters.iter()
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    pub fn voices(&self) -> &[HardwareVoice] {
        self.voices.voices()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Drains the events recorded since the last call.
    pub fn poll_events(&mut self) -> Vec<DriverEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_event(&mut self, event: DriverEvent) {
        if self.record_events {
            self.events.push(event);
        }
    }

    /// Tries to give `id` a voice and starts it with a full parameter snapshot.
    fn assign_voice(&mut self, id: EmitterId) -> bool {
        let Some(priority) = self.emitters.get(id).map(|e| e.priority) else {
            return false;
        };
        let Some(slot) = self.voices.allocate(priority, &self.backend) else {
            return false;
        };

        if self.voices.voice(slot).is_playing() || self.backend.voice_state(slot) {
            log::debug!("Emitter {} steals voice {}", id, slot);
        }

        let time = self.backend.time();
        let claim = self.voices.claim(slot, time);

        let Some(emitter) = self.emitters.get_mut(id) else {
            return false;
        };
        emitter.claim = Some(claim);
        let params = emitter.voice_params(&self.listener);

        params.schedule(&mut self.backend, slot, time);
        self.voices.queue_start(&mut self.backend, slot, time);

        self.push_event(DriverEvent::EmitterAssigned { emitter: id, slot });
        true
    }

    /// Pushes fresh parameters if `id` still owns its voice, forgets the voice otherwise.
    fn refresh_voice(&mut self, id: EmitterId) {
        let Some(emitter) = self.emitters.get_mut(id) else {
            return;
        };
        let Some(claim) = emitter.claim else {
            return;
        };

        if self.voices.owns(claim) {
            let params = emitter.voice_params(&self.listener);
            let time = self.backend.time();
            log::trace!("Emitter {} on voice {}: {:?}", id, claim.slot, params);
            params.schedule(&mut self.backend, claim.slot, time);
        } else {
            emitter.claim = None;
            log::debug!("Emitter {} lost voice {}", id, claim.slot);
            self.push_event(DriverEvent::VoiceStolen {
                emitter: id,
                slot: claim.slot,
            });
        }
    }

    /// A non-looping emitter is done once it has no voice or its voice went quiet.
    fn has_finished(&self, id: EmitterId) -> bool {
        match self.emitters.get(id).and_then(|e| e.claim) {
            None => true,
            Some(claim) => !self.backend.voice_state(claim.slot),
        }
    }

    fn one_shot(&mut self, desc: &PlaybackDesc, gain: f32, pan: f32) -> bool {
        let Some(slot) = self.voices.allocate(desc.priority, &self.backend) else {
            log::debug!("One-shot dropped (priority {})", desc.priority);
            self.push_event(DriverEvent::OneShotDropped {
                priority: desc.priority,
            });
            return false;
        };

        let time = self.backend.time();
        // Nobody holds this claim; taking it only tells a previous owner it lost the voice.
        self.voices.claim(slot, time);

        let params = VoiceParams {
            sample: desc.sample,
            looping: false,
            reverb: desc.reverb,
            gain,
            pitch: desc.pitch,
            pan,
        };
        params.schedule_one_shot(&mut self.backend, slot, time);
        self.voices.queue_start(&mut self.backend, slot, time);
        true
    }
}
