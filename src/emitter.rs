//! Virtual emitters and their registry.
//!
//! Emitters live in a generational arena. An [`EmitterId`] stays valid until the emitter
//! is destroyed; after that the slot's generation moves on and the stale id no longer
//! resolves. Iteration follows a separate ordered id list holding exactly the emitters
//! that are still valid, in creation order.

use crate::audio_data::Sample;
use crate::config::SourceConfig;
use crate::math::{Pose, Vec3};
use crate::playback::{PlaybackDesc, VoiceParams};
use crate::spatial::spatialize;
use crate::voice::VoiceClaim;

/// Stable handle to an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmitterId({}v{})", self.index, self.generation)
    }
}

/// A logical sound source that may or may not hold a hardware voice.
#[derive(Debug, Clone)]
pub struct Emitter {
    pub(crate) valid: bool,
    pub(crate) priority: u8,
    pub(crate) looping: bool,
    pub(crate) reverb: bool,
    pub(crate) volume: f32,
    pub(crate) pitch: f32,
    pub(crate) sample: Sample,
    pub(crate) source: SourceConfig,
    pub(crate) claim: Option<VoiceClaim>,
}

impl Emitter {
    pub(crate) fn new(desc: &PlaybackDesc, source: SourceConfig) -> Self {
        Self {
            valid: true,
            priority: desc.priority,
            looping: desc.looping,
            reverb: desc.reverb,
            volume: desc.volume,
            pitch: desc.pitch,
            sample: desc.sample,
            source,
            claim: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn sample(&self) -> Sample {
        self.sample
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub fn position(&self) -> Option<Vec3> {
        self.source.position()
    }

    /// Parameters for this emitter's voice as heard by `listener`.
    pub(crate) fn voice_params(&self, listener: &Pose) -> VoiceParams {
        let (gain, pan) = match self.source {
            SourceConfig::NonSpatial { pan } => (self.volume, pan),
            SourceConfig::Spatial {
                position,
                attenuation,
            } => {
                let spatial = spatialize(position, &attenuation, listener, self.volume);
                (spatial.gain, spatial.pan)
            }
        };

        VoiceParams {
            sample: self.sample,
            looping: self.looping,
            reverb: self.reverb,
            gain,
            pitch: self.pitch,
            pan,
        }
    }

    /// The voice this emitter last claimed. It may have been stolen since; check with
    /// [`crate::voice::VoicePool::owns`].
    pub fn claim(&self) -> Option<VoiceClaim> {
        self.claim
    }
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    emitter: Option<Emitter>,
}

#[derive(Debug, Default)]
pub struct EmitterRegistry {
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Valid emitters in creation order
    order: Vec<EmitterId>,
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `emitter` and appends it to the iteration order.
    pub fn insert(&mut self, emitter: Emitter) -> EmitterId {
        let id = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.emitter = Some(emitter);
                EmitterId {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry {
                    generation: 0,
                    emitter: Some(emitter),
                });
                EmitterId {
                    index,
                    generation: 0,
                }
            }
        };

        self.order.push(id);
        id
    }

    pub fn get(&self, id: EmitterId) -> Option<&Emitter> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.emitter.as_ref())
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.emitter.as_mut())
    }

    /// Removes `id` from the iteration order and marks it invalid. Storage is kept.
    ///
    /// Returns false if the emitter was already invalid or is unknown.
    pub fn unlink(&mut self, id: EmitterId) -> bool {
        let Some(emitter) = self.get_mut(id) else {
            return false;
        };
        if !emitter.valid {
            return false;
        }
        emitter.valid = false;

        if let Some(pos) = self.order.iter().position(|&other| other == id) {
            self.order.remove(pos);
        }
        true
    }

    /// Releases the storage of `id`. The id and every copy of it become stale.
    pub fn remove(&mut self, id: EmitterId) -> Option<Emitter> {
        self.unlink(id);

        let entry = self
            .entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)?;
        let emitter = entry.emitter.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(emitter)
    }

    /// Number of valid emitters.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Valid emitters in creation order.
    pub fn ids(&self) -> &[EmitterId] {
        &self.order
    }

    pub fn first(&self) -> Option<EmitterId> {
        self.order.first().copied()
    }

    pub fn last(&self) -> Option<EmitterId> {
        self.order.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|emitter| (id, emitter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> Emitter {
        Emitter::new(
            &PlaybackDesc::new(Sample::new(0, 22050)),
            SourceConfig::default(),
        )
    }

    #[test]
    fn test_insert_keeps_creation_order() {
        let mut registry = EmitterRegistry::new();
        let a = registry.insert(emitter());
        let b = registry.insert(emitter());
        let c = registry.insert(emitter());

        assert_eq!(registry.ids(), &[a, b, c]);
        assert_eq!(registry.first(), Some(a));
        assert_eq!(registry.last(), Some(c));
    }

    #[test]
    fn test_unlink_head_middle_and_tail() {
        let mut registry = EmitterRegistry::new();
        let ids: Vec<_> = (0..5).map(|_| registry.insert(emitter())).collect();

        assert!(registry.unlink(ids[2]));
        assert_eq!(registry.ids(), &[ids[0], ids[1], ids[3], ids[4]]);

        assert!(registry.unlink(ids[0]));
        assert_eq!(registry.first(), Some(ids[1]));

        assert!(registry.unlink(ids[4]));
        assert_eq!(registry.last(), Some(ids[3]));
        assert_eq!(registry.len(), 2);

        // Stopped emitters keep their storage but are no longer valid.
        assert!(!registry.get(ids[2]).unwrap().is_valid());
        assert!(!registry.unlink(ids[2]));
    }

    #[test]
    fn test_unlink_only_member() {
        let mut registry = EmitterRegistry::new();
        let id = registry.insert(emitter());

        assert!(registry.unlink(id));
        assert!(registry.is_empty());
        assert_eq!(registry.first(), None);
        assert_eq!(registry.last(), None);
    }

    #[test]
    fn test_removed_ids_go_stale() {
        let mut registry = EmitterRegistry::new();
        let old = registry.insert(emitter());
        assert!(registry.remove(old).is_some());
        assert!(registry.get(old).is_none());
        assert!(registry.remove(old).is_none());

        // The slot is reused under a new generation.
        let new = registry.insert(emitter());
        assert_ne!(old, new);
        assert!(registry.get(old).is_none());
        assert!(registry.get(new).unwrap().is_valid());
        assert!(!registry.unlink(old));
        assert_eq!(registry.ids(), &[new]);
    }
}
