//! Hardware voice pool.
//!
//! Tracks ownership of the fixed set of hardware voices and decides which one a new
//! request gets. Ownership is never locked: a voice carries a generation counter that
//! is bumped on every claim, and whoever holds a [`VoiceClaim`] must check it against
//! the pool with [`VoicePool::owns`] before touching the voice.

use crate::backend::AudioBackend;

/// Number of hardware voices exposed by the backend.
pub const HW_VOICE_COUNT: usize = 32;

/// Claim priority of a voice nobody cares about.
pub const LOWEST_PRIORITY: u8 = u8::MAX;

/// Bookkeeping for one hardware voice.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareVoice {
    slot: usize,
    /// 0 is most important, 255 least
    priority: u8,
    /// Set when a start is queued, cleared when a stop is queued
    playing: bool,
    generation: u32,
    /// Schedule time of the last claim
    play_time: f64,
}

impl HardwareVoice {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            priority: LOWEST_PRIORITY,
            playing: false,
            generation: 0,
            play_time: 0.0,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn play_time(&self) -> f64 {
        self.play_time
    }
}

/// Proof of ownership of a hardware voice at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceClaim {
    pub slot: usize,
    pub generation: u32,
}

#[derive(Debug)]
pub struct VoicePool {
    voices: [HardwareVoice; HW_VOICE_COUNT],
    search_start: usize,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            voices: std::array::from_fn(HardwareVoice::new),
            search_start: 0,
        }
    }

    pub fn voices(&self) -> &[HardwareVoice] {
        &self.voices
    }

    pub fn voice(&self, slot: usize) -> &HardwareVoice {
        &self.voices[slot]
    }

    /// Slot the next [`VoicePool::allocate`] call starts scanning from.
    pub fn search_start(&self) -> usize {
        self.search_start
    }

    /// Picks a voice for a request of the given priority.
    ///
    /// An idle voice (not locally playing and not audible according to the backend) is
    /// taken immediately. Otherwise the voice with the earliest play time among those
    /// whose priority is numerically >= `priority` is stolen. Returns `None` when every
    /// voice holds something more important.
    ///
    /// Commands are scheduled ahead of real time, so a fixed scan order would keep
    /// stealing the same early slots before they ever become audible. The scan
    /// therefore starts one slot further on every call, whatever the outcome.
    ///
    /// The chosen voice takes over `priority`; its generation is left to
    /// [`VoicePool::claim`].
    pub fn allocate<B: AudioBackend + ?Sized>(
        &mut self,
        priority: u8,
        backend: &B,
    ) -> Option<usize> {
        let mut chosen: Option<usize> = None;

        for i in 0..HW_VOICE_COUNT {
            let idx = (i + self.search_start) % HW_VOICE_COUNT;
            let voice = &self.voices[idx];

            if !voice.playing && !backend.voice_state(idx) {
                chosen = Some(idx);
                break;
            }

            let older = chosen.is_none_or(|best| voice.play_time < self.voices[best].play_time);
            if older && voice.priority >= priority {
                chosen = Some(idx);
            }
        }

        self.search_start = (self.search_start + 1) % HW_VOICE_COUNT;

        if let Some(slot) = chosen {
            self.voices[slot].priority = priority;
        }
        chosen
    }

    /// Takes ownership of `slot`, invalidating every earlier claim on it.
    pub fn claim(&mut self, slot: usize, time: f64) -> VoiceClaim {
        let voice = &mut self.voices[slot];
        voice.play_time = time;
        voice.generation = voice.generation.wrapping_add(1);
        VoiceClaim {
            slot,
            generation: voice.generation,
        }
    }

    /// Whether `claim` still owns its voice.
    pub fn owns(&self, claim: VoiceClaim) -> bool {
        self.voices[claim.slot].generation == claim.generation
    }

    /// Makes `slot` the first choice for stealing.
    pub fn release(&mut self, slot: usize) {
        self.voices[slot].priority = LOWEST_PRIORITY;
    }

    pub fn queue_start<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: usize,
        time: f64,
    ) {
        self.voices[slot].playing = true;
        backend.queue_start_voice(slot, time);
    }

    pub fn queue_stop<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: usize,
        time: f64,
    ) {
        self.voices[slot].playing = false;
        backend.queue_stop_voice(slot, time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;

    /// Starts every voice with the given priorities and play times.
    fn saturate(
        pool: &mut VoicePool,
        backend: &mut RecordingBackend,
        priority: impl Fn(usize) -> u8,
    ) {
        for slot in 0..HW_VOICE_COUNT {
            pool.voices[slot].priority = priority(slot);
            pool.claim(slot, slot as f64);
            pool.queue_start(backend, slot, slot as f64);
        }
    }

    #[test]
    fn test_fresh_pool_allocates_from_cursor() {
        let mut pool = VoicePool::new();
        let backend = RecordingBackend::new();

        assert_eq!(pool.allocate(10, &backend), Some(0));
        // Nothing was started on slot 0, so the next scan (starting at 1) picks slot 1.
        assert_eq!(pool.allocate(10, &backend), Some(1));
        assert_eq!(pool.voice(0).priority(), 10);
    }

    #[test]
    fn test_cursor_advances_on_every_call() {
        let mut pool = VoicePool::new();
        let mut backend = RecordingBackend::new();
        saturate(&mut pool, &mut backend, |_| 0);

        for call in 1..=(HW_VOICE_COUNT * 2 + 3) {
            // Every voice outranks the request, so all of these calls fail.
            assert_eq!(pool.allocate(1, &backend), None);
            assert_eq!(pool.search_start(), call % HW_VOICE_COUNT);
        }
    }

    #[test]
    fn test_idle_voice_beats_steal_candidate() {
        for cursor in 0..HW_VOICE_COUNT {
            let mut pool = VoicePool::new();
            let mut backend = RecordingBackend::new();
            saturate(&mut pool, &mut backend, |_| LOWEST_PRIORITY);

            // Slot 17 becomes idle: stopped locally and silent on the backend.
            pool.queue_stop(&mut backend, 17, 0.0);
            pool.search_start = cursor;

            assert_eq!(pool.allocate(0, &backend), Some(17));
        }
    }

    #[test]
    fn test_locally_playing_voice_is_not_idle() {
        let mut pool = VoicePool::new();
        let mut backend = RecordingBackend::new();
        saturate(&mut pool, &mut backend, |_| 0);

        // The backend has not started it yet, but a start is queued.
        backend.finish_voice(5);
        assert_eq!(pool.allocate(1, &backend), None);
    }

    #[test]
    fn test_steals_oldest_equal_or_lower_priority() {
        let mut pool = VoicePool::new();
        let mut backend = RecordingBackend::new();
        // Even slots are important (0), odd slots are background (200).
        saturate(&mut pool, &mut backend, |slot| if slot % 2 == 0 { 0 } else { 200 });

        // Oldest background voice is slot 1 (play time 1.0).
        assert_eq!(pool.allocate(200, &backend), Some(1));

        pool.claim(1, 100.0);
        // Next oldest background voice is slot 3.
        assert_eq!(pool.allocate(150, &backend), Some(3));
        assert_eq!(pool.voice(3).priority(), 150);
    }

    #[test]
    fn test_never_steals_more_important_voice() {
        for requested in [0u8, 1, 64, 127, 128, 200, 254, 255] {
            let mut pool = VoicePool::new();
            let mut backend = RecordingBackend::new();
            saturate(&mut pool, &mut backend, |slot| (slot * 8) as u8);

            let before: Vec<u8> = pool.voices().iter().map(|v| v.priority()).collect();
            match pool.allocate(requested, &backend) {
                Some(slot) => assert!(before[slot] >= requested),
                None => assert!(before.iter().all(|&p| p < requested)),
            }
        }
    }

    #[test]
    fn test_claim_invalidates_previous_owner() {
        let mut pool = VoicePool::new();

        let first = pool.claim(4, 1.0);
        assert!(pool.owns(first));

        let second = pool.claim(4, 2.0);
        assert!(!pool.owns(first));
        assert!(pool.owns(second));
        assert_eq!(pool.voice(4).play_time(), 2.0);
    }
}
