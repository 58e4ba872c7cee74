use crate::mixer;
use anyhow::{Context, Result};
use sound_driver::{
    Attenuation, AttenuationModel, DriverEvent, PlaybackDesc, ReverbParams, SoundDriver,
    SoundDriverDesc, Vec3, channel_backend,
};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(16);
const TICKS: usize = 300;
const ORBIT_RADIUS: f32 = 5.0;

/// Runs a headless scene: one looping emitter circling the listener, periodic bursts of
/// one-shots that oversubscribe the voices, and a few plain emitters now and then.
pub fn run(wav_path: Option<&str>) -> Result<()> {
    let (backend, link) = channel_backend();
    let mixer = mixer::spawn(link);

    let desc = SoundDriverDesc::new().reverb(ReverbParams {
        room_size: 0.8,
        ..Default::default()
    });
    let mut driver = SoundDriver::new(backend, desc);

    let sample = match wav_path {
        Some(path) => driver
            .try_load_wav_file(path)
            .with_context(|| format!("Failed to load {}", path))?,
        None => driver.try_load_wav_bytes(&tone_wav(440.0, 0.25, 22050))?,
    };
    log::info!(
        "Sample {} at {} Hz, {} bytes of sample memory in use",
        sample.handle,
        sample.sample_rate,
        driver.sample_memory_usage()
    );

    let attenuation = Attenuation::new(AttenuationModel::InverseDistance, 1.0, 50.0, 1.0)?;
    let orbiter = driver.play_3d(
        &PlaybackDesc::new(sample)
            .priority(0)
            .looping(true)
            .reverb(true),
        Vec3::new(ORBIT_RADIUS, 0.0, 0.0),
        attenuation,
    );

    let mut assigned = 0;
    let mut stolen = 0;
    let mut retired = 0;
    let mut dropped = 0;

    for tick in 0..TICKS {
        let angle = tick as f32 * 0.05;
        driver.set_position(
            orbiter,
            Vec3::new(ORBIT_RADIUS * angle.cos(), 0.0, -ORBIT_RADIUS * angle.sin()),
        );

        if tick % 30 == 0 {
            for i in 0..40u32 {
                let desc = PlaybackDesc::new(sample)
                    .priority((i * 6) as u8)
                    .pitch(0.5 + i as f32 * 0.05);
                let position = Vec3::new((i as f32 - 20.0) * 0.5, 0.0, -2.0);
                driver.play_one_shot_3d(&desc, position, attenuation);
            }
        }

        if tick % 45 == 0 {
            for i in 0..8 {
                let pan = i as f32 / 7.0 * 2.0 - 1.0;
                driver.play(&PlaybackDesc::new(sample).priority(64).volume(0.5), pan);
            }
        }

        driver.update();

        for event in driver.poll_events() {
            match event {
                DriverEvent::EmitterAssigned { .. } => assigned += 1,
                DriverEvent::VoiceStolen { .. } => stolen += 1,
                DriverEvent::EmitterRetired { .. } => retired += 1,
                DriverEvent::OneShotDropped { .. } => dropped += 1,
            }
        }

        if tick % 60 == 0 {
            log::info!(
                "tick {}: {} emitters, orbiter {}",
                tick,
                driver.emitter_count(),
                if driver.is_assigned(orbiter) {
                    "playing"
                } else {
                    "waiting"
                }
            );
        }

        std::thread::sleep(TICK);
    }

    log::info!(
        "{} assignments, {} steals, {} retired, {} one-shots dropped",
        assigned,
        stolen,
        retired,
        dropped
    );

    driver.destroy(orbiter);
    driver.free_sample(sample);
    drop(driver);

    let stats = mixer
        .join()
        .map_err(|_| anyhow::anyhow!("Mixer thread panicked"))?;
    log::info!(
        "Mixer handled {} commands, started {} voices, {} ran to the end",
        stats.commands,
        stats.voices_started,
        stats.voices_finished
    );

    Ok(())
}

/// A mono 8-bit PCM sine tone as a complete WAV file.
fn tone_wav(frequency: f32, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let frames = (seconds * sample_rate as f32) as u32;
    let pcm: Vec<u8> = (0..frames)
        .map(|n| {
            let phase = n as f32 / sample_rate as f32 * frequency * std::f32::consts::TAU;
            (128.0 + 100.0 * phase.sin()) as u8
        })
        .collect();

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + frames).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&8u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&frames.to_le_bytes());
    wav.extend_from_slice(&pcm);
    wav
}
