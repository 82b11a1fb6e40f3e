//! Test helpers for kmeter integration tests.
//!
//! Everything runs on [`OfflineBackend`], so no audio hardware is needed.

#![allow(dead_code)]


use kmeter::prelude::*;
use kmeter::OfflineDriver;

/// Default test sample rate.
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Callback size used by the offline backend.
pub const TEST_BLOCK_SIZE: usize = 256;

/// Meter with a short teardown grace so tests stay fast.
pub fn test_builder(channels: usize) -> MeterSystemBuilder {
    MeterSystem::builder()
        .channels(channels)
        .shutdown_grace(Duration::from_millis(1))
}

/// Polling-only meter on an offline backend, plus the driver that feeds it.
pub fn offline_meter(channels: usize) -> (MeterSystem<OfflineBackend>, OfflineDriver) {
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(channels)
        .build_with(backend)
        .expect("offline meter");
    (meter, driver)
}

/// Sine wave at `frequency` Hz.
pub fn generate_sine(frequency: f32, amplitude: f32, num_samples: usize) -> Vec<f32> {
    let step = 2.0 * std::f32::consts::PI * frequency / TEST_SAMPLE_RATE as f32;
    (0..num_samples)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// One block holding a single sample of `amplitude` at `position`.
pub fn impulse_block(amplitude: f32, position: usize) -> Vec<f32> {
    let mut block = generate_silence(TEST_BLOCK_SIZE);
    block[position] = amplitude;
    block
}

/// Reproducible noise in [-1, 1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
        })
        .collect()
}

/// Run `blocks` silent callbacks on `channels` ports.
pub fn run_silence(driver: &OfflineDriver, channels: usize, blocks: usize) {
    let silence = generate_silence(TEST_BLOCK_SIZE);
    let views: Vec<&[f32]> = vec![silence.as_slice(); channels];
    for _ in 0..blocks {
        driver.run_block(&views);
    }
}
