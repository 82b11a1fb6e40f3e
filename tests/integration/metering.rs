//! Metering integration tests
//!
//! Ballistics as seen by a polling consumer: hold, fallback, decay to
//! silence, and how callback size changes are followed.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use kmeter::prelude::*;
use kmeter::{BallisticsCoefficients, BLOCK_SIZE_SETTLE_CALLBACKS};

fn coefficients(block_size: usize) -> BallisticsCoefficients {
    BallisticsCoefficients::new(TEST_SAMPLE_RATE, block_size, 0.5, 15.0)
}

fn level(meter: &MeterSystem<OfflineBackend>) -> f32 {
    let mut out = [0.0f32; 1];
    meter.get_levels(&mut out);
    out[0]
}

/// Single impulse, then `holdPeriods` silent blocks, then geometric decay.
#[test]
fn test_impulse_hold_and_fallback() {
    let (meter, driver) = offline_meter(1);
    let c = coefficients(TEST_BLOCK_SIZE);
    let amplitude = 0.5f32;

    driver.run_block(&[&impulse_block(amplitude, 0)]);
    let held = amplitude - c.dc_coeff() * amplitude;
    assert_relative_eq!(level(&meter), held, epsilon = FLOAT_EPSILON);

    run_silence(&driver, 1, c.hold_periods() as usize);
    assert_relative_eq!(level(&meter), held, epsilon = FLOAT_EPSILON);

    for k in 1..=50 {
        run_silence(&driver, 1, 1);
        let expected = held * c.fallback_multiplier().powi(k);
        assert_relative_eq!(level(&meter), expected, epsilon = DSP_EPSILON);
    }
}

#[test]
fn test_silence_decays_to_zero() {
    let (meter, driver) = offline_meter(1);
    let tone = generate_sine(1000.0, 0.9, TEST_BLOCK_SIZE * 40);
    driver.run_signal(&[&tone], TEST_BLOCK_SIZE);
    assert!(level(&meter) > 0.8);

    // 0.5 s hold plus ~9 s of fallback at 15 dB/s reaches -135 dB.
    run_silence(&driver, 1, 1800);
    assert!(level(&meter) < SILENCE_THRESHOLD, "level {}", level(&meter));
}

#[test]
fn test_channels_are_independent() {
    let (meter, driver) = offline_meter(3);
    let tone = generate_sine(440.0, 0.25, TEST_BLOCK_SIZE * 20);
    let noise = generate_noise(TEST_BLOCK_SIZE * 20, 7);
    let silence = generate_silence(TEST_BLOCK_SIZE * 20);
    driver.run_signal(&[&tone, &silence, &noise], TEST_BLOCK_SIZE);

    let mut peaks = [0.0f32; 3];
    assert_eq!(meter.get_levels(&mut peaks), LifecycleState::Processing);
    assert!((peaks[0] - 0.25).abs() < 0.01, "tone peak {}", peaks[0]);
    assert_eq!(peaks[1], 0.0);
    assert!(peaks[2] > 0.9 && peaks[2] <= 2.0, "noise peak {}", peaks[2]);

    let mut rms = [0.0f32; 3];
    meter.get_rms_levels(&mut rms);
    assert_eq!(rms[1], 0.0);
    assert!(rms[0] > 0.0 && rms[0] < peaks[0]);
}

#[test]
fn test_readers_see_same_value_until_next_block() {
    let (meter, driver) = offline_meter(1);
    driver.run_block(&[&impulse_block(0.3, 100)]);
    let first = level(&meter);
    for _ in 0..10 {
        assert_eq!(level(&meter), first);
    }
}

/// Callback size grows from 256 to 512 frames. Once the new size has
/// settled the hold window restarts against the 512-frame period.
#[test]
fn test_block_size_change_restarts_hold() {
    let (meter, driver) = offline_meter(1);
    let short = coefficients(TEST_BLOCK_SIZE);
    let long = coefficients(TEST_BLOCK_SIZE * 2);
    assert!(long.hold_periods() < short.hold_periods() - 10);

    let amplitude = 0.8f32;
    driver.run_block(&[&impulse_block(amplitude, 0)]);
    let held = amplitude - short.dc_coeff() * amplitude;
    run_silence(&driver, 1, 10);

    let silence = generate_silence(TEST_BLOCK_SIZE * 2);
    for _ in 0..BLOCK_SIZE_SETTLE_CALLBACKS - 1 {
        driver.run_block(&[&silence]);
    }
    assert_eq!(meter.engine().block_size(), TEST_BLOCK_SIZE);

    for _ in 0..long.hold_periods() {
        driver.run_block(&[&silence]);
    }
    assert_eq!(meter.engine().block_size(), TEST_BLOCK_SIZE * 2);
    assert_relative_eq!(level(&meter), held, epsilon = FLOAT_EPSILON);

    driver.run_block(&[&silence]);
    assert_relative_eq!(
        level(&meter),
        held * long.fallback_multiplier(),
        epsilon = FLOAT_EPSILON
    );
}

/// Callbacks alternating between 256 and 255 frames keep the configured
/// period, so a held peak still falls back to silence.
#[test]
fn test_jittering_callbacks_still_decay() {
    let (meter, driver) = offline_meter(1);
    driver.run_block(&[&impulse_block(0.8, 0)]);

    let even = generate_silence(TEST_BLOCK_SIZE);
    let odd = generate_silence(TEST_BLOCK_SIZE - 1);
    for i in 0..2000 {
        let block = if i % 2 == 0 { &even } else { &odd };
        driver.run_block(&[block]);
    }

    assert_eq!(meter.engine().block_size(), TEST_BLOCK_SIZE);
    assert!(level(&meter) < SILENCE_THRESHOLD, "level {}", level(&meter));
}

/// A short final block from `run_signal` is metered without reconfiguring.
#[test]
fn test_trailing_partial_block_keeps_period() {
    let (meter, driver) = offline_meter(1);
    let c = coefficients(TEST_BLOCK_SIZE);
    let amplitude = 0.6f32;

    let mut signal = generate_silence(TEST_BLOCK_SIZE * 10 + 100);
    signal[0] = amplitude;
    assert_eq!(driver.run_signal(&[&signal], TEST_BLOCK_SIZE), 11);
    assert_eq!(meter.engine().block_size(), TEST_BLOCK_SIZE);

    // Ten silent periods have passed since the impulse block.
    let held = amplitude - c.dc_coeff() * amplitude;
    run_silence(&driver, 1, c.hold_periods() as usize - 10);
    assert_relative_eq!(level(&meter), held, epsilon = FLOAT_EPSILON);
    run_silence(&driver, 1, 1);
    assert_relative_eq!(
        level(&meter),
        held * c.fallback_multiplier(),
        epsilon = FLOAT_EPSILON
    );
}

/// A period change announced by the audio server applies at once.
#[test]
fn test_reported_period_change_applies_immediately() {
    let (meter, driver) = offline_meter(1);
    let long = coefficients(TEST_BLOCK_SIZE * 2);

    driver.run_block(&[&impulse_block(0.5, 0)]);
    let held = level(&meter);
    assert!(driver.set_block_size(TEST_BLOCK_SIZE * 2));
    assert_eq!(meter.engine().block_size(), TEST_BLOCK_SIZE * 2);

    let silence = generate_silence(TEST_BLOCK_SIZE * 2);
    for _ in 0..=long.hold_periods() {
        driver.run_block(&[&silence]);
    }
    assert_relative_eq!(
        level(&meter),
        held * long.fallback_multiplier(),
        epsilon = FLOAT_EPSILON
    );
}

#[test]
fn test_custom_ballistics() {
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(1)
        .hold_seconds(0.0)
        .fallback_db_per_second(60.0)
        .build_with(backend)
        .unwrap();

    let c = BallisticsCoefficients::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE, 0.0, 60.0);
    assert_eq!(c.hold_periods(), 0);

    driver.run_block(&[&impulse_block(1.0, 0)]);
    let held = level(&meter);
    run_silence(&driver, 1, 1);
    assert_relative_eq!(
        level(&meter),
        held * c.fallback_multiplier(),
        epsilon = FLOAT_EPSILON
    );
}
