//! Lifecycle integration tests
//!
//! Failed and Zombie are terminal and must be observable through every read.

use crate::helpers::*;
use kmeter::prelude::*;

#[test]
fn test_meter_starts_processing() {
    let (meter, driver) = offline_meter(2);
    assert_eq!(meter.state(), LifecycleState::Processing);
    assert!(driver.is_active());
    assert_eq!(meter.engine().port_names(), ["in_1", "in_2"]);
}

/// Port registration fails part way: Failed, and it never leaves Failed.
#[test]
fn test_unavailable_port_is_failed_forever() {
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE).with_available_ports(1);
    let driver = backend.driver();
    let meter = test_builder(2).build_with(backend).unwrap();

    assert_eq!(meter.state(), LifecycleState::Failed);
    assert!(meter.engine().setup_error().is_some());
    assert!(!driver.is_active());

    let block = impulse_block(0.9, 0);
    let mut out = [-1.0f32; 2];
    for _ in 0..5 {
        driver.run_block(&[&block, &block]);
        assert_eq!(meter.get_levels(&mut out), LifecycleState::Failed);
    }
    assert_eq!(out, [-1.0, -1.0]);

    let (woke, state) = meter.wait_levels(Duration::from_secs(5), &mut out);
    assert!(!woke);
    assert_eq!(state, LifecycleState::Failed);
}

/// Audio server goes away while processing: Zombie, no further mutation.
#[test]
fn test_shutdown_while_processing_is_zombie() {
    let (meter, driver) = offline_meter(1);

    let block = impulse_block(0.5, 3);
    driver.run_block(&[&block]);
    let mut before = [0.0f32; 1];
    assert_eq!(meter.get_levels(&mut before), LifecycleState::Processing);
    assert!(before[0] > 0.4);

    driver.shutdown();

    let mut out = [0.0f32; 1];
    assert_eq!(meter.get_levels(&mut out), LifecycleState::Zombie);

    let loud = impulse_block(1.0, 0);
    for _ in 0..200 {
        driver.run_block(&[&loud]);
    }
    assert_eq!(meter.get_levels(&mut out), LifecycleState::Zombie);
    assert_eq!(out, before);
}

#[test]
fn test_zombie_wait_returns_immediately() {
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(1).local_notifier().build_with(backend).unwrap();

    driver.shutdown();

    let start = std::time::Instant::now();
    let mut out = [0.0f32; 1];
    let (woke, state) = meter.wait_levels(Duration::from_secs(10), &mut out);
    assert!(!woke);
    assert_eq!(state, LifecycleState::Zombie);
    assert!(start.elapsed() < Duration::from_secs(1));
}

/// Teardown leaves Processing before the backend is released.
#[test]
fn test_close_releases_backend() {
    let (mut meter, driver) = offline_meter(2);
    meter.close();

    assert_eq!(meter.state(), LifecycleState::Initial);
    assert!(!driver.is_active());
    assert!(!driver.run_block(&[&impulse_block(1.0, 0), &impulse_block(1.0, 0)]));

    // The shutdown callback went away with the backend.
    driver.shutdown();
    assert_eq!(meter.state(), LifecycleState::Initial);
}

#[test]
fn test_drop_releases_backend() {
    let (meter, driver) = offline_meter(1);
    drop(meter);
    assert!(!driver.is_active());
}

#[test]
fn test_pause_stops_metering() {
    let (meter, driver) = offline_meter(1);
    assert!(meter.engine().pause());

    driver.run_block(&[&impulse_block(0.7, 0)]);
    let mut out = [0.0f32; 1];
    assert_eq!(meter.get_levels(&mut out), LifecycleState::Passive);
    assert_eq!(out[0], 0.0);

    assert!(meter.engine().resume());
    driver.run_block(&[&impulse_block(0.7, 0)]);
    assert_eq!(meter.get_levels(&mut out), LifecycleState::Processing);
    assert!(out[0] > 0.6);
}
