//! Notification integration tests
//!
//! Wake-driven consumers: coalescing, consumer threads, and the shared
//! record a second process would map.

use crate::helpers::*;
use kmeter::prelude::*;
use kmeter::{SharedLevelMap, RECORD_CHANNELS};
use std::sync::Arc;

fn unique_name(tag: &str) -> String {
    format!("it_{tag}_{}", std::process::id())
}

/// Two blocks published before the consumer wakes: one wake, latest levels.
#[test]
fn test_publishes_coalesce_to_latest() {
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(1).local_notifier().build_with(backend).unwrap();

    driver.run_block(&[&impulse_block(0.3, 0)]);
    driver.run_block(&[&impulse_block(0.9, 0)]);

    let mut out = [0.0f32; 1];
    let (woke, state) = meter.wait_levels(Duration::from_millis(100), &mut out);
    assert!(woke);
    assert_eq!(state, LifecycleState::Processing);
    assert!(out[0] > 0.85);
    assert_eq!(meter.snapshot().unwrap().levels[0], out[0]);

    let (woke, _) = meter.wait_levels(Duration::from_millis(10), &mut out);
    assert!(!woke);
}

#[test]
fn test_consumer_thread_wakes_per_block() {
    let notifier = Arc::new(CrossBoundaryNotifier::local());
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(2)
        .notifier(Arc::clone(&notifier))
        .build_with(backend)
        .unwrap();
    assert!(Arc::ptr_eq(meter.notifier().unwrap(), &notifier));

    let consumer = std::thread::spawn(move || {
        let mut wakes = 0;
        let mut last = None;
        while let Some(snapshot) = notifier.wait_snapshot(Duration::from_millis(500)) {
            wakes += 1;
            last = Some(snapshot);
            if snapshot.levels[1] > 0.5 {
                break;
            }
        }
        (wakes, last)
    });

    let quiet = impulse_block(0.1, 0);
    let loud = impulse_block(0.75, 0);
    for _ in 0..5 {
        driver.run_block(&[&quiet, &quiet]);
        std::thread::sleep(Duration::from_millis(2));
    }
    driver.run_block(&[&quiet, &loud]);

    let (wakes, last) = consumer.join().unwrap();
    assert!(wakes >= 1);
    let last = last.unwrap();
    let mut out = [0.0f32; 2];
    meter.get_levels(&mut out);
    assert_eq!(last.levels[..2], out);
    assert_eq!(last.levels[2..], [0.0, 0.0]);
}

/// The record mirrors the first four channels; the rest are in-process only.
#[test]
fn test_shared_record_mirrors_first_channels() {
    let name = unique_name("mirror");
    let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
    let driver = backend.driver();
    let meter = test_builder(6)
        .shared_notifier(name.clone())
        .build_with(backend)
        .unwrap();

    let consumer = CrossBoundaryNotifier::open_shared(&name).unwrap();
    assert_eq!(consumer.record().owner(), u64::from(std::process::id()));

    let blocks: Vec<Vec<f32>> = (0..6)
        .map(|ch| impulse_block(0.1 * (ch + 1) as f32, ch))
        .collect();
    let views: Vec<&[f32]> = blocks.iter().map(Vec::as_slice).collect();
    driver.run_block(&views);

    let snapshot = consumer
        .wait_snapshot(Duration::from_millis(100))
        .expect("published");
    let mut out = [0.0f32; 6];
    meter.get_levels(&mut out);
    assert_eq!(snapshot.levels, out[..RECORD_CHANNELS]);
    assert!(out[5] > out[4]);
}

#[test]
fn test_shared_record_removed_with_meter() {
    let name = unique_name("cleanup");
    let (meter, _driver) = {
        let backend = OfflineBackend::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE);
        let driver = backend.driver();
        let meter = test_builder(1)
            .shared_notifier(name.clone())
            .build_with(backend)
            .unwrap();
        (meter, driver)
    };
    assert!(SharedLevelMap::open(&name).is_ok());

    drop(meter);
    assert!(SharedLevelMap::open(&name).is_err());
}
