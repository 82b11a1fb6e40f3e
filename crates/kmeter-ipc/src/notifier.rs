//! [`LevelNotifier`] backed by a [`MeterRecord`].

use crate::error::Result;
use crate::record::{LevelSnapshot, MeterRecord};
use crate::shared_memory::SharedLevelMap;
use kmeter_core::LevelNotifier;
use std::time::Duration;

enum Storage {
    Local(Box<MeterRecord>),
    Shared(SharedLevelMap),
}

/// Wakes a consumer after every metered block.
///
/// The producer side (the audio callback) never blocks: publishes that land
/// while a notification is still pending collapse into it, and the consumer
/// reads whatever levels are current when it wakes.
///
/// # Example
/// ```ignore
/// let notifier = Arc::new(CrossBoundaryNotifier::create_shared("desk")?);
/// let engine = MeteringEngine::with_notifier(backend, &config, Some(notifier));
///
/// // elsewhere, possibly another process:
/// let consumer = CrossBoundaryNotifier::open_shared("desk")?;
/// while let Some(snapshot) = consumer.wait_snapshot(Duration::from_millis(100)) {
///     draw(&snapshot.levels);
/// }
/// ```
pub struct CrossBoundaryNotifier {
    storage: Storage,
}

impl CrossBoundaryNotifier {
    /// Notifier for a consumer thread in the same process.
    pub fn local() -> Self {
        Self {
            storage: Storage::Local(Box::new(MeterRecord::new())),
        }
    }

    pub fn shared(map: SharedLevelMap) -> Self {
        Self {
            storage: Storage::Shared(map),
        }
    }

    /// Producer side: create the named shared record.
    pub fn create_shared(name: &str) -> Result<Self> {
        Ok(Self::shared(SharedLevelMap::create(name)?))
    }

    /// Consumer side: attach to a record created by the producer.
    pub fn open_shared(name: &str) -> Result<Self> {
        Ok(Self::shared(SharedLevelMap::open(name)?))
    }

    #[inline]
    pub fn record(&self) -> &MeterRecord {
        match &self.storage {
            Storage::Local(record) => record.as_ref(),
            Storage::Shared(map) => map.record(),
        }
    }

    /// The shared mapping, if this notifier crosses a process boundary.
    pub fn shared_map(&self) -> Option<&SharedLevelMap> {
        match &self.storage {
            Storage::Local(_) => None,
            Storage::Shared(map) => Some(map),
        }
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        self.record().snapshot()
    }

    /// Wait for a notification and return the levels it announced.
    pub fn wait_snapshot(&self, timeout: Duration) -> Option<LevelSnapshot> {
        self.record()
            .wait_and_consume(timeout)
            .then(|| self.snapshot())
    }
}

impl LevelNotifier for CrossBoundaryNotifier {
    #[inline]
    fn store_level(&self, channel: usize, level: f32) {
        self.record().store_level(channel, level);
    }

    #[inline]
    fn publish(&self) {
        self.record().publish();
    }

    fn wait_and_consume(&self, timeout: Duration) -> bool {
        self.record().wait_and_consume(timeout)
    }
}

impl core::fmt::Debug for CrossBoundaryNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match &self.storage {
            Storage::Local(_) => "local",
            Storage::Shared(_) => "shared",
        };
        f.debug_struct("CrossBoundaryNotifier")
            .field("kind", &kind)
            .field("record", self.record())
            .finish()
    }
}
