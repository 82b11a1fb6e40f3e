//! `MeterSystem`: a metering engine wired to its notifier.

use crate::Result;
use kmeter_core::{AudioBackend, LevelNotifier, LifecycleState, MeterConfig, MeteringEngine};
use kmeter_ipc::{CrossBoundaryNotifier, LevelSnapshot};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "cpal")]
use kmeter_core::CpalBackend;

/// Metering engine plus the notifier its callback publishes into.
///
/// # Example
///
/// ```ignore
/// use kmeter::prelude::*;
///
/// let meter = MeterSystem::builder()
///     .channels(2)
///     .local_notifier()
///     .build()?;
///
/// let mut peaks = [0.0f32; 2];
/// loop {
///     let (_, state) = meter.wait_levels(Duration::from_millis(100), &mut peaks);
///     if state.is_terminal() {
///         break;
///     }
/// }
/// ```
pub struct MeterSystem<B: AudioBackend> {
    engine: MeteringEngine<B>,
    notifier: Option<Arc<CrossBoundaryNotifier>>,
}

// Concrete impl so `MeterSystem::builder()` needs no type annotation; the
// backend type is fixed by `build` / `build_with`.
impl MeterSystem<kmeter_core::OfflineBackend> {
    pub fn builder() -> MeterSystemBuilder {
        MeterSystemBuilder::default()
    }
}

impl<B: AudioBackend> MeterSystem<B> {
    /// Copy the latest peaks into `out` and return the lifecycle state.
    pub fn get_levels(&self, out: &mut [f32]) -> LifecycleState {
        self.engine.get_levels(out)
    }

    pub fn get_rms_levels(&self, out: &mut [f32]) -> LifecycleState {
        self.engine.get_rms_levels(out)
    }

    /// Block until the next published block (or `timeout`), then copy the peaks.
    pub fn wait_levels(&self, timeout: Duration, out: &mut [f32]) -> (bool, LifecycleState) {
        self.engine.wait_levels(timeout, out)
    }

    /// Levels currently mirrored in the notifier record, if any.
    pub fn snapshot(&self) -> Option<LevelSnapshot> {
        self.notifier.as_ref().map(|n| n.snapshot())
    }

    pub fn state(&self) -> LifecycleState {
        self.engine.state()
    }

    pub fn channel_count(&self) -> usize {
        self.engine.channel_count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    pub fn engine(&self) -> &MeteringEngine<B> {
        &self.engine
    }

    pub fn notifier(&self) -> Option<&Arc<CrossBoundaryNotifier>> {
        self.notifier.as_ref()
    }

    /// Stop metering and release the backend. Also runs on drop.
    pub fn close(&mut self) {
        self.engine.close();
    }
}

enum NotifierChoice {
    None,
    Local,
    Shared(String),
    Existing(Arc<CrossBoundaryNotifier>),
}

/// Builder for [`MeterSystem`].
///
/// Setup failures of the engine itself do not fail the build: the returned
/// system reports [`LifecycleState::Failed`]. Only notifier creation errors
/// are returned.
pub struct MeterSystemBuilder {
    config: MeterConfig,
    notifier: NotifierChoice,
}

impl Default for MeterSystemBuilder {
    fn default() -> Self {
        Self {
            config: MeterConfig::default(),
            notifier: NotifierChoice::None,
        }
    }
}

impl MeterSystemBuilder {
    /// Number of metered input channels (default: 2).
    pub fn channels(mut self, count: usize) -> Self {
        self.config.channels = count;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Peak hold time in seconds (default: 0.5).
    pub fn hold_seconds(mut self, seconds: f32) -> Self {
        self.config.hold_seconds = seconds;
        self
    }

    /// Peak fallback rate after the hold expires (default: 15 dB/s).
    pub fn fallback_db_per_second(mut self, rate: f32) -> Self {
        self.config.fallback_db_per_second = rate;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Input device index (CPAL only; default device otherwise).
    pub fn input_device(mut self, index: usize) -> Self {
        self.config.input_device_index = Some(index);
        self
    }

    /// Request a fixed callback size from the device (CPAL only).
    pub fn block_size(mut self, frames: u32) -> Self {
        self.config.block_size = Some(frames);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MeterConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish into an existing notifier.
    pub fn notifier(mut self, notifier: Arc<CrossBoundaryNotifier>) -> Self {
        self.notifier = NotifierChoice::Existing(notifier);
        self
    }

    /// Wake consumer threads in this process.
    pub fn local_notifier(mut self) -> Self {
        self.notifier = NotifierChoice::Local;
        self
    }

    /// Publish into the named shared record so other processes can follow.
    pub fn shared_notifier(mut self, name: impl Into<String>) -> Self {
        self.notifier = NotifierChoice::Shared(name.into());
        self
    }

    /// Build on the default (or selected) CPAL input device.
    #[cfg(feature = "cpal")]
    pub fn build(self) -> Result<MeterSystem<CpalBackend>> {
        let backend = CpalBackend::new(&self.config)?;
        self.build_with(backend)
    }

    /// Build on an explicit backend.
    pub fn build_with<B: AudioBackend>(self, backend: B) -> Result<MeterSystem<B>> {
        let notifier = match self.notifier {
            NotifierChoice::None => None,
            NotifierChoice::Local => Some(Arc::new(CrossBoundaryNotifier::local())),
            NotifierChoice::Shared(name) => {
                let notifier = CrossBoundaryNotifier::create_shared(&name)?;
                tracing::info!(%name, "publishing levels to shared record");
                Some(Arc::new(notifier))
            }
            NotifierChoice::Existing(notifier) => Some(notifier),
        };

        let level_notifier = notifier
            .as_ref()
            .map(|n| Arc::clone(n) as Arc<dyn LevelNotifier>);
        let engine = MeteringEngine::with_notifier(backend, &self.config, level_notifier);

        Ok(MeterSystem { engine, notifier })
    }
}
