//! Metering engine: lifecycle owner and consumer-facing read path.

use crate::callback::{EngineShared, MeterProcessor};
use crate::config::{validate_timing, MeterConfig, MAX_CHANNELS};
use crate::lifecycle::LifecycleState;
use crate::metering::{BallisticsCoefficients, ChannelBank};
use crate::notify::LevelNotifier;
use crate::port::AudioBackend;
use crate::Result;
use core::time::Duration;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Meters N input channels of an [`AudioBackend`].
///
/// Construction never fails: a setup error leaves the engine in
/// [`LifecycleState::Failed`] and every read reports that state. The caller
/// decides whether to build a new engine.
///
/// # Example
/// ```ignore
/// let engine = MeteringEngine::new(backend, &MeterConfig::with_channels(4));
/// let mut peaks = [0.0f32; 4];
/// while engine.get_levels(&mut peaks) == LifecycleState::Processing {
///     draw(&peaks);
///     std::thread::sleep(Duration::from_millis(25));
/// }
/// ```
pub struct MeteringEngine<B: AudioBackend> {
    backend: Option<B>,
    shared: Arc<EngineShared>,
    notifier: Option<Arc<dyn LevelNotifier>>,
    port_names: Vec<String>,
    sample_rate: u32,
    nominal_block_size: usize,
    shutdown_grace: Duration,
    setup_error: Option<String>,
}

impl<B: AudioBackend> MeteringEngine<B> {
    /// Polling-only engine.
    pub fn new(backend: B, config: &MeterConfig) -> Self {
        Self::with_notifier(backend, config, None)
    }

    /// Engine that signals `notifier` after every metered block.
    pub fn with_notifier(
        backend: B,
        config: &MeterConfig,
        notifier: Option<Arc<dyn LevelNotifier>>,
    ) -> Self {
        let channels = config.channels.min(MAX_CHANNELS);
        let mut engine = Self {
            sample_rate: backend.sample_rate(),
            nominal_block_size: backend.block_size(),
            backend: None,
            shared: Arc::new(EngineShared::new(channels, backend.block_size())),
            notifier,
            port_names: Vec::with_capacity(channels),
            shutdown_grace: config.shutdown_grace,
            setup_error: None,
        };

        match engine.setup(backend, config) {
            Ok(()) => {
                tracing::info!(
                    client = %config.client_name,
                    channels,
                    sample_rate = engine.sample_rate,
                    block_size = engine.nominal_block_size,
                    "metering engine processing"
                );
            }
            Err(e) => {
                tracing::warn!(client = %config.client_name, "metering setup failed: {e}");
                engine.shared.state.fail();
                engine.setup_error = Some(e.to_string());
            }
        }

        engine
    }

    fn setup(&mut self, mut backend: B, config: &MeterConfig) -> Result<()> {
        config.validate()?;
        validate_timing(self.sample_rate, self.nominal_block_size)?;

        let channels = config.channels;
        let coeffs = BallisticsCoefficients::new(
            self.sample_rate,
            self.nominal_block_size,
            config.hold_seconds,
            config.fallback_db_per_second,
        );

        let mut ports = Vec::with_capacity(channels);
        for index in 0..channels {
            let name = MeterConfig::port_name(index);
            let port = backend.register_input_port(index, &name)?;
            tracing::debug!(index, %name, "registered input port");
            ports.push(port);
            self.port_names.push(name);
        }

        let shutdown_shared = Arc::clone(&self.shared);
        backend.on_shutdown(Box::new(move || {
            shutdown_shared.state.sever();
        }));

        let processor = MeterProcessor::new(
            ChannelBank::new(channels, coeffs),
            ports,
            Arc::clone(&self.shared),
            self.notifier.clone(),
        );
        backend.activate(processor)?;
        self.backend = Some(backend);

        // A severance during activation wins over entering Processing.
        if !self
            .shared
            .state
            .transition(LifecycleState::Initial, LifecycleState::Processing)
        {
            tracing::warn!(state = %self.state(), "connection lost during activation");
        }

        Ok(())
    }

    /// Copy the latest peak levels into `out` and return the current state.
    ///
    /// Reflects the most recently completed callback; poll at a bounded rate
    /// (30-40 Hz is plenty for a display). A `Failed` engine leaves `out`
    /// untouched.
    pub fn get_levels(&self, out: &mut [f32]) -> LifecycleState {
        let state = self.state();
        if state != LifecycleState::Failed {
            self.shared.peaks.copy_into(out);
        }
        state
    }

    /// Like [`get_levels`](Self::get_levels), for the ballistic RMS readings.
    pub fn get_rms_levels(&self, out: &mut [f32]) -> LifecycleState {
        let state = self.state();
        if state != LifecycleState::Failed {
            self.shared.rms.copy_into(out);
        }
        state
    }

    /// Wait for the next publish (or `timeout`), then copy the peak levels.
    ///
    /// Returns whether a notification was consumed. Without a notifier this
    /// sleeps for `timeout` and polls. Terminal states return immediately.
    pub fn wait_levels(&self, timeout: Duration, out: &mut [f32]) -> (bool, LifecycleState) {
        if self.state().is_terminal() {
            return (false, self.get_levels(out));
        }

        let woke = match &self.notifier {
            Some(notifier) => notifier.wait_and_consume(timeout),
            None => {
                std::thread::sleep(timeout);
                false
            }
        };

        (woke, self.get_levels(out))
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state.get()
    }

    /// Stop metering without tearing down the connection.
    pub fn pause(&self) -> bool {
        self.shared
            .state
            .transition(LifecycleState::Processing, LifecycleState::Passive)
    }

    pub fn resume(&self) -> bool {
        self.shared
            .state
            .transition(LifecycleState::Passive, LifecycleState::Processing)
    }

    pub fn channel_count(&self) -> usize {
        self.shared.peaks.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Period the ballistics are currently computed for.
    ///
    /// Starts at the backend's nominal block size and follows settled changes
    /// in the callback size.
    pub fn block_size(&self) -> usize {
        self.shared.block_size.load(Ordering::Relaxed)
    }

    pub fn port_names(&self) -> &[String] {
        &self.port_names
    }

    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    pub fn notifier(&self) -> Option<&Arc<dyn LevelNotifier>> {
        self.notifier.as_ref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Leave `Processing`, let an in-flight callback drain, then release ports.
    pub fn close(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };

        let stopped = self
            .shared
            .state
            .transition(LifecycleState::Processing, LifecycleState::Initial)
            || self
                .shared
                .state
                .transition(LifecycleState::Passive, LifecycleState::Initial);

        if stopped {
            std::thread::sleep(self.shutdown_grace);
        }

        backend.deactivate();
        tracing::info!(state = %self.state(), "metering engine closed");
    }
}

impl<B: AudioBackend> Drop for MeteringEngine<B> {
    fn drop(&mut self) {
        self.close();
    }
}
