//! Realtime half of the metering engine (runs inside the audio callback).

use crate::lifecycle::{AtomicLifecycle, LifecycleState};
use crate::metering::{ChannelBank, LevelSlots};
use crate::notify::LevelNotifier;
use crate::port::{BlockSource, PortHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// State shared between the audio callback and the engine's readers.
pub(crate) struct EngineShared {
    pub(crate) state: AtomicLifecycle,
    pub(crate) peaks: LevelSlots,
    pub(crate) rms: LevelSlots,
    /// Period the coefficients are currently computed for.
    pub(crate) block_size: AtomicUsize,
}

impl EngineShared {
    pub(crate) fn new(channels: usize, block_size: usize) -> Self {
        Self {
            state: AtomicLifecycle::new(LifecycleState::Initial),
            peaks: LevelSlots::new(channels),
            rms: LevelSlots::new(channels),
            block_size: AtomicUsize::new(block_size),
        }
    }
}

/// Owned by the backend's audio callback.
///
/// `process_block` never allocates, locks or blocks; everything it needs is
/// sized when the engine builds it.
pub struct MeterProcessor {
    bank: ChannelBank,
    ports: Vec<PortHandle>,
    shared: Arc<EngineShared>,
    notifier: Option<Arc<dyn LevelNotifier>>,
}

impl MeterProcessor {
    pub(crate) fn new(
        bank: ChannelBank,
        ports: Vec<PortHandle>,
        shared: Arc<EngineShared>,
        notifier: Option<Arc<dyn LevelNotifier>>,
    ) -> Self {
        debug_assert_eq!(bank.len(), ports.len());
        Self {
            bank,
            ports,
            shared,
            notifier,
        }
    }

    /// Meter one block. No-op unless the engine is `Processing`.
    #[inline]
    pub fn process_block<S: BlockSource + ?Sized>(&mut self, source: &S, frames: usize) {
        if frames == 0 || !self.shared.state.is_processing() {
            return;
        }

        // Recompute hold/fallback only once a new period has settled.
        if self.bank.observe_block_size(frames) {
            self.shared.block_size.store(frames, Ordering::Relaxed);
        }

        for (channel, &port) in self.ports.iter().enumerate() {
            self.bank.process(channel, source.block_buffer(port, frames));
        }

        self.publish();
    }

    #[inline]
    fn publish(&self) {
        for channel in 0..self.bank.len() {
            let peak = self.bank.read(channel);
            self.shared.peaks.store(channel, peak);
            self.shared.rms.store(channel, self.bank.rms(channel));
            if let Some(notifier) = &self.notifier {
                notifier.store_level(channel, peak);
            }
        }

        if let Some(notifier) = &self.notifier {
            notifier.publish();
        }
    }

    /// The audio server reported a new period: reconfigure immediately.
    #[inline]
    pub fn set_block_size(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        self.bank.set_block_size(frames);
        self.shared.block_size.store(frames, Ordering::Relaxed);
    }

    /// Mark the connection as severed from inside the audio thread.
    #[inline]
    pub fn sever(&self) {
        self.shared.state.sever();
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state.get()
    }

    pub fn channel_count(&self) -> usize {
        self.bank.len()
    }

    pub fn ports(&self) -> &[PortHandle] {
        &self.ports
    }

    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }
}
