//! Fixed-size bank of per-channel ballistics filters.

use super::{BallisticsCoefficients, BallisticsFilter};

/// Consecutive callbacks a new size must be seen for before the bank
/// reconfigures to it. Jittering or split callbacks never get there.
pub const BLOCK_SIZE_SETTLE_CALLBACKS: u32 = 8;

/// One [`BallisticsFilter`] per input channel plus the coefficients they share.
///
/// Sized once at construction. Owned by the audio callback, so the coefficients
/// can be swapped without any synchronization.
#[derive(Debug, Clone)]
pub struct ChannelBank {
    filters: Vec<BallisticsFilter>,
    coeffs: BallisticsCoefficients,
    /// Candidate period and how many callbacks in a row it has been seen.
    pending_block_size: usize,
    pending_count: u32,
}

impl ChannelBank {
    pub fn new(channels: usize, coeffs: BallisticsCoefficients) -> Self {
        Self {
            filters: vec![BallisticsFilter::new(); channels],
            coeffs,
            pending_block_size: 0,
            pending_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn coefficients(&self) -> &BallisticsCoefficients {
        &self.coeffs
    }

    pub fn block_size(&self) -> usize {
        self.coeffs.block_size()
    }

    /// Install new coefficients and restart every channel's hold window.
    ///
    /// RT-safe: no allocation.
    pub fn configure(&mut self, coeffs: BallisticsCoefficients) {
        self.coeffs = coeffs;
        for filter in &mut self.filters {
            filter.restart_hold(&self.coeffs);
        }
    }

    /// Recompute the coefficients for a new callback period, if it changed.
    ///
    /// For backends that are told about a period change by the audio server.
    #[inline]
    pub fn set_block_size(&mut self, block_size: usize) {
        self.pending_count = 0;
        if block_size != self.coeffs.block_size() {
            self.configure(self.coeffs.with_block_size(block_size));
        }
    }

    /// Track the frame count of each callback and reconfigure once a new
    /// size has held for [`BLOCK_SIZE_SETTLE_CALLBACKS`] callbacks in a row.
    ///
    /// Blocks of other sizes are metered with the current coefficients.
    /// Returns true if the bank was reconfigured.
    #[inline]
    pub fn observe_block_size(&mut self, frames: usize) -> bool {
        if frames == self.coeffs.block_size() {
            self.pending_count = 0;
            return false;
        }

        if frames != self.pending_block_size {
            self.pending_block_size = frames;
            self.pending_count = 0;
        }
        self.pending_count += 1;

        if self.pending_count < BLOCK_SIZE_SETTLE_CALLBACKS {
            return false;
        }
        self.set_block_size(frames);
        true
    }

    #[inline]
    pub fn process(&mut self, channel: usize, samples: &[f32]) {
        self.filters[channel].process(&self.coeffs, samples);
    }

    #[inline]
    pub fn read(&self, channel: usize) -> f32 {
        self.filters[channel].read()
    }

    #[inline]
    pub fn rms(&self, channel: usize) -> f32 {
        self.filters[channel].rms()
    }

    pub fn filter(&self, channel: usize) -> Option<&BallisticsFilter> {
        self.filters.get(channel)
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}
