//! Per-channel peak ballistics (DC removal, ballistic smoothing, peak hold, fallback).

/// DC filter corner, as `2π · 5 Hz` expressed per sample.
const DC_CORNER: f32 = 5.0 * 6.28;

/// Ballistic time constant of the cascaded RMS filter, per sample.
const RMS_CORNER: f32 = 9.72;

/// Coefficients shared by every channel of a bank.
///
/// Recomputed whenever the sample rate or the callback block size changes.
/// Construction is allocation-free, so it may run on the audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticsCoefficients {
    pub(crate) dc_coeff: f32,
    pub(crate) rms_coeff: f32,
    pub(crate) hold_periods: u32,
    pub(crate) fallback_multiplier: f32,
    sample_rate: u32,
    block_size: usize,
    hold_seconds: f32,
    fallback_db_per_second: f32,
}

impl BallisticsCoefficients {
    /// # Arguments
    /// * `sample_rate` - Sample frequency in Hz (non-zero)
    /// * `block_size` - Frames per callback (non-zero)
    /// * `hold_seconds` - Peak hold time
    /// * `fallback_db_per_second` - Peak fallback rate after the hold expires
    pub fn new(
        sample_rate: u32,
        block_size: usize,
        hold_seconds: f32,
        fallback_db_per_second: f32,
    ) -> Self {
        let fs = sample_rate as f32;
        let period = block_size as f32 / fs;

        Self {
            dc_coeff: DC_CORNER / fs,
            rms_coeff: RMS_CORNER / fs,
            hold_periods: (hold_seconds / period + 0.5) as u32,
            fallback_multiplier: 10.0f32.powf(-0.05 * fallback_db_per_second * period),
            sample_rate,
            block_size,
            hold_seconds,
            fallback_db_per_second,
        }
    }

    /// Same timing parameters, new period length.
    #[inline]
    pub fn with_block_size(&self, block_size: usize) -> Self {
        Self::new(
            self.sample_rate,
            block_size,
            self.hold_seconds,
            self.fallback_db_per_second,
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of periods a new peak is held before it starts to fall.
    pub fn hold_periods(&self) -> u32 {
        self.hold_periods
    }

    /// Per-period decay factor, in (0, 1) for a positive fallback rate.
    pub fn fallback_multiplier(&self) -> f32 {
        self.fallback_multiplier
    }

    pub fn dc_coeff(&self) -> f32 {
        self.dc_coeff
    }

    pub fn rms_coeff(&self) -> f32 {
        self.rms_coeff
    }
}

/// Peak meter state for one channel.
///
/// `process` runs on the audio thread once per block; it never allocates and
/// runs in time linear in the block length.
#[derive(Debug, Clone, Default)]
pub struct BallisticsFilter {
    /// DC offset estimate.
    z0: f32,
    /// First and second ballistic stages over the squared signal.
    z1: f32,
    z2: f32,
    /// Displayed digital peak.
    peak: f32,
    hold_counter: u32,
}

impl BallisticsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one block of samples and update the held peak.
    #[inline]
    pub fn process(&mut self, coeffs: &BallisticsCoefficients, samples: &[f32]) {
        let mut block_peak = 0.0f32;

        for &sample in samples {
            self.z0 += coeffs.dc_coeff * (sample - self.z0);
            let s = sample - self.z0;
            let sq = s * s;
            if sq > block_peak {
                block_peak = sq;
            }
            self.z1 += coeffs.rms_coeff * (sq - self.z1);
            self.z2 += coeffs.rms_coeff * (self.z1 - self.z2);
        }

        let inst = block_peak.sqrt();

        if inst > self.peak {
            self.peak = inst;
            self.hold_counter = coeffs.hold_periods;
        } else if self.hold_counter > 0 {
            self.hold_counter -= 1;
        } else {
            self.peak *= coeffs.fallback_multiplier;
        }
    }

    /// Current held peak (linear, >= 0).
    #[inline]
    pub fn read(&self) -> f32 {
        self.peak
    }

    /// Ballistic RMS reading derived from the second filter stage.
    #[inline]
    pub fn rms(&self) -> f32 {
        (2.0 * self.z2).sqrt()
    }

    /// Restart the hold window against a new period length.
    #[inline]
    pub fn restart_hold(&mut self, coeffs: &BallisticsCoefficients) {
        self.hold_counter = coeffs.hold_periods;
    }

    pub fn hold_counter(&self) -> u32 {
        self.hold_counter
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
