//! Meter configuration.

use crate::{Error, Result};
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Upper bound on metered channels.
pub const MAX_CHANNELS: usize = 64;

/// Configuration for a [`MeteringEngine`](crate::MeteringEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Number of input channels, one port each.
    pub channels: usize,
    /// Name under which the backend registers its ports.
    pub client_name: String,
    /// Peak hold time in seconds.
    pub hold_seconds: f32,
    /// Peak fallback rate after the hold expires, in dB per second.
    pub fallback_db_per_second: f32,
    /// Time given to an in-flight callback to finish before ports are released.
    pub shutdown_grace: Duration,
    /// Input device index for hardware backends. `None` = default device.
    pub input_device_index: Option<usize>,
    /// Requested callback block size for hardware backends.
    pub block_size: Option<u32>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            client_name: "meter".to_string(),
            hold_seconds: 0.5,
            fallback_db_per_second: 15.0,
            shutdown_grace: Duration::from_millis(100),
            input_device_index: None,
            block_size: None,
        }
    }
}

impl MeterConfig {
    pub fn with_channels(channels: usize) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-{MAX_CHANNELS})",
                self.channels
            )));
        }
        if !self.hold_seconds.is_finite() || self.hold_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "hold_seconds {} must be finite and >= 0",
                self.hold_seconds
            )));
        }
        if !self.fallback_db_per_second.is_finite() || self.fallback_db_per_second <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "fallback_db_per_second {} must be finite and > 0",
                self.fallback_db_per_second
            )));
        }
        if self.block_size == Some(0) {
            return Err(Error::InvalidConfig("block_size must be > 0".into()));
        }
        Ok(())
    }

    /// Port name for a zero-based channel index (`in_1`, `in_2`, ...).
    pub fn port_name(index: usize) -> String {
        format!("in_{}", index + 1)
    }
}

/// Validate the timing a backend reports before coefficients are derived.
pub(crate) fn validate_timing(sample_rate: u32, block_size: usize) -> Result<()> {
    if !(8000..=384_000).contains(&sample_rate) {
        return Err(Error::InvalidConfig(format!(
            "sample_rate {sample_rate} out of range (8000-384000 Hz)"
        )));
    }
    if block_size == 0 {
        return Err(Error::InvalidConfig("block_size must be > 0".into()));
    }
    Ok(())
}
