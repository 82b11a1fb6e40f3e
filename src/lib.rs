//! # kmeter - Real-time audio peak meter
//!
//! Meters N input channels of an audio server with K-meter style ballistics
//! (DC removal, peak hold, dB/s fallback) and hands the levels to a display
//! or another process without blocking the audio thread.
//!
//! ## Architecture
//!
//! - **kmeter-core** - Ballistics, channel bank, lifecycle, metering engine, backends
//! - **kmeter-ipc** - Cross-boundary notifier, shared level record, `kmeter-monitor`
//!
//! ## Quick Start
//!
//! ```ignore
//! use kmeter::prelude::*;
//!
//! let mut meter = MeterSystem::builder()
//!     .channels(2)
//!     .hold_seconds(0.5)
//!     .fallback_db_per_second(15.0)
//!     .local_notifier()
//!     .build()?;
//!
//! let mut peaks = [0.0f32; 2];
//! while !meter.wait_levels(Duration::from_millis(100), &mut peaks).1.is_terminal() {
//!     // draw peaks
//! }
//! meter.close();
//! ```
//!
//! ## Feature Flags
//!
//! - `cpal` (default) - Meter a CPAL input device

/// Re-export of kmeter-core for direct access
pub use kmeter_core as core;

/// Re-export of kmeter-ipc for direct access
pub use kmeter_ipc as ipc;

pub use kmeter_core::{
    AudioBackend, BallisticsCoefficients, BallisticsFilter, BlockSource, ChannelBank,
    LevelNotifier, LifecycleState, MeterConfig, MeterProcessor, MeteringEngine, OfflineBackend,
    OfflineDriver, PortHandle, BLOCK_SIZE_SETTLE_CALLBACKS, MAX_CHANNELS,
};

#[cfg(feature = "cpal")]
pub use kmeter_core::CpalBackend;

pub use kmeter_ipc::{CrossBoundaryNotifier, LevelSnapshot, SharedLevelMap, RECORD_CHANNELS};

mod error;
pub use error::{Error, Result};

mod system;
pub use system::{MeterSystem, MeterSystemBuilder};

pub mod prelude {
    pub use crate::{
        CrossBoundaryNotifier, Error, LevelNotifier, LevelSnapshot, LifecycleState, MeterConfig,
        MeterSystem, MeterSystemBuilder, OfflineBackend, Result,
    };

    #[cfg(feature = "cpal")]
    pub use crate::CpalBackend;

    pub use std::time::Duration;
}
