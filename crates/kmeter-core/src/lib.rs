//! Real-time peak metering kernel.
//!
//! Taps N input channels inside an audio callback, runs per-channel peak
//! ballistics and publishes the levels to non-realtime readers without
//! locking or allocating on the audio thread.
//!
//! # Primary API
//!
//! - [`MeteringEngine`]: lifecycle owner and consumer read path
//! - [`MeterProcessor`]: the half that lives in the audio callback
//! - [`BallisticsFilter`] / [`ChannelBank`]: per-channel DSP
//! - [`AudioBackend`]: seam to the audio server ([`OfflineBackend`], `CpalBackend`)
//! - [`LevelNotifier`]: optional wake-up path for consumers
//!
//! # Example
//!
//! ```ignore
//! use kmeter_core::*;
//!
//! let backend = CpalBackend::new(&config)?;
//! let engine = MeteringEngine::new(backend, &config);
//!
//! let mut peaks = vec![0.0; engine.channel_count()];
//! while engine.get_levels(&mut peaks) == LifecycleState::Processing {
//!     // apply display policy
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{MeterConfig, MAX_CHANNELS};

mod lifecycle;
pub use lifecycle::{AtomicLifecycle, LifecycleState};

pub mod metering;
pub use metering::{
    AtomicFloat, BallisticsCoefficients, BallisticsFilter, ChannelBank, LevelSlots,
    BLOCK_SIZE_SETTLE_CALLBACKS,
};

mod port;
pub use port::{AudioBackend, BlockSource, PortHandle, ShutdownCallback};

mod notify;
pub use notify::LevelNotifier;

mod callback;
pub use callback::MeterProcessor;

mod engine;
pub use engine::MeteringEngine;

mod offline;
pub use offline::{OfflineBackend, OfflineDriver};

#[cfg(feature = "cpal")]
mod input;
#[cfg(feature = "cpal")]
pub use input::CpalBackend;
