//! Peak metering.
//!
//! - [`BallisticsFilter`]: per-channel DSP state
//! - [`ChannelBank`]: one filter per channel plus shared coefficients
//! - [`LevelSlots`]: lock-free published levels for non-realtime readers

mod ballistics;
mod bank;
mod slots;

pub use ballistics::{BallisticsCoefficients, BallisticsFilter};
pub use bank::{ChannelBank, BLOCK_SIZE_SETTLE_CALLBACKS};
pub use slots::{AtomicFloat, LevelSlots};
