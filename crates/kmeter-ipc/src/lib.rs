//! Cross-boundary level notification for kmeter.
//!
//! A [`MeterRecord`] holds a pending flag and the first [`RECORD_CHANNELS`]
//! peak levels. The audio callback publishes into it without blocking; a
//! consumer thread, or another process through [`SharedLevelMap`], sleeps on
//! the flag (a futex on Linux) and wakes once per pending notification.

mod error;
mod futex;
mod notifier;
mod record;
mod shared_memory;

pub use error::{IpcError, Result};
pub use notifier::CrossBoundaryNotifier;
pub use record::{
    LevelSnapshot, MeterRecord, FLAG_OFFSET, LEVELS_OFFSET, OWNER_OFFSET, RECORD_CHANNELS,
    RECORD_SIZE, RESERVED_OFFSET,
};
pub use shared_memory::SharedLevelMap;
