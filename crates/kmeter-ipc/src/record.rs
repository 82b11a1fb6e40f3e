//! Fixed-layout level record shared between producer and consumer.
//!
//! ```text
//! offset  size  field
//!      0     4  flag      (0 = idle, 1 = levels pending)
//!      4     4  padding
//!      8     8  owner     (producer pid)
//!     16     8  reserved
//!     24    16  levels    (4 x f32 bits, channel order)
//! ```
//!
//! All fields are atomics so the record can be read and written through a
//! shared reference into a memory map.

use crate::futex;
use core::mem::{align_of, offset_of, size_of};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Channels mirrored in the record. Further channels are only readable in-process.
pub const RECORD_CHANNELS: usize = 4;

pub const FLAG_OFFSET: usize = 0;
pub const OWNER_OFFSET: usize = 8;
pub const RESERVED_OFFSET: usize = 16;
pub const LEVELS_OFFSET: usize = 24;
pub const RECORD_SIZE: usize = 40;

const FLAG_IDLE: u32 = 0;
const FLAG_PENDING: u32 = 1;

#[repr(C)]
pub struct MeterRecord {
    flag: AtomicU32,
    _pad: u32,
    owner: AtomicU64,
    reserved: AtomicU64,
    levels: [AtomicU32; RECORD_CHANNELS],
}

const _: () = {
    assert!(offset_of!(MeterRecord, flag) == FLAG_OFFSET);
    assert!(offset_of!(MeterRecord, owner) == OWNER_OFFSET);
    assert!(offset_of!(MeterRecord, reserved) == RESERVED_OFFSET);
    assert!(offset_of!(MeterRecord, levels) == LEVELS_OFFSET);
    assert!(size_of::<MeterRecord>() == RECORD_SIZE);
    assert!(align_of::<MeterRecord>() == 8);
};

impl MeterRecord {
    pub const fn new() -> Self {
        Self {
            flag: AtomicU32::new(FLAG_IDLE),
            _pad: 0,
            owner: AtomicU64::new(0),
            reserved: AtomicU64::new(0),
            levels: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Write one channel level. Channels past [`RECORD_CHANNELS`] are ignored.
    #[inline]
    pub fn store_level(&self, channel: usize, level: f32) {
        if let Some(slot) = self.levels.get(channel) {
            slot.store(level.to_bits(), Ordering::Release);
        }
    }

    #[inline]
    pub fn load_level(&self, channel: usize) -> f32 {
        self.levels
            .get(channel)
            .map_or(0.0, |slot| f32::from_bits(slot.load(Ordering::Acquire)))
    }

    pub fn levels(&self) -> [f32; RECORD_CHANNELS] {
        core::array::from_fn(|i| self.load_level(i))
    }

    /// Mark levels pending and wake one waiter.
    ///
    /// Wait-free. If a notification is already pending nothing is signalled;
    /// the consumer will read the newer levels when it consumes the old one.
    /// Returns whether this call raised the flag.
    #[inline]
    pub fn publish(&self) -> bool {
        let raised = self
            .flag
            .compare_exchange(FLAG_IDLE, FLAG_PENDING, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();
        if raised {
            futex::wake_one(&self.flag);
        }
        raised
    }

    /// Block until a notification is pending (or `timeout`), then clear it.
    ///
    /// Returns true if exactly one pending notification was consumed.
    pub fn wait_and_consume(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_consume() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            futex::wait(&self.flag, FLAG_IDLE, deadline - now);
        }
    }

    /// Clear a pending notification without blocking.
    #[inline]
    pub fn try_consume(&self) -> bool {
        self.flag
            .compare_exchange(FLAG_PENDING, FLAG_IDLE, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_pending(&self) -> bool {
        self.flag.load(Ordering::Acquire) == FLAG_PENDING
    }

    pub fn owner(&self) -> u64 {
        self.owner.load(Ordering::Acquire)
    }

    pub(crate) fn set_owner(&self, pid: u64) {
        self.owner.store(pid, Ordering::Release);
    }

    /// Return every field to its initial value in place.
    ///
    /// Used when a record is re-created under a name another process may
    /// still have mapped.
    pub(crate) fn reset(&self) {
        for level in &self.levels {
            level.store(0, Ordering::Relaxed);
        }
        self.reserved.store(0, Ordering::Relaxed);
        self.owner.store(0, Ordering::Relaxed);
        self.flag.store(FLAG_IDLE, Ordering::Release);
    }

    /// Snapshot of the mirrored levels.
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            levels: self.levels(),
        }
    }
}

impl Default for MeterRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for MeterRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeterRecord")
            .field("pending", &self.is_pending())
            .field("owner", &self.owner())
            .field("levels", &self.levels())
            .finish()
    }
}

/// Levels read out of a [`MeterRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub levels: [f32; RECORD_CHANNELS],
}

impl LevelSnapshot {
    /// Highest level across the mirrored channels.
    pub fn max(&self) -> f32 {
        self.levels.iter().copied().fold(0.0, f32::max)
    }

    /// Levels in dBFS, floored at -200 dB.
    pub fn to_dbfs(&self) -> [f32; RECORD_CHANNELS] {
        self.levels.map(|level| 20.0 * level.max(1e-10).log10())
    }
}
