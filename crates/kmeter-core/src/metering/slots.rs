//! Published per-channel levels, shared between the audio thread and readers.

use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// One level slot, alone on its cache line.
///
/// The audio thread writes neighbouring slots while display threads read
/// them.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat(AtomicF32);

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self(AtomicF32::new(value))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value, Ordering::Release);
    }
}

/// Fixed-length array of independently atomic f32 slots.
///
/// Single writer (the audio callback), any number of readers. Each slot is
/// written whole, so a reader never sees a torn value; slots are not
/// consistent with each other within one read.
#[derive(Clone)]
pub struct LevelSlots {
    slots: Arc<[AtomicFloat]>,
}

impl LevelSlots {
    pub fn new(channels: usize) -> Self {
        Self {
            slots: (0..channels).map(|_| AtomicFloat::new(0.0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn store(&self, channel: usize, level: f32) {
        if let Some(slot) = self.slots.get(channel) {
            slot.set(level);
        }
    }

    #[inline]
    pub fn load(&self, channel: usize) -> f32 {
        self.slots.get(channel).map_or(0.0, AtomicFloat::get)
    }

    /// Copy as many slots as fit into `out`. Returns the number copied.
    pub fn copy_into(&self, out: &mut [f32]) -> usize {
        let n = self.slots.len().min(out.len());
        for (dst, slot) in out[..n].iter_mut().zip(self.slots.iter()) {
            *dst = slot.get();
        }
        n
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.slots.iter().map(AtomicFloat::get).collect()
    }
}

impl core::fmt::Debug for LevelSlots {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(AtomicFloat::get))
            .finish()
    }
}
