//! Metering engine lifecycle.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI8, Ordering};

/// Lifecycle of a [`MeteringEngine`](crate::MeteringEngine).
///
/// Discriminants match the values exchanged with external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum LifecycleState {
    /// Constructed, audio connection not (or no longer) established.
    Initial = 0,
    /// Reserved: connected but metering muted.
    Passive = 1,
    /// Reserved: connected with no active channels.
    Silence = 2,
    /// Steady state; the audio callback updates levels.
    Processing = 3,
    /// Port setup failed. Terminal.
    Failed = -1,
    /// Audio connection severed while running. Terminal.
    Zombie = -2,
}

impl LifecycleState {
    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(Self::Initial),
            1 => Some(Self::Passive),
            2 => Some(Self::Silence),
            3 => Some(Self::Processing),
            -1 => Some(Self::Failed),
            -2 => Some(Self::Zombie),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i8 {
        self as i8
    }

    /// `Failed` and `Zombie` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Zombie)
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Passive => "passive",
            Self::Silence => "silence",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Zombie => "zombie",
        };
        f.write_str(name)
    }
}

/// Atomically stored [`LifecycleState`].
#[derive(Debug)]
pub struct AtomicLifecycle {
    raw: AtomicI8,
}

impl AtomicLifecycle {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            raw: AtomicI8::new(state.as_raw()),
        }
    }

    #[inline]
    pub fn get(&self) -> LifecycleState {
        // Only valid discriminants are ever stored.
        LifecycleState::from_raw(self.raw.load(Ordering::Acquire)).unwrap_or(LifecycleState::Failed)
    }

    #[inline]
    pub fn is_processing(&self) -> bool {
        self.raw.load(Ordering::Acquire) == LifecycleState::Processing.as_raw()
    }

    /// Move `from` -> `to`. Returns false if the current state was not `from`
    /// or `from` is terminal.
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        if from.is_terminal() {
            return false;
        }
        self.raw
            .compare_exchange(from.as_raw(), to.as_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter `Failed` from any non-terminal state.
    pub fn fail(&self) -> bool {
        self.enter_terminal(LifecycleState::Failed)
    }

    /// Enter `Zombie` from any non-terminal state.
    ///
    /// Callable from the audio thread or the backend's notification thread.
    pub fn sever(&self) -> bool {
        self.enter_terminal(LifecycleState::Zombie)
    }

    fn enter_terminal(&self, to: LifecycleState) -> bool {
        self.raw
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                match LifecycleState::from_raw(raw) {
                    Some(state) if state.is_terminal() => None,
                    _ => Some(to.as_raw()),
                }
            })
            .is_ok()
    }
}

impl Default for AtomicLifecycle {
    fn default() -> Self {
        Self::new(LifecycleState::Initial)
    }
}
