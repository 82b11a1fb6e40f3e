//! Hook for signalling a waiting consumer after each metered block.

use core::time::Duration;

/// Flag-plus-wake notification across the realtime boundary.
///
/// The producer side (`store_level`, `publish`) runs on the audio thread and
/// must be wait-free. Repeated publishes before a consume coalesce into one
/// wake; consumers re-read every level on each wake.
pub trait LevelNotifier: Send + Sync {
    /// Mirror one channel's level into storage the consumer reads.
    ///
    /// Default: levels are only kept in the engine's own slots.
    #[inline]
    fn store_level(&self, _channel: usize, _level: f32) {}

    /// Set the flag 0 -> 1 and wake one waiter. No-op if already set.
    fn publish(&self);

    /// Block until the flag is set or `timeout` elapses, then clear it.
    ///
    /// Returns true if a notification was consumed.
    fn wait_and_consume(&self, timeout: Duration) -> bool;
}
