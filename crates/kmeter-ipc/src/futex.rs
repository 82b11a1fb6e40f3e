//! Minimal futex wait/wake on a 32-bit atomic.
//!
//! Uses the shared (non-private) futex ops so the word may live in memory
//! mapped by several processes.

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Sleep while `*word == expected`, for at most `timeout`.
///
/// May return early (spurious wake, signal, value already changed); callers
/// re-check the word.
#[cfg(target_os = "linux")]
pub(crate) fn wait(word: &AtomicU32, expected: u32, timeout: Duration) {
    let ts = libc::timespec {
        tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long,
    };

    // SAFETY: `word` is a valid, aligned u32 for the duration of the call.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT,
            expected,
            &ts as *const libc::timespec,
        );
    }
}

/// Wake at most one thread sleeping on `word`. Never blocks.
#[cfg(target_os = "linux")]
#[inline]
pub(crate) fn wake_one(word: &AtomicU32) {
    // SAFETY: as above; FUTEX_WAKE does not dereference beyond the word.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE,
            1,
        );
    }
}

/// Without futexes the consumer polls in short steps.
#[cfg(not(target_os = "linux"))]
pub(crate) fn wait(word: &AtomicU32, expected: u32, timeout: Duration) {
    use std::sync::atomic::Ordering;

    const STEP: Duration = Duration::from_millis(1);
    let deadline = std::time::Instant::now() + timeout;
    while word.load(Ordering::Acquire) == expected {
        let now = std::time::Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(STEP.min(deadline - now));
    }
}

#[cfg(not(target_os = "linux"))]
#[inline]
pub(crate) fn wake_one(_word: &AtomicU32) {}
