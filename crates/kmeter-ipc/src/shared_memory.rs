//! Memory-mapped [`MeterRecord`] visible to other processes.

use crate::error::{IpcError, Result};
use crate::record::{MeterRecord, RECORD_SIZE};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::ptr::NonNull;

/// A [`MeterRecord`] backed by a named shared memory file.
///
/// The creator (producer side) owns the file and removes it on drop.
pub struct SharedLevelMap {
    // Kept alive for `record`.
    _mmap: MmapMut,
    record: NonNull<MeterRecord>,
    name: String,
    owns_memory: bool,
}

// SAFETY: the record is only accessed through atomics, and the mapping lives
// as long as `self`.
unsafe impl Send for SharedLevelMap {}
unsafe impl Sync for SharedLevelMap {}

impl SharedLevelMap {
    /// Create (or replace) the record `name` and stamp it with this process id.
    ///
    /// An existing file is reused at its current size, never shrunk, so
    /// consumers still mapping it keep valid pages and see the reset record.
    pub fn create(name: &str) -> Result<Self> {
        let path = shm_path(name);

        let mut file_options = OpenOptions::new();
        file_options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            file_options.mode(0o600);
        }

        let file = file_options.open(&path).map_err(|e| {
            IpcError::SharedMemory(format!("Failed to create shared memory file: {e}"))
        })?;
        if file.metadata()?.len() < RECORD_SIZE as u64 {
            file.set_len(RECORD_SIZE as u64)?;
        }

        let map = Self::map(file, name, true)?;
        map.record().reset();
        map.record().set_owner(u64::from(std::process::id()));
        tracing::debug!(name, path = %path.display(), "created shared level record");
        Ok(map)
    }

    /// Open a record created by another process.
    pub fn open(name: &str) -> Result<Self> {
        let path = shm_path(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                IpcError::SharedMemory(format!("Failed to open shared memory file: {e}"))
            })?;

        let found = file.metadata()?.len() as usize;
        if found < RECORD_SIZE {
            return Err(IpcError::LayoutMismatch {
                expected: RECORD_SIZE,
                found,
            });
        }

        Self::map(file, name, false)
    }

    fn map(file: std::fs::File, name: &str, owns_memory: bool) -> Result<Self> {
        // SAFETY: the file only ever grows, and only in `create` before mapping.
        let mut mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| IpcError::SharedMemory(format!("Failed to create memory map: {e}")))?;

        // Page-aligned and at least RECORD_SIZE bytes, so the cast is valid.
        let record = NonNull::new(mmap.as_mut_ptr().cast::<MeterRecord>())
            .ok_or_else(|| IpcError::SharedMemory("Memory map returned null".into()))?;

        Ok(Self {
            _mmap: mmap,
            record,
            name: name.to_string(),
            owns_memory,
        })
    }

    #[inline]
    pub fn record(&self) -> &MeterRecord {
        // SAFETY: see `map`; all fields are atomics so shared access is sound.
        unsafe { self.record.as_ref() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owns_memory(&self) -> bool {
        self.owns_memory
    }

    /// Whether the process that created the record still exists.
    #[cfg(unix)]
    pub fn producer_alive(&self) -> bool {
        let Ok(pid) = libc::pid_t::try_from(self.record().owner()) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }
        // SAFETY: signal 0 only checks for existence and permission.
        let rc = unsafe { libc::kill(pid, 0) };
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    #[cfg(not(unix))]
    pub fn producer_alive(&self) -> bool {
        self.record().owner() != 0 && shm_path(&self.name).exists()
    }
}

impl Drop for SharedLevelMap {
    fn drop(&mut self) {
        if self.owns_memory {
            let path = shm_path(&self.name);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(name = %self.name, "failed to remove shared level record: {e}");
            }
        }
    }
}

impl core::fmt::Debug for SharedLevelMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedLevelMap")
            .field("name", &self.name)
            .field("owns_memory", &self.owns_memory)
            .field("record", self.record())
            .finish()
    }
}

fn shm_path(name: &str) -> PathBuf {
    #[cfg(target_os = "linux")]
    let base = PathBuf::from("/dev/shm");

    #[cfg(not(target_os = "linux"))]
    let base = std::env::temp_dir();

    base.join(format!("kmeter_{name}"))
}
