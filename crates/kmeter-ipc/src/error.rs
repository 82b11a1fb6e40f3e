//! Error types for kmeter-ipc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Shared memory error: {0}")]
    SharedMemory(String),

    #[error("Shared record layout mismatch: expected {expected} bytes, found {found}")]
    LayoutMismatch { expected: usize, found: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IpcError>;
