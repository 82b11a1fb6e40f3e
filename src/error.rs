//! Centralized error type for the kmeter umbrella crate.
//!
//! Wraps the member crate errors so `?` propagates across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] kmeter_core::Error),

    #[error("IPC: {0}")]
    Ipc(#[from] kmeter_ipc::IpcError),
}

pub type Result<T> = std::result::Result<T, Error>;
