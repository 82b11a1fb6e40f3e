//! Error types for kmeter-core.

use thiserror::Error;

/// Error type for kmeter-core setup operations.
///
/// Nothing on the audio thread returns these; realtime failures surface as
/// [`LifecycleState`](crate::LifecycleState) transitions instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to register input port {index} ({name}): {reason}")]
    PortRegistration {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("Input port {0} is not available")]
    PortUnavailable(usize),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Backend is already active")]
    AlreadyActive,

    #[cfg(feature = "cpal")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
