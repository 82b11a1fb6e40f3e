//! Audio backend seam: ports, per-callback buffers, severance notice.

use crate::callback::MeterProcessor;
use crate::Result;

/// Opaque handle to a registered input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortHandle(usize);

impl PortHandle {
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Read-only view of the sample buffers delivered to one callback.
///
/// Returned slices are valid only for the duration of the callback.
pub trait BlockSource {
    /// Samples of `port` for this block. Never longer than `frames`.
    fn block_buffer(&self, port: PortHandle, frames: usize) -> &[f32];
}

/// Called once when the audio connection is severed.
pub type ShutdownCallback = Box<dyn FnMut() + Send + 'static>;

/// An audio server connection that can deliver input blocks to a [`MeterProcessor`].
pub trait AudioBackend {
    fn sample_rate(&self) -> u32;

    /// Nominal frames per callback.
    fn block_size(&self) -> usize;

    fn register_input_port(&mut self, index: usize, name: &str) -> Result<PortHandle>;

    /// Install the callback fired on asynchronous severance.
    fn on_shutdown(&mut self, callback: ShutdownCallback);

    /// Hand the processor to the realtime callback and start delivering blocks.
    fn activate(&mut self, processor: MeterProcessor) -> Result<()>;

    /// Stop delivering blocks and release the ports.
    fn deactivate(&mut self);
}
