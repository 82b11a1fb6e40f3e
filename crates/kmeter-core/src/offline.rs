//! In-memory backend driven synchronously by the caller.
//!
//! Used for offline analysis and for exercising the engine without a sound
//! card. Blocks are pushed through [`OfflineDriver::run_block`] on the
//! caller's thread.

use crate::callback::MeterProcessor;
use crate::port::{AudioBackend, BlockSource, PortHandle, ShutdownCallback};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

type SharedProcessor = Arc<Mutex<Option<MeterProcessor>>>;
type SharedShutdown = Arc<Mutex<Option<ShutdownCallback>>>;

/// Backend without a device: ports are plain slices supplied per block.
pub struct OfflineBackend {
    sample_rate: u32,
    block_size: usize,
    available_ports: usize,
    ports: Vec<String>,
    processor: SharedProcessor,
    shutdown: SharedShutdown,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            available_ports: usize::MAX,
            ports: Vec::new(),
            processor: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(Mutex::new(None)),
        }
    }

    /// Limit how many ports can be registered; further registrations fail.
    pub fn with_available_ports(mut self, count: usize) -> Self {
        self.available_ports = count;
        self
    }

    /// Handle used to push blocks after the backend has been moved into an engine.
    pub fn driver(&self) -> OfflineDriver {
        OfflineDriver {
            processor: Arc::clone(&self.processor),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    pub fn port_names(&self) -> &[String] {
        &self.ports
    }
}

impl AudioBackend for OfflineBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn register_input_port(&mut self, index: usize, name: &str) -> Result<PortHandle> {
        if index != self.ports.len() || index >= self.available_ports {
            return Err(Error::PortRegistration {
                index,
                name: name.to_string(),
                reason: format!("{} of {} ports in use", self.ports.len(), self.available_ports),
            });
        }
        self.ports.push(name.to_string());
        Ok(PortHandle::new(index))
    }

    fn on_shutdown(&mut self, callback: ShutdownCallback) {
        *self.shutdown.lock() = Some(callback);
    }

    fn activate(&mut self, processor: MeterProcessor) -> Result<()> {
        let mut slot = self.processor.lock();
        if slot.is_some() {
            return Err(Error::AlreadyActive);
        }
        *slot = Some(processor);
        Ok(())
    }

    fn deactivate(&mut self) {
        self.processor.lock().take();
        self.shutdown.lock().take();
        self.ports.clear();
    }
}

/// Pushes blocks into an [`OfflineBackend`]'s processor.
#[derive(Clone)]
pub struct OfflineDriver {
    processor: SharedProcessor,
    shutdown: SharedShutdown,
}

impl OfflineDriver {
    /// Run one callback with one slice per port (missing ports read silence).
    ///
    /// The block length is the shortest slice; with no slices at all the
    /// callback is empty. Returns false if the backend is not active.
    pub fn run_block(&self, channels: &[&[f32]]) -> bool {
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let mut slot = self.processor.lock();
        let Some(processor) = slot.as_mut() else {
            return false;
        };

        let silence = if channels.len() < processor.channel_count() {
            vec![0.0; frames]
        } else {
            Vec::new()
        };
        processor.process_block(
            &SliceBlock {
                channels,
                silence: &silence,
            },
            frames,
        );
        true
    }

    /// Feed whole signals split into `block_size` callbacks.
    ///
    /// Returns the number of callbacks run.
    pub fn run_signal(&self, channels: &[&[f32]], block_size: usize) -> usize {
        let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        if block_size == 0 {
            return 0;
        }

        let mut blocks = 0;
        let mut views: Vec<&[f32]> = Vec::with_capacity(channels.len());
        for start in (0..len).step_by(block_size) {
            let end = (start + block_size).min(len);
            views.clear();
            views.extend(channels.iter().map(|c| &c[start..end]));
            if !self.run_block(&views) {
                break;
            }
            blocks += 1;
        }
        blocks
    }

    /// Simulate the audio server announcing a new period size.
    pub fn set_block_size(&self, frames: usize) -> bool {
        match self.processor.lock().as_mut() {
            Some(processor) => {
                processor.set_block_size(frames);
                true
            }
            None => false,
        }
    }

    /// Simulate the audio server going away.
    pub fn shutdown(&self) {
        if let Some(callback) = self.shutdown.lock().as_mut() {
            callback();
        }
    }

    pub fn is_active(&self) -> bool {
        self.processor.lock().is_some()
    }
}

struct SliceBlock<'a> {
    channels: &'a [&'a [f32]],
    /// Zeros for ports without a slice.
    silence: &'a [f32],
}

impl BlockSource for SliceBlock<'_> {
    fn block_buffer(&self, port: PortHandle, frames: usize) -> &[f32] {
        let buf = self.channels.get(port.index()).copied().unwrap_or(self.silence);
        &buf[..frames.min(buf.len())]
    }
}
