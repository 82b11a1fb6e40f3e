//! CPAL input backend.

use crate::callback::MeterProcessor;
use crate::config::MeterConfig;
use crate::port::{AudioBackend, BlockSource, PortHandle, ShutdownCallback};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;

/// Block size assumed until the callback size settles.
const DEFAULT_BLOCK_SIZE: usize = 512;

/// Per-port scratch capacity. Longer callbacks are metered in sub-blocks.
const MAX_FRAMES: usize = 8192;

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The stream is created,
/// owned and dropped by the [`CpalBackend`] that the engine owns; it is never
/// touched concurrently.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: see above; only ever accessed through `&mut CpalBackend`.
unsafe impl Send for StreamHandle {}

/// Meters the input channels of a CPAL capture device.
///
/// Port `i` maps to interleaved device channel `i`.
pub struct CpalBackend {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    block_size: usize,
    ports: Vec<usize>,
    shutdown: Option<ShutdownCallback>,
    stream: Option<StreamHandle>,
}

impl CpalBackend {
    pub fn new(config: &MeterConfig) -> Result<Self> {
        let device = get_device(config.input_device_index)?;
        let supported = device.default_input_config()?;

        let buffer_size = match config.block_size {
            Some(frames) => cpal::BufferSize::Fixed(frames),
            None => cpal::BufferSize::Default,
        };

        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            channels = stream_config.channels,
            sample_rate = stream_config.sample_rate.0,
            "opened input device"
        );

        Ok(Self {
            device,
            config: stream_config,
            sample_format: supported.sample_format(),
            block_size: config
                .block_size
                .map_or(DEFAULT_BLOCK_SIZE, |frames| frames as usize),
            ports: Vec::new(),
            shutdown: None,
            stream: None,
        })
    }

    /// Number of interleaved channels the device delivers.
    pub fn device_channels(&self) -> usize {
        self.config.channels as usize
    }

    pub fn device_name(&self) -> Result<String> {
        Ok(self.device.name()?)
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// List available input devices.
    pub fn list_input_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .input_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn register_input_port(&mut self, index: usize, name: &str) -> Result<PortHandle> {
        if index >= self.device_channels() {
            return Err(Error::PortUnavailable(index));
        }
        if self.ports.contains(&index) {
            return Err(Error::PortRegistration {
                index,
                name: name.to_string(),
                reason: "already registered".to_string(),
            });
        }
        self.ports.push(index);
        Ok(PortHandle::new(index))
    }

    fn on_shutdown(&mut self, callback: ShutdownCallback) {
        self.shutdown = Some(callback);
    }

    fn activate(&mut self, processor: MeterProcessor) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyActive);
        }

        let shutdown = self.shutdown.take();
        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&self.device, &self.config, processor, shutdown)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&self.device, &self.config, processor, shutdown)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&self.device, &self.config, processor, shutdown)?
            }
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };

        stream.play()?;
        self.stream = Some(StreamHandle(stream));
        Ok(())
    }

    fn deactivate(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("input stream stopped");
        }
        self.ports.clear();
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.input_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_input_device()
            .ok_or_else(|| Error::InvalidDevice("No input device available".into())),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut processor: MeterProcessor,
    mut shutdown: Option<ShutdownCallback>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels as usize;

    // Pre-allocated once; the callback only indexes into it.
    let mut block = DeinterleavedBlock::new(channels, MAX_FRAMES);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let part = sub_block_frames(data.len() / channels.max(1));
                for chunk in data.chunks(channels * part) {
                    let frames = block.load(chunk);
                    processor.process_block(&block, frames);
                }
            }));

            if result.is_err() {
                processor.sever();
            }
        },
        move |err| {
            if let cpal::StreamError::DeviceNotAvailable = err {
                if let Some(callback) = shutdown.as_mut() {
                    callback();
                }
            }
        },
        None,
    )?;

    Ok(stream)
}

/// Frames per sub-block when a callback of `frames` is metered in pieces.
///
/// Callbacks up to [`MAX_FRAMES`] are metered whole. Longer ones are split
/// into equal parts (the last may be shorter by less than one frame per
/// part), so no small remainder block is metered on its own.
fn sub_block_frames(frames: usize) -> usize {
    if frames <= MAX_FRAMES {
        return frames.max(1);
    }
    let parts = frames.div_ceil(MAX_FRAMES);
    frames.div_ceil(parts)
}

/// Interleaved device data split into one contiguous buffer per channel.
struct DeinterleavedBlock {
    buffers: Vec<Vec<f32>>,
    frames: usize,
}

impl DeinterleavedBlock {
    fn new(channels: usize, capacity: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; capacity]; channels],
            frames: 0,
        }
    }

    /// Deinterleave `data` (at most `capacity` frames). Returns the frame count.
    #[inline]
    fn load<T>(&mut self, data: &[T]) -> usize
    where
        T: cpal::SizedSample,
        f32: cpal::FromSample<T>,
    {
        let channels = self.buffers.len();
        if channels == 0 {
            self.frames = 0;
            return 0;
        }

        let capacity = self.buffers[0].len();
        let frames = (data.len() / channels).min(capacity);

        for (frame, samples) in data.chunks_exact(channels).take(frames).enumerate() {
            for (buffer, &sample) in self.buffers.iter_mut().zip(samples) {
                buffer[frame] = sample.to_sample::<f32>();
            }
        }

        self.frames = frames;
        frames
    }
}

impl BlockSource for DeinterleavedBlock {
    fn block_buffer(&self, port: PortHandle, frames: usize) -> &[f32] {
        self.buffers
            .get(port.index())
            .map_or(&[][..], |b| &b[..frames.min(self.frames)])
    }
}
