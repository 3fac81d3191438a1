//! Live microphone capture with cpal
//!
//! The input callback quantizes channel 0 of every frame and pushes the
//! readings into a lock-free ring buffer, but only while the engine is
//! armed. The processing thread drains the ring into a
//! [`TriggeredRecorder`]. Once a buffer is complete the engine disarms, so
//! the callback stops producing until the pipeline has finished its cycle
//! and calls [`SampleSource::rearm`].
//!
//! When no buffer completes within the idle interval the engine reports an
//! idle tick so that the sequence timer keeps running during silence.

use super::buffer::{SampleBuffer, TimedBuffer};
use super::recorder::{quantize, TriggeredRecorder};
use super::source::{SampleSource, SourceEvent};
use crate::config::{ConfigError, DetectorConfig};
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Ring buffer size in samples (about 1.5 seconds at 44.1kHz)
const RING_BUFFER_SIZE: usize = 65536;

/// Default time without a completed buffer before an idle tick
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Sleep between ring buffer polls
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Errors while opening or running the capture stream
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to query device: {0}")]
    Device(String),

    #[error("Failed to open stream: {0}")]
    Stream(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Input device summary for `--list`
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the host's default input
    pub is_default: bool,
    /// Channels of the default input config
    pub channels: u16,
    /// Sample rate of the default input config
    pub sample_rate: u32,
}

/// List every input-capable device of the default host
pub fn list_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    let mut infos = Vec::new();
    for device in devices {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let Ok(config) = device.default_input_config() else {
            continue;
        };
        infos.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
        });
    }
    Ok(infos)
}

/// Flags shared with the audio callback
#[derive(Debug, Default)]
struct CaptureShared {
    /// Callback may push readings
    armed: AtomicBool,
    /// Readings lost because the ring was full
    dropped: AtomicU64,
}

/// Live [`SampleSource`] backed by a cpal input stream
pub struct CaptureEngine {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    /// Kept alive for the lifetime of the engine
    _stream: Stream,
    consumer: HeapCons<u16>,
    recorder: TriggeredRecorder,
    shared: Arc<CaptureShared>,
    running: Arc<AtomicBool>,
    idle_interval: Duration,
    scratch: Vec<u16>,
}

impl CaptureEngine {
    /// Open an input device and start capturing
    ///
    /// # Arguments
    /// * `device_name` - Input device to open, or `None` for the default
    /// * `config` - Detector configuration (sample count, ADC model)
    pub fn start(device_name: Option<&str>, config: &DetectorConfig) -> Result<Self, CaptureError> {
        let recorder = TriggeredRecorder::new(config)?;
        let device = Self::find_device(device_name)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();

        if stream_config.sample_rate.0 != config.sample_rate {
            tracing::warn!(
                requested = config.sample_rate,
                actual = stream_config.sample_rate.0,
                "Device does not run at the configured sample rate, using device rate"
            );
        }

        let ring = HeapRb::<u16>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = ring.split();
        let shared = Arc::new(CaptureShared {
            armed: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
        });

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, producer, &shared, config.adc_bits)
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, producer, &shared, config.adc_bits)
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, producer, &shared, config.adc_bits)
            }
            other => Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        }?;
        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        tracing::info!(
            device = %name,
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            format = ?sample_format,
            "Capture started"
        );

        Ok(Self {
            device_name: name,
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
            _stream: stream,
            consumer,
            recorder,
            shared,
            running: Arc::new(AtomicBool::new(true)),
            idle_interval: DEFAULT_IDLE_INTERVAL,
            scratch: vec![0; RING_BUFFER_SIZE / 4],
        })
    }

    fn find_device(name: Option<&str>) -> Result<Device, CaptureError> {
        let host = cpal::default_host();
        match name {
            None => host.default_input_device().ok_or(CaptureError::NoInputDevice),
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string())),
        }
    }

    /// Flag that ends the capture when cleared, for signal handlers
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop capturing; the next event is [`SourceEvent::Finished`]
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.shared.armed.store(false, Ordering::Release);
    }

    /// Set the time without a buffer before an idle tick is reported
    pub fn set_idle_interval(&mut self, interval: Duration) {
        self.idle_interval = interval.max(POLL_INTERVAL);
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Effective sample rate of the stream
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Readings lost because the processing thread fell behind
    pub fn dropped_samples(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Recordings started so far
    pub fn triggers(&self) -> u64 {
        self.recorder.triggers()
    }
}

impl SampleSource for CaptureEngine {
    fn next_event(&mut self) -> Result<SourceEvent> {
        let started = Instant::now();
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return Ok(SourceEvent::Finished);
            }

            if let Some(buffer) = drain_into(&mut self.consumer, &mut self.recorder, &mut self.scratch)
            {
                self.shared.armed.store(false, Ordering::Release);
                return Ok(SourceEvent::Buffer(TimedBuffer {
                    buffer,
                    at_us: None,
                }));
            }

            if started.elapsed() >= self.idle_interval {
                return Ok(SourceEvent::Idle { at_us: None });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn rearm(&mut self) {
        self.recorder.reset();
        let stale = self.consumer.occupied_len();
        self.consumer.skip(stale);
        if self.running.load(Ordering::Relaxed) {
            self.shared.armed.store(true, Ordering::Release);
        }
    }
}

/// Move queued readings into the recorder until a buffer completes
///
/// Readings left in `scratch` after a completed buffer belong to the time
/// the core owns the buffer and are discarded.
fn drain_into<C>(
    consumer: &mut C,
    recorder: &mut TriggeredRecorder,
    scratch: &mut [u16],
) -> Option<SampleBuffer>
where
    C: Consumer<Item = u16>,
{
    loop {
        let read = consumer.pop_slice(scratch);
        if read == 0 {
            return None;
        }
        if let (Some(buffer), _) = recorder.push_slice(&scratch[..read]) {
            return Some(buffer);
        }
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: HeapProd<u16>,
    shared: &Arc<CaptureShared>,
    adc_bits: u8,
) -> Result<Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let callback_shared = Arc::clone(shared);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !callback_shared.armed.load(Ordering::Acquire) {
                    return;
                }
                for frame in data.chunks(channels) {
                    if let Some(&sample) = frame.first() {
                        let reading = quantize(sample.to_sample::<f32>(), adc_bits);
                        if producer.try_push(reading).is_err() {
                            callback_shared.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            },
            move |err| {
                tracing::error!("Input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| CaptureError::Stream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> TriggeredRecorder {
        TriggeredRecorder::new(&DetectorConfig::with_sample_count(16)).unwrap()
    }

    #[test]
    fn test_drain_empty_ring() {
        let (_producer, mut consumer) = HeapRb::<u16>::new(64).split();
        let mut scratch = vec![0; 8];
        assert!(drain_into(&mut consumer, &mut recorder(), &mut scratch).is_none());
    }

    #[test]
    fn test_drain_completes_buffer_across_chunks() {
        let (mut producer, mut consumer) = HeapRb::<u16>::new(64).split();
        let mut recorder = recorder();

        // Quiet lead-in, trigger, then enough readings to fill 16
        for _ in 0..5 {
            producer.try_push(2048).unwrap();
        }
        producer.try_push(4000).unwrap();
        for i in 0..20 {
            producer.try_push(2000 + i).unwrap();
        }

        // Scratch smaller than the buffer forces several pops
        let mut scratch = vec![0; 4];
        let buffer = drain_into(&mut consumer, &mut recorder, &mut scratch)
            .expect("buffer should complete");
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.samples()[0], 4000);
        assert_eq!(buffer.samples()[15], 2014);
        assert_eq!(recorder.triggers(), 1);
    }

    #[test]
    fn test_drain_keeps_partial_recording() {
        let (mut producer, mut consumer) = HeapRb::<u16>::new(64).split();
        let mut recorder = recorder();
        producer.try_push(100).unwrap();
        producer.try_push(2048).unwrap();

        let mut scratch = vec![0; 8];
        assert!(drain_into(&mut consumer, &mut recorder, &mut scratch).is_none());
        assert!(recorder.is_recording());
        assert_eq!(recorder.fill(), 2);
        assert_eq!(consumer.occupied_len(), 0);
    }

    #[test]
    fn test_list_devices() {
        // May find nothing on CI, but must not panic
        match list_devices() {
            Ok(devices) => {
                for device in &devices {
                    println!("  - {} ({} ch @ {}Hz)", device.name, device.channels, device.sample_rate);
                }
            }
            Err(e) => println!("No audio devices available: {}", e),
        }
    }
}
