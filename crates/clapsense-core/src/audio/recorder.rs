//! Amplitude-triggered recording
//!
//! The recorder watches a stream of quantized readings. While idle it drops
//! every reading that stays inside `midpoint ± amplitude_threshold`. The
//! first reading outside that band starts a recording and becomes sample 0.
//! The next `N - 1` readings are appended regardless of level, and the
//! completed block is handed out as a [`SampleBuffer`]. The recorder then
//! goes back to idle.

use super::buffer::SampleBuffer;
use crate::config::{ConfigError, DetectorConfig};

/// Map a normalized sample in `[-1.0, 1.0]` onto an unsigned `adc_bits` scale
///
/// Out of range input is clamped, and silence maps to the middle code.
///
/// # Example
/// ```
/// use clapsense_core::audio::recorder::quantize;
///
/// assert_eq!(quantize(-1.0, 12), 0);
/// assert_eq!(quantize(0.0, 12), 2048);
/// assert_eq!(quantize(1.0, 12), 4095);
/// ```
pub fn quantize(sample: f32, adc_bits: u8) -> u16 {
    let max = ((1u32 << adc_bits.clamp(1, 16)) - 1) as f32;
    let normalized = (sample.clamp(-1.0, 1.0) + 1.0) * 0.5;
    (normalized * max).round() as u16
}

/// Threshold-triggered recorder producing fixed-size buffers
#[derive(Debug)]
pub struct TriggeredRecorder {
    /// Samples per buffer
    capacity: usize,
    /// Quantized rest level of the signal
    midpoint: u16,
    /// Distance from the midpoint that starts a recording
    amplitude_threshold: u16,
    /// Whether a recording is in progress
    recording: bool,
    /// Samples collected so far
    samples: Vec<u16>,
    /// Number of recordings started
    triggers: u64,
}

impl TriggeredRecorder {
    /// Create an idle recorder
    ///
    /// # Errors
    /// Any [`ConfigError`] reported by [`DetectorConfig::validate`].
    pub fn new(config: &DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            capacity: config.sample_count,
            midpoint: config.midpoint,
            amplitude_threshold: config.amplitude_threshold,
            recording: false,
            samples: Vec::with_capacity(config.sample_count),
            triggers: 0,
        })
    }

    /// Whether a reading lies outside the idle band
    pub fn is_trigger(&self, reading: u16) -> bool {
        let low = self.midpoint.saturating_sub(self.amplitude_threshold);
        let high = self.midpoint.saturating_add(self.amplitude_threshold);
        reading < low || reading > high
    }

    /// Feed one reading
    ///
    /// Returns the completed buffer when this reading fills it.
    pub fn push(&mut self, reading: u16) -> Option<SampleBuffer> {
        if !self.recording {
            if !self.is_trigger(reading) {
                return None;
            }
            self.recording = true;
            self.triggers += 1;
            tracing::trace!(reading, "Recording triggered");
        }

        self.samples.push(reading);
        if self.samples.len() < self.capacity {
            return None;
        }

        self.recording = false;
        let samples = std::mem::replace(&mut self.samples, Vec::with_capacity(self.capacity));
        // Capacity is a validated power of two, so this cannot fail
        SampleBuffer::new(samples).ok()
    }

    /// Feed a slice of readings, stopping at the first completed buffer
    ///
    /// Returns the buffer, if any, and the number of readings consumed.
    pub fn push_slice(&mut self, readings: &[u16]) -> (Option<SampleBuffer>, usize) {
        for (i, &reading) in readings.iter().enumerate() {
            if let Some(buffer) = self.push(reading) {
                return (Some(buffer), i + 1);
            }
        }
        (None, readings.len())
    }

    /// Abandon any partial recording
    pub fn reset(&mut self) {
        self.recording = false;
        self.samples.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Samples collected in the current recording
    pub fn fill(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of recordings started since creation
    pub fn triggers(&self) -> u64 {
        self.triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> DetectorConfig {
        DetectorConfig::with_sample_count(16)
    }

    #[test]
    fn test_quantize_range() {
        assert_eq!(quantize(-2.0, 12), 0);
        assert_eq!(quantize(2.0, 12), 4095);
        assert_eq!(quantize(0.0, 16), 32768);
        assert_eq!(quantize(0.5, 8), 191);
    }

    #[test]
    fn test_in_band_readings_are_ignored() {
        let mut recorder = TriggeredRecorder::new(&small_config()).unwrap();
        for reading in [2048, 1348, 2748, 2000, 2500] {
            assert!(recorder.push(reading).is_none());
        }
        assert!(!recorder.is_recording());
        assert_eq!(recorder.fill(), 0);
        assert_eq!(recorder.triggers(), 0);
    }

    #[test]
    fn test_trigger_starts_recording_with_trigger_sample() {
        let mut recorder = TriggeredRecorder::new(&small_config()).unwrap();
        assert!(recorder.push(3000).is_none());
        assert!(recorder.is_recording());
        assert_eq!(recorder.fill(), 1);

        // In-band readings are kept once recording
        for _ in 0..14 {
            assert!(recorder.push(2048).is_none());
        }
        let buffer = recorder.push(2048).expect("16th sample completes the buffer");
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.log2_len(), 4);
        assert_eq!(buffer.samples()[0], 3000);
        assert!(!recorder.is_recording());
        assert_eq!(recorder.fill(), 0);
    }

    #[test]
    fn test_low_side_trigger() {
        let recorder = TriggeredRecorder::new(&small_config()).unwrap();
        assert!(recorder.is_trigger(1347));
        assert!(!recorder.is_trigger(1348));
        assert!(recorder.is_trigger(2749));
    }

    #[test]
    fn test_push_slice_reports_consumed() {
        let mut recorder = TriggeredRecorder::new(&small_config()).unwrap();
        let mut readings = vec![2048u16; 4];
        readings.extend(std::iter::repeat(100).take(20));

        let (buffer, consumed) = recorder.push_slice(&readings);
        assert!(buffer.is_some());
        assert_eq!(consumed, 4 + 16);

        let (buffer, consumed) = recorder.push_slice(&readings[consumed..]);
        assert!(buffer.is_none());
        assert_eq!(consumed, 4);
        assert_eq!(recorder.fill(), 4);
        assert_eq!(recorder.triggers(), 2);
    }

    #[test]
    fn test_reset_discards_partial_recording() {
        let mut recorder = TriggeredRecorder::new(&small_config()).unwrap();
        recorder.push(0);
        recorder.push(0);
        recorder.reset();
        assert!(!recorder.is_recording());
        assert_eq!(recorder.fill(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            sample_count: 12,
            ..Default::default()
        };
        assert!(TriggeredRecorder::new(&config).is_err());
    }
}
