//! One processing cycle per buffer
//!
//! [`ClapPipeline`] owns every stage of the core. One call to
//! [`ClapPipeline::process`] runs a full cycle on a buffer: FFT, spectral
//! classification, sequence update and output latches. It returns a
//! [`CycleReport`]. [`run`] drives a pipeline from a [`SampleSource`] and
//! re-arms the source only after the cycle has finished and every
//! [`GestureSink`] has seen the report.

use super::buffer::SampleBuffer;
use super::source::{SampleSource, SourceEvent};
use crate::config::{ConfigError, DetectorConfig};
use crate::dsp::classifier::{Classification, SpectralEnergyClassifier};
use crate::dsp::fft::{FftEngine, FftError};
use crate::gesture::clock::Clock;
use crate::gesture::outputs::{OutputChannel, OutputLatches};
use crate::gesture::sequence::{ClapSequence, Gesture};
use anyhow::Result;

/// Everything the core produced in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Clock reading used for the sequence timer
    pub timestamp_us: u64,
    /// Spectral classification, `None` for an idle tick
    pub classification: Option<Classification>,
    /// Gesture completed in this cycle
    pub gesture: Gesture,
    /// Output levels after this cycle
    pub outputs: OutputLatches,
    /// Gesture output that flipped in this cycle
    pub toggled: Option<OutputChannel>,
}

impl CycleReport {
    /// Whether this cycle's buffer was a clap
    pub fn is_clap(&self) -> bool {
        self.classification.map(|c| c.is_clap).unwrap_or(false)
    }

    /// Spectral metric, if a buffer was classified
    pub fn metric(&self) -> Option<f64> {
        self.classification.map(|c| c.metric)
    }
}

/// Consumer of per-cycle results
pub trait GestureSink {
    fn on_cycle(&mut self, report: &CycleReport);
}

/// Sink that logs claps, metrics and gestures through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl GestureSink for TracingSink {
    fn on_cycle(&mut self, report: &CycleReport) {
        if let Some(classification) = report.classification {
            if classification.is_clap {
                tracing::info!(metric = classification.metric, "CLAP!");
            }
            tracing::debug!(
                cycle = report.cycle,
                metric = classification.metric,
                low = classification.low_average,
                high = classification.high_average,
                "Cycle classified"
            );
        }
        if let Some(channel) = report.toggled {
            tracing::info!(
                gesture = report.gesture.as_str(),
                channel = ?channel,
                level = report.outputs.level(channel),
                "Output toggled"
            );
        }
    }
}

/// FFT → classifier → sequence → outputs
///
/// # Example
/// ```
/// use clapsense_core::{ClapPipeline, DetectorConfig, SampleBuffer};
///
/// let mut pipeline = ClapPipeline::new(DetectorConfig::with_sample_count(256)).unwrap();
/// let buffer = SampleBuffer::new(vec![2048; 256]).unwrap();
/// let report = pipeline.process(&buffer, 0).unwrap();
/// assert!(!report.is_clap());
/// assert_eq!(pipeline.cycles(), 1);
/// ```
#[derive(Debug)]
pub struct ClapPipeline {
    config: DetectorConfig,
    fft: FftEngine,
    classifier: SpectralEnergyClassifier,
    sequence: ClapSequence,
    outputs: OutputLatches,
    cycles: u64,
}

impl ClapPipeline {
    /// Build every stage from a configuration
    ///
    /// # Errors
    /// Any [`ConfigError`] reported by [`DetectorConfig::validate`].
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fft = FftEngine::with_log2(config.sample_count, config.log2_sample_count())
            .map_err(|_| ConfigError::InvalidSampleCount(config.sample_count))?;
        let classifier = SpectralEnergyClassifier::from_config(&config)?;
        let sequence = ClapSequence::from_config(&config);

        tracing::info!(
            sample_count = config.sample_count,
            band_split = config.band_split,
            threshold = config.threshold,
            window_us = config.gesture_window_us,
            level_scale = ?config.level_scale,
            "Clap pipeline ready"
        );

        Ok(Self {
            config,
            fft,
            classifier,
            sequence,
            outputs: OutputLatches::default(),
            cycles: 0,
        })
    }

    /// Run one full cycle on a buffer
    ///
    /// # Errors
    /// [`FftError`] if the buffer length differs from the configured size.
    pub fn process(&mut self, buffer: &SampleBuffer, now_us: u64) -> Result<CycleReport, FftError> {
        if buffer.log2_len() != self.fft.log2_size() {
            return Err(FftError::LengthMismatch {
                expected: self.fft.size(),
                actual: buffer.len(),
            });
        }
        let spectrum = self.fft.forward(buffer.samples())?;
        let classification = self.classifier.classify(&spectrum)?;
        Ok(self.finish_cycle(Some(classification), now_us))
    }

    /// Run one cycle without a new buffer
    ///
    /// Advances the sequence timer so that pending gestures can complete.
    pub fn tick(&mut self, now_us: u64) -> CycleReport {
        self.finish_cycle(None, now_us)
    }

    fn finish_cycle(&mut self, classification: Option<Classification>, now_us: u64) -> CycleReport {
        self.cycles += 1;
        let clap = classification.map(|c| c.is_clap).unwrap_or(false);
        let gesture = self.sequence.step(clap, now_us);
        let toggled = self.outputs.apply(gesture, self.sequence.state().debounce);

        CycleReport {
            cycle: self.cycles,
            timestamp_us: now_us,
            classification,
            gesture,
            outputs: self.outputs,
            toggled,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn sequence(&self) -> &ClapSequence {
        &self.sequence
    }

    pub fn outputs(&self) -> OutputLatches {
        self.outputs
    }

    /// Cycles processed so far, including idle ticks
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Change the clap threshold at runtime
    pub fn set_threshold(&mut self, threshold: f64) {
        self.classifier.set_threshold(threshold);
        self.config.threshold = self.classifier.threshold();
    }
}

/// Drive a pipeline until the source finishes
///
/// Every cycle reads `clock` once unless the source supplied its own
/// timestamp. The source is re-armed only after all sinks have seen the
/// cycle's report.
///
/// # Returns
/// Number of cycles processed
pub fn run<S, C>(
    pipeline: &mut ClapPipeline,
    source: &mut S,
    clock: &C,
    sinks: &mut [&mut dyn GestureSink],
) -> Result<u64>
where
    S: SampleSource + ?Sized,
    C: Clock + ?Sized,
{
    let start = pipeline.cycles();
    loop {
        let (report, released) = match source.next_event()? {
            SourceEvent::Buffer(timed) => {
                let now = timed.at_us.unwrap_or_else(|| clock.now_us());
                (pipeline.process(&timed.buffer, now)?, true)
            }
            SourceEvent::Idle { at_us } => {
                (pipeline.tick(at_us.unwrap_or_else(|| clock.now_us())), false)
            }
            SourceEvent::Finished => break,
        };
        for sink in sinks.iter_mut() {
            sink.on_cycle(&report);
        }
        if released {
            source.rearm();
        }
    }

    let processed = pipeline.cycles() - start;
    tracing::info!(cycles = processed, "Sample source finished");
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::replay::{ReplayCapture, ReplaySource};
    use crate::gesture::clock::ManualClock;

    const N: usize = 256;

    /// Burst of low band tones, quantization noise above the split
    fn clap_buffer() -> SampleBuffer {
        let split = DetectorConfig::with_sample_count(N).band_split;
        let samples = (0..N)
            .map(|i| {
                let value: f64 = (1..split)
                    .map(|bin| {
                        let phase = bin as f64 * bin as f64 * 0.7;
                        let angle = 2.0 * std::f64::consts::PI * (bin * i) as f64 / N as f64;
                        60.0 * (angle + phase).sin()
                    })
                    .sum();
                (2048.0 + value).round() as u16
            })
            .collect();
        SampleBuffer::new(samples).unwrap()
    }

    /// White noise, roughly the same level in every bin
    fn noise_buffer() -> SampleBuffer {
        let mut state: u32 = 0xDEADBEEF;
        let samples = (0..N)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = ((state >> 16) & 0x7FFF) as f64 / 16384.0 - 1.0;
                (2048.0 + noise * 1500.0) as u16
            })
            .collect();
        SampleBuffer::new(samples).unwrap()
    }

    fn pipeline() -> ClapPipeline {
        ClapPipeline::new(DetectorConfig::with_sample_count(N)).unwrap()
    }

    #[derive(Default)]
    struct Collect(Vec<CycleReport>);

    impl GestureSink for Collect {
        fn on_cycle(&mut self, report: &CycleReport) {
            self.0.push(report.clone());
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            band_split: 5000,
            ..Default::default()
        };
        assert!(ClapPipeline::new(config).is_err());
    }

    #[test]
    fn test_rejects_wrong_buffer_size() {
        let mut pipeline = pipeline();
        let buffer = SampleBuffer::new(vec![2048; 128]).unwrap();
        assert_eq!(
            pipeline.process(&buffer, 0).unwrap_err(),
            FftError::LengthMismatch {
                expected: N,
                actual: 128
            }
        );
        assert_eq!(pipeline.cycles(), 0);
    }

    #[test]
    fn test_silence_is_not_a_clap() {
        let mut pipeline = pipeline();
        let report = pipeline
            .process(&SampleBuffer::new(vec![2048; N]).unwrap(), 0)
            .unwrap();
        assert!(!report.is_clap());
        assert!(report.metric().unwrap().is_nan());
    }

    #[test]
    fn test_low_band_burst_is_a_clap() {
        let mut pipeline = pipeline();
        let clap = pipeline.process(&clap_buffer(), 0).unwrap();
        let noise = pipeline.process(&noise_buffer(), 10).unwrap();
        assert!(clap.is_clap(), "metric {:?}", clap.metric());
        assert!(!noise.is_clap(), "metric {:?}", noise.metric());
        assert!(noise.metric().unwrap().abs() < 25.0);
    }

    #[test]
    fn test_triple_clap_toggles_triple_output() {
        let mut pipeline = pipeline();
        pipeline.process(&clap_buffer(), 0).unwrap();
        pipeline.process(&clap_buffer(), 200_000).unwrap();
        let report = pipeline.process(&clap_buffer(), 400_000).unwrap();

        assert_eq!(report.gesture, Gesture::TripleClap);
        assert_eq!(report.toggled, Some(OutputChannel::Triple));
        assert!(report.outputs.triple);
        assert!(!report.outputs.double);
    }

    #[test]
    fn test_idle_tick_completes_double_clap() {
        let mut pipeline = pipeline();
        pipeline.process(&clap_buffer(), 0).unwrap();
        pipeline.process(&clap_buffer(), 300_000).unwrap();

        assert_eq!(pipeline.tick(900_000).gesture, Gesture::None);
        let report = pipeline.tick(1_100_000);
        assert_eq!(report.gesture, Gesture::DoubleClap);
        assert!(report.classification.is_none());
        assert!(pipeline.outputs().double);
    }

    #[test]
    fn test_heartbeat_alternates() {
        let mut pipeline = pipeline();
        let beats: Vec<bool> = (0..4)
            .map(|t| pipeline.tick(t).outputs.heartbeat)
            .collect();
        assert_eq!(beats, vec![true, false, true, false]);
    }

    #[test]
    fn test_run_replays_capture_into_sinks() {
        let mut capture = ReplayCapture::new(N);
        capture.push(0, &clap_buffer());
        capture.push(250_000, &noise_buffer());
        capture.push(500_000, &clap_buffer());
        capture.push_idle(1_200_000);
        let mut source = ReplaySource::from_capture(capture).unwrap();

        let mut pipeline = pipeline();
        let clock = ManualClock::new(0);
        let mut collect = Collect::default();
        let mut log = TracingSink;
        let mut sinks: [&mut dyn GestureSink; 2] = [&mut collect, &mut log];
        let cycles = run(&mut pipeline, &mut source, &clock, &mut sinks).unwrap();

        assert_eq!(cycles, 4);
        let gestures: Vec<Gesture> = collect.0.iter().map(|r| r.gesture).collect();
        assert_eq!(
            gestures,
            vec![
                Gesture::None,
                Gesture::None,
                Gesture::None,
                Gesture::DoubleClap
            ]
        );
        assert_eq!(collect.0[3].timestamp_us, 1_200_000);
    }

    #[test]
    fn test_set_threshold() {
        let mut pipeline = pipeline();
        pipeline.set_threshold(75.0);
        assert_eq!(pipeline.config().threshold, 75.0);
        pipeline.set_threshold(f64::NAN);
        assert_eq!(pipeline.config().threshold, 75.0);
    }
}
