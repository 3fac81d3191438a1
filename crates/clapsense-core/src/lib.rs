//! Clapsense Core - FFT, spectral classification, and clap gesture recognition
//!
//! This library turns blocks of quantized microphone samples into clap events
//! and recognizes double and triple clap gestures within a timing window.
//! The pipeline is: sample buffer → FFT → spectral energy classifier →
//! clap sequence state machine → toggling outputs.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod gesture;
pub mod stats;

pub use audio::buffer::SampleBuffer;
pub use audio::pipeline::{ClapPipeline, CycleReport, GestureSink, TracingSink};
pub use audio::recorder::TriggeredRecorder;
pub use audio::source::{SampleSource, SourceEvent};
pub use config::{ConfigError, DetectorConfig, LevelScale};
pub use dsp::{classifier::SpectralEnergyClassifier, complex::Complex, fft::FftEngine};
pub use gesture::sequence::{ClapSequence, Gesture};
pub use stats::store::SessionStats;

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date stamped by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Default number of samples per processing cycle (2^11)
pub const DEFAULT_SAMPLE_COUNT: usize = 2048;

/// Default sample rate of the capture path in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default gesture window in microseconds (1 second)
pub const DEFAULT_GESTURE_WINDOW_US: u64 = 1_000_000;
