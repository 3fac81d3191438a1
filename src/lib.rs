//! Clapsense - acoustic double/triple clap gesture recognizer
//!
//! This library re-exports the detector core from `clapsense-core` and adds
//! the persistent application configuration used by the binary.

pub mod config;

pub use clapsense_core::audio;
pub use clapsense_core::dsp;
pub use clapsense_core::gesture;
pub use clapsense_core::stats;

pub use clapsense_core::{ClapPipeline, DetectorConfig, Gesture, SampleBuffer, SessionStats};
pub use clapsense_core::{BUILD_DATE, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_RATE, VERSION};
pub use config::AppConfig;
