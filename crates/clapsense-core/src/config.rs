//! Detector configuration
//!
//! Every tunable of the pipeline lives in [`DetectorConfig`]. The struct
//! deserializes from JSON with per-field defaults, so partial config files
//! keep working as fields are added. Call [`DetectorConfig::validate`] before
//! building a pipeline; the constructors of the pipeline stages call it too.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for configurations the pipeline cannot run with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample count must be a power of two >= 4, got {0}")]
    InvalidSampleCount(usize),

    #[error("band split {split} must lie in 1..{half} (half the sample count)")]
    BandSplitOutOfRange { split: usize, half: usize },

    #[error("clap threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),

    #[error("gesture window must be greater than zero")]
    ZeroGestureWindow,

    #[error("ADC resolution must be 1..=16 bits, got {0}")]
    InvalidAdcBits(u8),

    #[error("amplitude band {midpoint} ± {threshold} does not fit a {bits}-bit ADC")]
    AmplitudeBandOutOfRange {
        midpoint: u16,
        threshold: u16,
        bits: u8,
    },
}

/// How a bin magnitude is mapped to a level before band averaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelScale {
    /// `20 · ln|X|`, the scale the default threshold of 50 was tuned on
    #[default]
    NaturalLog,
    /// `20 · log10|X|`, true decibels
    Decibel,
}

impl LevelScale {
    /// Convert a bin magnitude to a level
    pub fn level(self, magnitude: f64) -> f64 {
        match self {
            LevelScale::NaturalLog => 20.0 * magnitude.ln(),
            LevelScale::Decibel => 20.0 * magnitude.log10(),
        }
    }
}

fn default_sample_count() -> usize {
    crate::DEFAULT_SAMPLE_COUNT
}

fn default_band_split() -> usize {
    default_band_split_for(crate::DEFAULT_SAMPLE_COUNT)
}

fn default_threshold() -> f64 {
    50.0
}

fn default_gesture_window_us() -> u64 {
    crate::DEFAULT_GESTURE_WINDOW_US
}

fn default_amplitude_threshold() -> u16 {
    700
}

fn default_midpoint() -> u16 {
    2048
}

fn default_adc_bits() -> u8 {
    12
}

fn default_sample_rate() -> u32 {
    crate::DEFAULT_SAMPLE_RATE
}

/// Low/high band split for a given sample count
///
/// Keeps the low band at one fifth of the half spectrum, which gives 204
/// of 1024 bins at the default 2048-point transform.
///
/// # Example
/// ```
/// use clapsense_core::config::default_band_split_for;
///
/// assert_eq!(default_band_split_for(2048), 204);
/// assert_eq!(default_band_split_for(512), 51);
/// ```
pub fn default_band_split_for(sample_count: usize) -> usize {
    (sample_count / 2) / 5
}

/// Runtime configuration of the clap detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples per processing cycle (N, power of two)
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// First bin of the high band (L)
    #[serde(default = "default_band_split")]
    pub band_split: usize,
    /// Minimum low-minus-high level difference that counts as a clap
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Level mapping applied to bin magnitudes
    #[serde(default)]
    pub level_scale: LevelScale,
    /// Gesture window in microseconds
    #[serde(default = "default_gesture_window_us")]
    pub gesture_window_us: u64,
    /// Distance from the midpoint that starts a recording
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: u16,
    /// Quantized value the signal oscillates around
    #[serde(default = "default_midpoint")]
    pub midpoint: u16,
    /// Quantizer resolution in bits
    #[serde(default = "default_adc_bits")]
    pub adc_bits: u8,
    /// Capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            band_split: default_band_split(),
            threshold: default_threshold(),
            level_scale: LevelScale::default(),
            gesture_window_us: default_gesture_window_us(),
            amplitude_threshold: default_amplitude_threshold(),
            midpoint: default_midpoint(),
            adc_bits: default_adc_bits(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl DetectorConfig {
    /// Default configuration resized to `sample_count` points
    ///
    /// The band split is rescaled with [`default_band_split_for`].
    pub fn with_sample_count(sample_count: usize) -> Self {
        Self {
            sample_count,
            band_split: default_band_split_for(sample_count),
            ..Self::default()
        }
    }

    /// log2 of the sample count
    pub fn log2_sample_count(&self) -> u32 {
        self.sample_count.trailing_zeros()
    }

    /// Largest reading the quantizer can produce
    pub fn adc_max(&self) -> u16 {
        ((1u32 << self.adc_bits.min(16)) - 1) as u16
    }

    /// Check every field against the constraints of the pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_count.is_power_of_two() || self.sample_count < 4 {
            return Err(ConfigError::InvalidSampleCount(self.sample_count));
        }

        let half = self.sample_count / 2;
        if self.band_split == 0 || self.band_split >= half {
            return Err(ConfigError::BandSplitOutOfRange {
                split: self.band_split,
                half,
            });
        }

        if !self.threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(self.threshold));
        }

        if self.gesture_window_us == 0 {
            return Err(ConfigError::ZeroGestureWindow);
        }

        if self.adc_bits == 0 || self.adc_bits > 16 {
            return Err(ConfigError::InvalidAdcBits(self.adc_bits));
        }

        let max = self.adc_max() as u32;
        let mid = self.midpoint as u32;
        let thr = self.amplitude_threshold as u32;
        if thr == 0 || mid < thr || mid + thr > max {
            return Err(ConfigError::AmplitudeBandOutOfRange {
                midpoint: self.midpoint,
                threshold: self.amplitude_threshold,
                bits: self.adc_bits,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.sample_count, 2048);
        assert_eq!(config.band_split, 204);
        assert_eq!(config.threshold, 50.0);
        assert_eq!(config.level_scale, LevelScale::NaturalLog);
        assert_eq!(config.gesture_window_us, 1_000_000);
        assert_eq!(config.amplitude_threshold, 700);
        assert_eq!(config.midpoint, 2048);
        assert_eq!(config.log2_sample_count(), 11);
        assert_eq!(config.adc_max(), 4095);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_sample_count_rescales_split() {
        let config = DetectorConfig::with_sample_count(256);
        assert_eq!(config.band_split, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let config = DetectorConfig {
            sample_count: 1000,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSampleCount(1000))
        );
    }

    #[test]
    fn test_rejects_band_split_outside_half_spectrum() {
        let mut config = DetectorConfig::default();
        config.band_split = 1024;
        assert_eq!(
            config.validate(),
            Err(ConfigError::BandSplitOutOfRange {
                split: 1024,
                half: 1024
            })
        );
        config.band_split = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_threshold_and_window() {
        let mut config = DetectorConfig::default();
        config.threshold = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteThreshold(_))
        ));

        let config = DetectorConfig {
            gesture_window_us: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroGestureWindow));
    }

    #[test]
    fn test_rejects_amplitude_band_outside_adc_range() {
        let config = DetectorConfig {
            midpoint: 4000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AmplitudeBandOutOfRange { .. })
        ));

        let config = DetectorConfig {
            adc_bits: 17,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAdcBits(17)));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"threshold": 42.5, "level_scale": "decibel"}"#;
        let config: DetectorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.threshold, 42.5);
        assert_eq!(config.level_scale, LevelScale::Decibel);
        assert_eq!(config.sample_count, 2048);
        assert_eq!(config.band_split, 204);
    }

    #[test]
    fn test_round_trip() {
        let config = DetectorConfig {
            sample_count: 1024,
            band_split: 100,
            threshold: 30.0,
            gesture_window_us: 750_000,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_level_scales() {
        let e = std::f64::consts::E;
        assert!((LevelScale::NaturalLog.level(e) - 20.0).abs() < 1e-12);
        assert!((LevelScale::Decibel.level(100.0) - 40.0).abs() < 1e-12);
        assert_eq!(LevelScale::NaturalLog.level(0.0), f64::NEG_INFINITY);
    }
}
