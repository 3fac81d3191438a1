//! Spectral energy clap classification
//!
//! A triggered buffer holding a hand clap shows a strong rise of level in
//! the lower part of the spectrum over the noise floor of the upper part.
//! The classifier converts the lower half of a spectrum to levels and
//! averages them over a low band `[0, L)` and a high band `[L, N/2)`. It
//! reports a clap when the low band exceeds the high band by more than the
//! threshold. Flat spectra such as white noise stay near a metric of zero.
//!
//! Levels are logarithmic, so a bin of zero magnitude maps to `-inf` and
//! the metric can become NaN for degenerate input such as pure silence.
//! A NaN metric never compares greater than the threshold, so such cycles
//! are classified as "no clap" without special handling.

use super::complex::Complex;
use super::fft::FftError;
use crate::config::{ConfigError, DetectorConfig, LevelScale};

/// Result of classifying one spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Mean level of bins `[0, L)`
    pub low_average: f64,
    /// Mean level of bins `[L, N/2)`
    pub high_average: f64,
    /// `low_average - high_average`
    pub metric: f64,
    /// Whether the metric exceeded the threshold
    pub is_clap: bool,
}

/// Low/high band energy comparator
///
/// # Example
/// ```
/// use clapsense_core::{DetectorConfig, FftEngine, SpectralEnergyClassifier};
///
/// let config = DetectorConfig::with_sample_count(64);
/// let classifier = SpectralEnergyClassifier::from_config(&config).unwrap();
/// let spectrum = FftEngine::new(64).unwrap().forward(&[2048u16; 64]).unwrap();
/// // A constant signal has no high band energy but -inf levels everywhere
/// // except DC, which averages to NaN and never fires.
/// assert!(!classifier.classify(&spectrum).unwrap().is_clap);
/// ```
#[derive(Debug, Clone)]
pub struct SpectralEnergyClassifier {
    /// Number of bins considered, N/2
    half_len: usize,
    /// First bin of the high band
    band_split: usize,
    /// Metric threshold for a clap
    threshold: f64,
    /// Magnitude to level mapping
    level_scale: LevelScale,
}

impl SpectralEnergyClassifier {
    /// Create a classifier for an `fft_size`-point spectrum
    ///
    /// # Errors
    /// [`ConfigError::InvalidSampleCount`] for a size that is not a power of
    /// two of at least 4, [`ConfigError::BandSplitOutOfRange`] unless
    /// `0 < band_split < fft_size / 2`, and
    /// [`ConfigError::NonFiniteThreshold`] for a NaN or infinite threshold.
    pub fn new(
        fft_size: usize,
        band_split: usize,
        threshold: f64,
        level_scale: LevelScale,
    ) -> Result<Self, ConfigError> {
        if !fft_size.is_power_of_two() || fft_size < 4 {
            return Err(ConfigError::InvalidSampleCount(fft_size));
        }
        let half_len = fft_size / 2;
        if band_split == 0 || band_split >= half_len {
            return Err(ConfigError::BandSplitOutOfRange {
                split: band_split,
                half: half_len,
            });
        }
        if !threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(threshold));
        }
        Ok(Self {
            half_len,
            band_split,
            threshold,
            level_scale,
        })
    }

    /// Create a classifier from the relevant fields of a [`DetectorConfig`]
    pub fn from_config(config: &DetectorConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.sample_count,
            config.band_split,
            config.threshold,
            config.level_scale,
        )
    }

    /// Level of every bin in the lower half of the spectrum
    ///
    /// Only the first `N/2` bins are read.
    pub fn levels(&self, spectrum: &[Complex]) -> Vec<f64> {
        spectrum
            .iter()
            .take(self.half_len)
            .map(|bin| self.level_scale.level(bin.modulus()))
            .collect()
    }

    /// Classify one spectrum
    ///
    /// The mirrored upper half of the spectrum, if present, is ignored.
    ///
    /// # Errors
    /// [`FftError::LengthMismatch`] if the spectrum holds fewer than `N/2`
    /// bins.
    pub fn classify(&self, spectrum: &[Complex]) -> Result<Classification, FftError> {
        if spectrum.len() < self.half_len {
            return Err(FftError::LengthMismatch {
                expected: self.half_len,
                actual: spectrum.len(),
            });
        }

        let mut low_sum = 0.0;
        let mut high_sum = 0.0;
        for (h, bin) in spectrum.iter().take(self.half_len).enumerate() {
            let level = self.level_scale.level(bin.modulus());
            if h < self.band_split {
                low_sum += level;
            } else {
                high_sum += level;
            }
        }

        let low_average = low_sum / self.band_split as f64;
        let high_average = high_sum / (self.half_len - self.band_split) as f64;
        let metric = low_average - high_average;

        Ok(Classification {
            low_average,
            high_average,
            metric,
            is_clap: metric > self.threshold,
        })
    }

    /// Metric threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Set the metric threshold
    ///
    /// Non-finite values are ignored.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_finite() {
            self.threshold = threshold;
        }
    }

    /// First bin of the high band
    pub fn band_split(&self) -> usize {
        self.band_split
    }

    /// Number of bins classified, N/2
    pub fn half_len(&self) -> usize {
        self.half_len
    }

    /// Level mapping in use
    pub fn level_scale(&self) -> LevelScale {
        self.level_scale
    }
}
