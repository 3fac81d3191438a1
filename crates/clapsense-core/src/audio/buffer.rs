//! Fixed-size blocks of quantized samples

use crate::dsp::fft::FftError;

/// Block of quantized readings whose length is a power of two
///
/// The bit width `log2_len` travels with the samples so the FFT can be
/// checked against it.
///
/// # Example
/// ```
/// use clapsense_core::SampleBuffer;
///
/// let buffer = SampleBuffer::new(vec![2048; 1024]).unwrap();
/// assert_eq!(buffer.log2_len(), 10);
/// assert!(SampleBuffer::new(vec![0; 1000]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<u16>,
    log2_len: u32,
}

impl SampleBuffer {
    /// Wrap `samples`, deriving `log2_len` from the length
    ///
    /// # Errors
    /// [`FftError::NotPowerOfTwo`] for an empty or non power-of-two block.
    pub fn new(samples: Vec<u16>) -> Result<Self, FftError> {
        if !samples.len().is_power_of_two() {
            return Err(FftError::NotPowerOfTwo(samples.len()));
        }
        let log2_len = samples.len().trailing_zeros();
        Ok(Self { samples, log2_len })
    }

    /// Wrap `samples` with an explicit bit width
    ///
    /// # Errors
    /// [`FftError::Log2Mismatch`] if `2^log2_len != samples.len()`.
    pub fn with_log2(samples: Vec<u16>, log2_len: u32) -> Result<Self, FftError> {
        let buffer = Self::new(samples)?;
        if buffer.log2_len != log2_len {
            return Err(FftError::Log2Mismatch {
                size: buffer.samples.len(),
                log2: log2_len,
            });
        }
        Ok(buffer)
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a valid buffer holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn log2_len(&self) -> u32 {
        self.log2_len
    }

    pub fn into_samples(self) -> Vec<u16> {
        self.samples
    }
}

/// A full buffer plus the time it was handed to the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedBuffer {
    pub buffer: SampleBuffer,
    /// Capture timestamp in microseconds, if the source has one
    pub at_us: Option<u64>,
}
