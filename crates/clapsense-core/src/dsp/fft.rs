//! Iterative radix-2 FFT with bit-reversal addressing
//!
//! The transform copies its input into bit-reversed order and then runs
//! `log2(N)` butterfly stages bottom-up. Each stage derives its twiddle step
//! from the complex exponential and accumulates the twiddle factor by
//! repeated multiplication across the groups of the stage.
//!
//! The forward transform uses the positive exponent `exp(+iπ/m2)`. For
//! real-valued input this only mirrors the spectrum, so bin magnitudes match
//! the conventional DFT. [`FftEngine::inverse`] uses the conjugate twiddle
//! and scales by `1/N`, so `inverse(forward(x)) ≈ x`.

use super::complex::Complex;
use std::f64::consts::PI;
use thiserror::Error;

/// Errors raised when the transform size or input does not fit the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FftError {
    #[error("FFT size must be a non-zero power of two, got {0}")]
    NotPowerOfTwo(usize),

    #[error("log2 size mismatch: 2^{log2} != {size}")]
    Log2Mismatch { size: usize, log2: u32 },

    #[error("input length {actual} does not match FFT size {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Direction of the butterfly twiddle rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Inverse => -1.0,
        }
    }
}

/// Reverse the low `width` bits of `i`
///
/// # Example
/// ```
/// use clapsense_core::dsp::fft::bit_reversal;
///
/// assert_eq!(bit_reversal(0b001, 3), 0b100);
/// assert_eq!(bit_reversal(0b110, 3), 0b011);
/// ```
pub fn bit_reversal(mut i: usize, width: u32) -> usize {
    let mut v = 0;
    for _ in 0..width {
        v <<= 1;
        v |= i & 1;
        i >>= 1;
    }
    v
}

/// Fixed-size radix-2 FFT engine
///
/// The size is validated once at construction; every transform then checks
/// only that the input length matches.
///
/// # Example
/// ```
/// use clapsense_core::{Complex, FftEngine};
///
/// let engine = FftEngine::new(8).unwrap();
/// let spectrum = engine.forward(&[1.0f64, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
/// assert!(spectrum.iter().all(|bin| bin.approx_eq(Complex::ONE, 1e-12)));
/// ```
#[derive(Debug, Clone)]
pub struct FftEngine {
    /// Transform length N
    size: usize,
    /// log2(N), the bit width of the reversal permutation
    log2_size: u32,
}

impl FftEngine {
    /// Create an engine for `size` points
    ///
    /// # Errors
    /// [`FftError::NotPowerOfTwo`] if `size` is zero or not a power of two.
    pub fn new(size: usize) -> Result<Self, FftError> {
        if !size.is_power_of_two() {
            return Err(FftError::NotPowerOfTwo(size));
        }
        Ok(Self {
            size,
            log2_size: size.trailing_zeros(),
        })
    }

    /// Create an engine from an explicit size and bit width
    ///
    /// # Errors
    /// [`FftError::Log2Mismatch`] if `2^log2 != size`.
    pub fn with_log2(size: usize, log2: u32) -> Result<Self, FftError> {
        let engine = Self::new(size)?;
        if engine.log2_size != log2 {
            return Err(FftError::Log2Mismatch { size, log2 });
        }
        Ok(engine)
    }

    /// Transform length N
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bit width of the reversal permutation, log2(N)
    pub fn log2_size(&self) -> u32 {
        self.log2_size
    }

    /// Forward transform of real-valued samples
    ///
    /// Accepts any sample type losslessly convertible to `f64`, such as the
    /// quantized `u16` readings of a [`crate::SampleBuffer`].
    pub fn forward<T>(&self, samples: &[T]) -> Result<Vec<Complex>, FftError>
    where
        T: Copy + Into<f64>,
    {
        self.check_len(samples.len())?;
        let mut output: Vec<Complex> = (0..self.size)
            .map(|i| Complex::from(samples[bit_reversal(i, self.log2_size)].into()))
            .collect();
        self.butterflies(&mut output, Direction::Forward);
        Ok(output)
    }

    /// Forward transform of complex input
    pub fn forward_complex(&self, input: &[Complex]) -> Result<Vec<Complex>, FftError> {
        self.check_len(input.len())?;
        let mut output = self.permuted(input);
        self.butterflies(&mut output, Direction::Forward);
        Ok(output)
    }

    /// Inverse transform, scaled by `1/N`
    pub fn inverse(&self, spectrum: &[Complex]) -> Result<Vec<Complex>, FftError> {
        self.check_len(spectrum.len())?;
        let mut output = self.permuted(spectrum);
        self.butterflies(&mut output, Direction::Inverse);

        let scale = self.size as f64;
        for value in output.iter_mut() {
            *value = *value / scale;
        }
        Ok(output)
    }

    fn check_len(&self, actual: usize) -> Result<(), FftError> {
        if actual != self.size {
            return Err(FftError::LengthMismatch {
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }

    fn permuted(&self, input: &[Complex]) -> Vec<Complex> {
        (0..self.size)
            .map(|i| input[bit_reversal(i, self.log2_size)])
            .collect()
    }

    /// Bottom-up butterfly stages over bit-reversed data
    fn butterflies(&self, data: &mut [Complex], direction: Direction) {
        let n = self.size;
        for s in 1..=self.log2_size {
            let m = 1usize << s;
            let m2 = m >> 1;
            let wm = (Complex::I * (direction.sign() * PI / m2 as f64)).exp();
            let mut w = Complex::ONE;

            for j in 0..m2 {
                for k in (j..n).step_by(m) {
                    let t = w * data[k + m2];
                    let u = data[k];
                    data[k] = u + t;
                    data[k + m2] = u - t;
                }
                w *= wm;
            }
        }
    }
}
