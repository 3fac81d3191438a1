//! Signal processing module
//!
//! - Complex arithmetic and analytic functions ([`complex`])
//! - Iterative radix-2 FFT with bit-reversal addressing ([`fft`])
//! - Low/high band energy comparison for clap detection ([`classifier`])

pub mod classifier;
pub mod complex;
pub mod fft;
