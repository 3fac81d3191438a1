//! Audio processing module
//!
//! This module contains the sampling side of the detector and the
//! per-cycle processing pipeline:
//! - Power-of-two sample blocks ([`buffer`])
//! - Amplitude-triggered recording into full blocks ([`recorder`])
//! - The sample source seam between producers and the core ([`source`])
//! - Live microphone capture ([`engine`])
//! - Offline replay of recorded captures ([`replay`])
//! - One complete processing cycle per buffer ([`pipeline`])

pub mod buffer;
pub mod engine;
pub mod pipeline;
pub mod recorder;
pub mod replay;
pub mod source;
