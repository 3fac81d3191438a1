//! Gesture recognition module
//!
//! - Monotonic time sources for the sequence timer ([`clock`])
//! - Double/triple clap sequence state machine ([`sequence`])
//! - Toggling outputs driven by recognized gestures ([`outputs`])

pub mod clock;
pub mod outputs;
pub mod sequence;
