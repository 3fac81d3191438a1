//! Toggling outputs driven by the recognizer
//!
//! The detector drives three on/off outputs. The heartbeat follows the
//! per-cycle debounce phase. The double and triple outputs flip state each
//! time their gesture is recognized, like a light switch.

use super::sequence::Gesture;
use serde::Serialize;

/// Output channel driven by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    /// Follows the debounce phase, flips every processed cycle
    Heartbeat,
    /// Flips on every double clap
    Double,
    /// Flips on every triple clap
    Triple,
}

/// Current level of every output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutputLatches {
    pub heartbeat: bool,
    pub double: bool,
    pub triple: bool,
}

impl OutputLatches {
    /// Update the latches for one cycle
    ///
    /// Returns the gesture output that changed this cycle, if any.
    pub fn apply(&mut self, gesture: Gesture, debounce: bool) -> Option<OutputChannel> {
        self.heartbeat = debounce;
        match gesture {
            Gesture::DoubleClap => {
                self.double = !self.double;
                Some(OutputChannel::Double)
            }
            Gesture::TripleClap => {
                self.triple = !self.triple;
                Some(OutputChannel::Triple)
            }
            Gesture::None => None,
        }
    }

    /// Level of a single channel
    pub fn level(&self, channel: OutputChannel) -> bool {
        match channel {
            OutputChannel::Heartbeat => self.heartbeat,
            OutputChannel::Double => self.double,
            OutputChannel::Triple => self.triple,
        }
    }
}
