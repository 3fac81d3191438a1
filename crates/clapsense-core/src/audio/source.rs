//! Producer side of the processing loop
//!
//! A [`SampleSource`] owns the sampling hardware (or a stand-in) and hands
//! completed buffers to the core one at a time. Handing out a buffer
//! disarms the producer. Nothing new is recorded until the core has run
//! its full cycle and calls [`SampleSource::rearm`], so a buffer is never
//! written while it is being transformed.
//!
//! Buffers only arrive when something loud happens, but a pending double
//! clap is confirmed by the absence of a third. Sources therefore also
//! report [`SourceEvent::Idle`] when nothing was recorded for a while, and
//! the core runs a cycle without a clap event.

use super::buffer::TimedBuffer;
use anyhow::Result;

/// Outcome of waiting on a [`SampleSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A full buffer; the producer is disarmed until [`SampleSource::rearm`]
    Buffer(TimedBuffer),
    /// No buffer completed within the source's idle interval
    Idle {
        /// Time of the idle tick in microseconds, if the source has one
        at_us: Option<u64>,
    },
    /// The source is exhausted or was stopped
    Finished,
}

/// Blocking producer of full sample buffers
pub trait SampleSource {
    /// Wait for the next buffer or idle tick
    fn next_event(&mut self) -> Result<SourceEvent>;

    /// Resume sampling after the previous buffer has been processed
    fn rearm(&mut self);
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_event(&mut self) -> Result<SourceEvent> {
        (**self).next_event()
    }

    fn rearm(&mut self) {
        (**self).rearm()
    }
}
