//! Recorded captures for offline calibration
//!
//! A capture is a JSON document listing the buffers handed to the core
//! together with their timestamps:
//!
//! ```json
//! { "sample_count": 2048, "cycles": [ { "at_us": 0, "samples": [2048, 2051, ...] } ] }
//! ```
//!
//! A cycle with an empty `samples` array is an idle tick: a cycle in which
//! nothing was recorded.
//!
//! Live runs record one through [`RecordingSource`] and write it with
//! [`ReplayCapture::save`]. [`ReplaySource`] plays it back through the same
//! pipeline, so thresholds and the level scale can be tuned against real
//! recordings.

use super::buffer::{SampleBuffer, TimedBuffer};
use super::source::{SampleSource, SourceEvent};
use crate::dsp::fft::FftError;
use crate::gesture::clock::Clock;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

/// Errors while loading or saving a capture
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("capture I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cycle {index}: {source}")]
    InvalidCycle { index: usize, source: FftError },

    #[error("cycle {index} has {actual} samples, expected {expected}")]
    SizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("cycle {index} at {at_us}us is earlier than the previous cycle")]
    OutOfOrder { index: usize, at_us: u64 },
}

/// One recorded buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCycle {
    /// Time the buffer was handed to the core, in microseconds
    pub at_us: u64,
    /// Quantized readings, empty for an idle tick
    #[serde(default)]
    pub samples: Vec<u16>,
}

/// A sequence of recorded buffers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCapture {
    /// Samples per buffer
    pub sample_count: usize,
    #[serde(default)]
    pub cycles: Vec<ReplayCycle>,
}

impl ReplayCapture {
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            cycles: Vec::new(),
        }
    }

    /// Append a buffer
    pub fn push(&mut self, at_us: u64, buffer: &SampleBuffer) {
        self.cycles.push(ReplayCycle {
            at_us,
            samples: buffer.samples().to_vec(),
        });
    }

    /// Append an idle tick
    pub fn push_idle(&mut self, at_us: u64) {
        self.cycles.push(ReplayCycle {
            at_us,
            samples: Vec::new(),
        });
    }

    /// Read a capture from a JSON file
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let contents = std::fs::read_to_string(path)?;
        let capture: Self = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            cycles = capture.cycles.len(),
            "Loaded capture"
        );
        Ok(capture)
    }

    /// Write the capture as JSON, creating parent directories if needed
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), cycles = self.cycles.len(), "Capture saved");
        Ok(())
    }
}

/// [`SampleSource`] playing back a [`ReplayCapture`]
///
/// Like a live source it hands out one buffer per arm, so the caller has to
/// call [`SampleSource::rearm`] between buffers.
///
/// # Example
/// ```
/// use clapsense_core::audio::replay::{ReplayCapture, ReplayCycle, ReplaySource};
/// use clapsense_core::audio::source::{SampleSource, SourceEvent};
///
/// let capture = ReplayCapture {
///     sample_count: 8,
///     cycles: vec![ReplayCycle { at_us: 5, samples: vec![0; 8] }],
/// };
/// let mut source = ReplaySource::from_capture(capture).unwrap();
/// match source.next_event().unwrap() {
///     SourceEvent::Buffer(timed) => assert_eq!(timed.at_us, Some(5)),
///     other => panic!("unexpected {:?}", other),
/// }
/// source.rearm();
/// assert_eq!(source.next_event().unwrap(), SourceEvent::Finished);
/// ```
#[derive(Debug)]
pub struct ReplaySource {
    pending: VecDeque<SourceEvent>,
    armed: bool,
}

impl ReplaySource {
    /// Validate and queue every cycle of a capture
    ///
    /// # Errors
    /// A [`ReplayError`] naming the first cycle whose length differs from
    /// `sample_count`, is not a power of two, or whose timestamp goes
    /// backwards.
    pub fn from_capture(capture: ReplayCapture) -> Result<Self, ReplayError> {
        let mut pending = VecDeque::with_capacity(capture.cycles.len());
        let mut last_at = 0;

        for (index, cycle) in capture.cycles.into_iter().enumerate() {
            if cycle.at_us < last_at {
                return Err(ReplayError::OutOfOrder {
                    index,
                    at_us: cycle.at_us,
                });
            }
            last_at = cycle.at_us;

            if cycle.samples.is_empty() {
                pending.push_back(SourceEvent::Idle {
                    at_us: Some(cycle.at_us),
                });
                continue;
            }
            if cycle.samples.len() != capture.sample_count {
                return Err(ReplayError::SizeMismatch {
                    index,
                    expected: capture.sample_count,
                    actual: cycle.samples.len(),
                });
            }
            let buffer = SampleBuffer::new(cycle.samples)
                .map_err(|source| ReplayError::InvalidCycle { index, source })?;
            pending.push_back(SourceEvent::Buffer(TimedBuffer {
                buffer,
                at_us: Some(cycle.at_us),
            }));
        }

        Ok(Self {
            pending,
            armed: true,
        })
    }

    /// Load and validate a capture file
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        Self::from_capture(ReplayCapture::load(path)?)
    }

    /// Events not yet handed out
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl SampleSource for ReplaySource {
    fn next_event(&mut self) -> anyhow::Result<SourceEvent> {
        if !self.armed {
            bail!("replay source read again before the previous buffer was released");
        }
        let next = self.pending.pop_front().unwrap_or(SourceEvent::Finished);
        if matches!(next, SourceEvent::Buffer(_)) {
            self.armed = false;
        }
        Ok(next)
    }

    fn rearm(&mut self) {
        self.armed = true;
    }
}

/// [`SampleSource`] wrapper that copies every event into a [`ReplayCapture`]
///
/// Events without a timestamp are stamped with `clock`, so the recording and
/// the pipeline see the same times.
#[derive(Debug)]
pub struct RecordingSource<S, C> {
    inner: S,
    clock: C,
    capture: ReplayCapture,
}

impl<S: SampleSource, C: Clock> RecordingSource<S, C> {
    pub fn new(inner: S, clock: C, sample_count: usize) -> Self {
        Self {
            inner,
            clock,
            capture: ReplayCapture::new(sample_count),
        }
    }

    /// Capture recorded so far
    pub fn capture(&self) -> &ReplayCapture {
        &self.capture
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Split into the wrapped source and the finished capture
    pub fn into_parts(self) -> (S, ReplayCapture) {
        (self.inner, self.capture)
    }
}

impl<S: SampleSource, C: Clock> SampleSource for RecordingSource<S, C> {
    fn next_event(&mut self) -> anyhow::Result<SourceEvent> {
        Ok(match self.inner.next_event()? {
            SourceEvent::Buffer(mut timed) => {
                let at_us = timed.at_us.unwrap_or_else(|| self.clock.now_us());
                timed.at_us = Some(at_us);
                self.capture.push(at_us, &timed.buffer);
                SourceEvent::Buffer(timed)
            }
            SourceEvent::Idle { at_us } => {
                let at_us = at_us.unwrap_or_else(|| self.clock.now_us());
                self.capture.push_idle(at_us);
                SourceEvent::Idle { at_us: Some(at_us) }
            }
            SourceEvent::Finished => SourceEvent::Finished,
        })
    }

    fn rearm(&mut self) {
        self.inner.rearm();
    }
}
