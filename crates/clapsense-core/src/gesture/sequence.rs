//! Timing-windowed clap sequence recognition
//!
//! Counts clap events from the first clap of a sequence and decides, once
//! per processing cycle, whether the sequence has become a gesture:
//!
//! ```text
//!            clap                clap                clap
//!   Idle ─────────▶ Pending1 ─────────▶ Pending2 ─────────▶ Pending3
//!    ▲                 │                   │                   │
//!    │  elapsed > win  │   elapsed > win   │                   │
//!    ├─────────────────┘                   │                   │
//!    ├──────────── emit DoubleClap ────────┘                   │
//!    └──── emit TripleClap if elapsed < win, always reset ─────┘
//! ```
//!
//! A double clap is only known once the window has run out without a third
//! clap, while a triple clap must land inside the window. Each cycle first
//! expires a stale sequence, then applies the cycle's event, then resolves a
//! completed triple. A clap that arrives after the window of a pending
//! sequence therefore starts a fresh sequence instead of extending it.

use crate::config::DetectorConfig;

/// Gesture recognized at the end of a processing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gesture {
    /// Nothing completed this cycle
    #[default]
    None,
    /// Two claps followed by a quiet window
    DoubleClap,
    /// Three claps within the window
    TripleClap,
}

impl Gesture {
    pub fn is_none(self) -> bool {
        matches!(self, Gesture::None)
    }

    /// Short name for logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::DoubleClap => "double",
            Gesture::TripleClap => "triple",
        }
    }
}

/// Mutable state of the sequence recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceState {
    /// Claps counted in the current sequence (0 when idle, at most 3)
    pub count: u8,
    /// Timestamp of the first clap of the sequence, in microseconds
    pub started_at_us: u64,
    /// Toggles once per processed cycle
    pub debounce: bool,
}

impl SequenceState {
    pub fn is_idle(&self) -> bool {
        self.count == 0
    }
}

/// Double/triple clap recognizer
///
/// # Example
/// ```
/// use clapsense_core::{ClapSequence, Gesture};
///
/// let mut seq = ClapSequence::new(1_000_000);
/// assert_eq!(seq.step(true, 0), Gesture::None);
/// assert_eq!(seq.step(true, 300_000), Gesture::None);
/// assert_eq!(seq.step(true, 600_000), Gesture::TripleClap);
/// assert!(seq.state().is_idle());
/// ```
#[derive(Debug, Clone)]
pub struct ClapSequence {
    /// Current sequence state
    state: SequenceState,
    /// Gesture window in microseconds
    window_us: u64,
}

impl ClapSequence {
    /// Create an idle recognizer with the given window
    pub fn new(window_us: u64) -> Self {
        Self {
            state: SequenceState::default(),
            window_us,
        }
    }

    /// Create an idle recognizer from a [`DetectorConfig`]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.gesture_window_us)
    }

    /// Advance by one processing cycle
    ///
    /// # Arguments
    /// * `clap` - Whether this cycle's buffer was classified as a clap
    /// * `now_us` - Monotonic time of this cycle, read once per cycle
    ///
    /// # Returns
    /// The gesture completed by this cycle, or [`Gesture::None`]
    pub fn step(&mut self, clap: bool, now_us: u64) -> Gesture {
        self.state.debounce = !self.state.debounce;
        let mut gesture = Gesture::None;

        // Expire a sequence whose window has run out
        let elapsed = self.elapsed(now_us);
        match self.state.count {
            1 if elapsed > self.window_us => {
                tracing::debug!(elapsed_us = elapsed, "Single clap timed out");
                self.reset_sequence();
            }
            2 if elapsed > self.window_us => {
                tracing::info!(elapsed_us = elapsed, "Double clap recognized");
                gesture = Gesture::DoubleClap;
                self.reset_sequence();
            }
            _ => {}
        }

        if clap {
            if self.state.count == 0 {
                self.state.started_at_us = now_us;
            }
            self.state.count += 1;
            tracing::debug!(count = self.state.count, "Clap counted");
        }

        if self.state.count == 3 {
            let elapsed = self.elapsed(now_us);
            if elapsed < self.window_us {
                tracing::info!(elapsed_us = elapsed, "Triple clap recognized");
                gesture = Gesture::TripleClap;
            } else {
                tracing::debug!(elapsed_us = elapsed, "Triple clap too slow, discarded");
            }
            self.reset_sequence();
        }

        gesture
    }

    /// Microseconds since the first clap of the current sequence
    fn elapsed(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.state.started_at_us)
    }

    fn reset_sequence(&mut self) {
        self.state.count = 0;
        self.state.started_at_us = 0;
    }

    /// Current state snapshot
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Claps counted in the current sequence
    pub fn count(&self) -> u8 {
        self.state.count
    }

    /// Gesture window in microseconds
    pub fn window_us(&self) -> u64 {
        self.window_us
    }

    /// Drop any pending sequence and the debounce phase
    pub fn reset(&mut self) {
        self.state = SequenceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 1_000_000;

    /// Feed quiet cycles every 50ms from `from` to `to` inclusive
    fn quiet_until(seq: &mut ClapSequence, from: u64, to: u64) -> Vec<Gesture> {
        let mut out = Vec::new();
        let mut t = from;
        while t <= to {
            let g = seq.step(false, t);
            if !g.is_none() {
                out.push(g);
            }
            t += 50_000;
        }
        out
    }

    #[test]
    fn test_starts_idle() {
        let seq = ClapSequence::new(WINDOW);
        assert!(seq.state().is_idle());
        assert_eq!(seq.window_us(), WINDOW);
    }

    #[test]
    fn test_single_clap_times_out_silently() {
        let mut seq = ClapSequence::new(WINDOW);
        assert_eq!(seq.step(true, 100), Gesture::None);
        assert_eq!(seq.count(), 1);
        assert_eq!(seq.state().started_at_us, 100);

        let emitted = quiet_until(&mut seq, 50_100, 1_200_100);
        assert!(emitted.is_empty());
        assert!(seq.state().is_idle());
    }

    #[test]
    fn test_double_clap_emitted_after_window() {
        let mut seq = ClapSequence::new(WINDOW);
        seq.step(true, 0);
        assert_eq!(seq.step(true, 400_000), Gesture::None);

        // Still pending at exactly the window boundary
        assert_eq!(seq.step(false, WINDOW), Gesture::None);
        assert_eq!(seq.count(), 2);

        assert_eq!(seq.step(false, WINDOW + 1), Gesture::DoubleClap);
        assert!(seq.state().is_idle());

        let emitted = quiet_until(&mut seq, WINDOW + 50_000, 3 * WINDOW);
        assert!(emitted.is_empty(), "double emitted more than once");
    }

    #[test]
    fn test_triple_clap_within_window() {
        let mut seq = ClapSequence::new(WINDOW);
        assert_eq!(seq.step(true, 0), Gesture::None);
        assert_eq!(seq.step(true, 200_000), Gesture::None);
        assert_eq!(seq.step(true, 500_000), Gesture::TripleClap);
        assert!(seq.state().is_idle());

        let emitted = quiet_until(&mut seq, 550_000, 3 * WINDOW);
        assert!(emitted.is_empty(), "no double after a triple");
    }

    #[test]
    fn test_third_clap_takes_triple_path_not_double() {
        let mut seq = ClapSequence::new(WINDOW);
        let mut gestures = Vec::new();
        for (clap, t) in [
            (true, 0),
            (false, 100_000),
            (true, 200_000),
            (true, 250_000),
            (false, 300_000),
        ] {
            let g = seq.step(clap, t);
            if !g.is_none() {
                gestures.push(g);
            }
        }
        gestures.extend(quiet_until(&mut seq, 350_000, 3 * WINDOW));
        assert_eq!(gestures, vec![Gesture::TripleClap]);
    }

    #[test]
    fn test_slow_triple_is_discarded() {
        // Third clap lands exactly on the window: not "< window", no output
        let mut seq = ClapSequence::new(WINDOW);
        seq.step(true, 0);
        seq.step(true, 500_000);
        assert_eq!(seq.step(true, WINDOW), Gesture::None);
        assert!(seq.state().is_idle());
    }

    #[test]
    fn test_claps_spaced_beyond_window_restart_counting() {
        let mut seq = ClapSequence::new(WINDOW);
        let mut t = 0;
        for _ in 0..5 {
            assert_eq!(seq.step(true, t), Gesture::None);
            assert_eq!(seq.count(), 1, "count must restart at 1");
            assert_eq!(seq.state().started_at_us, t);
            t += WINDOW + 1;
        }
    }

    #[test]
    fn test_clap_after_expired_double_emits_and_restarts() {
        let mut seq = ClapSequence::new(WINDOW);
        seq.step(true, 0);
        seq.step(true, 100_000);
        assert_eq!(seq.step(true, WINDOW + 10), Gesture::DoubleClap);
        assert_eq!(seq.count(), 1);
        assert_eq!(seq.state().started_at_us, WINDOW + 10);
    }

    #[test]
    fn test_count_never_decrements() {
        let mut seq = ClapSequence::new(WINDOW);
        let mut last = 0;
        for (i, clap) in [true, false, true, false, false].into_iter().enumerate() {
            seq.step(clap, i as u64 * 10_000);
            assert!(seq.count() >= last);
            last = seq.count();
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_debounce_toggles_every_cycle() {
        let mut seq = ClapSequence::new(WINDOW);
        let mut phases = Vec::new();
        for t in 0..4 {
            seq.step(false, t);
            phases.push(seq.state().debounce);
        }
        assert_eq!(phases, vec![true, false, true, false]);
    }

    #[test]
    fn test_reset() {
        let mut seq = ClapSequence::new(WINDOW);
        seq.step(true, 0);
        seq.step(true, 10);
        seq.reset();
        assert_eq!(seq.state(), SequenceState::default());
        assert_eq!(seq.step(false, 5 * WINDOW), Gesture::None);
    }

    #[test]
    fn test_gesture_names() {
        assert_eq!(Gesture::None.as_str(), "none");
        assert_eq!(Gesture::DoubleClap.as_str(), "double");
        assert_eq!(Gesture::TripleClap.as_str(), "triple");
        assert!(Gesture::default().is_none());
    }
}
