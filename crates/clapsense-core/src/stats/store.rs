//! Per-session detector statistics
//!
//! Keeps a bounded history of classification metrics, running counters and
//! a timestamped log of recognized gestures.

use crate::audio::pipeline::{CycleReport, GestureSink};
use crate::gesture::sequence::Gesture;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of metric samples kept (about 10 minutes of busy capture)
const MAX_HISTORY_SIZE: usize = 4096;

/// Maximum number of gesture events kept
const MAX_EVENT_LOG_SIZE: usize = 1024;

/// A single classified cycle
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    /// Wall clock time the cycle was recorded
    pub timestamp: DateTime<Utc>,
    /// Low-minus-high level difference
    pub metric: f64,
    /// Whether the cycle counted as a clap
    pub is_clap: bool,
}

/// A recognized gesture
#[derive(Debug, Clone, Serialize)]
pub struct GestureEvent {
    /// Wall clock time of recognition
    pub timestamp: DateTime<Utc>,
    /// Detector clock reading of the cycle, in microseconds
    pub at_us: u64,
    /// "double" or "triple"
    pub gesture: &'static str,
}

/// Running counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionCounters {
    /// All cycles, idle ticks included
    pub cycles: u64,
    /// Cycles with a classified buffer
    pub buffers: u64,
    pub claps: u64,
    pub double_claps: u64,
    pub triple_claps: u64,
    /// Smallest finite metric seen
    pub min_metric: Option<f64>,
    /// Largest finite metric seen
    pub max_metric: Option<f64>,
    /// Average of the finite metrics in the history
    pub avg_metric: Option<f64>,
}

/// Statistics collected over one detector session
#[derive(Debug)]
pub struct SessionStats {
    started: DateTime<Utc>,
    history: VecDeque<MetricSample>,
    events: VecDeque<GestureEvent>,
    counters: SessionCounters,
    max_size: usize,
    /// Sum and count of the finite metrics in `history`
    finite_sum: f64,
    finite_count: usize,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }

    /// Create a store keeping at most `max_size` metric samples
    pub fn with_capacity(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            started: Utc::now(),
            history: VecDeque::with_capacity(max_size),
            events: VecDeque::new(),
            counters: SessionCounters::default(),
            max_size,
            finite_sum: 0.0,
            finite_count: 0,
        }
    }

    /// Record one cycle
    pub fn record(&mut self, report: &CycleReport) {
        let now = Utc::now();
        self.counters.cycles += 1;

        if let Some(classification) = report.classification {
            self.counters.buffers += 1;
            if classification.is_clap {
                self.counters.claps += 1;
            }
            self.record_metric(now, classification.metric, classification.is_clap);
        }

        match report.gesture {
            Gesture::DoubleClap => self.counters.double_claps += 1,
            Gesture::TripleClap => self.counters.triple_claps += 1,
            Gesture::None => return,
        }
        if self.events.len() >= MAX_EVENT_LOG_SIZE {
            self.events.pop_front();
        }
        self.events.push_back(GestureEvent {
            timestamp: now,
            at_us: report.timestamp_us,
            gesture: report.gesture.as_str(),
        });
    }

    fn record_metric(&mut self, timestamp: DateTime<Utc>, metric: f64, is_clap: bool) {
        if self.history.len() >= self.max_size {
            if let Some(evicted) = self.history.pop_front() {
                if evicted.metric.is_finite() {
                    self.finite_sum -= evicted.metric;
                    self.finite_count -= 1;
                }
            }
        }
        self.history.push_back(MetricSample {
            timestamp,
            metric,
            is_clap,
        });

        // NaN and infinite metrics stay in the history but not in the ranges
        if metric.is_finite() {
            self.finite_sum += metric;
            self.finite_count += 1;
            self.counters.min_metric = Some(self.counters.min_metric.map_or(metric, |m| m.min(metric)));
            self.counters.max_metric = Some(self.counters.max_metric.map_or(metric, |m| m.max(metric)));
        }

        self.counters.avg_metric = if self.finite_count == 0 {
            None
        } else {
            Some(self.finite_sum / self.finite_count as f64)
        };
    }

    /// Metric history, oldest first
    pub fn history(&self) -> &VecDeque<MetricSample> {
        &self.history
    }

    /// Recognized gestures, oldest first
    pub fn events(&self) -> &VecDeque<GestureEvent> {
        &self.events
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    /// Session start time
    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    /// Clear all history and counters and restart the session clock
    pub fn clear(&mut self) {
        self.history.clear();
        self.events.clear();
        self.counters = SessionCounters::default();
        self.finite_sum = 0.0;
        self.finite_count = 0;
        self.started = Utc::now();
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureSink for SessionStats {
    fn on_cycle(&mut self, report: &CycleReport) {
        self.record(report);
    }
}
