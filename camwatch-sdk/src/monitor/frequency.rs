//! Sliding-window publication rate monitor.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use camwatch_types::{CheckReport, Level, Timestamp};
use parking_lot::{Mutex, RwLock};

use super::{RateWindow, MAX_TICKS};
use crate::aggregator::HealthCheck;

/// How an observed rate compares with its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyClass {
    /// No ticks inside the window.
    NoData,
    Healthy,
    TooSlow,
    TooFast,
}

impl FrequencyClass {
    pub fn level(&self) -> Level {
        match self {
            FrequencyClass::NoData => Level::Error,
            FrequencyClass::Healthy => Level::Ok,
            FrequencyClass::TooSlow | FrequencyClass::TooFast => Level::Warn,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FrequencyClass::NoData => "No events recorded.",
            FrequencyClass::Healthy => "Desired frequency met",
            FrequencyClass::TooSlow => "Frequency too low.",
            FrequencyClass::TooFast => "Frequency too high.",
        }
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one frequency evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyStatus {
    pub class: FrequencyClass,
    /// Observed rate in Hz.
    pub observed_hz: f64,
    /// Ticks inside the window.
    pub events: usize,
    /// Bounds the evaluation used.
    pub bounds: RateWindow,
}

impl FrequencyStatus {
    pub fn level(&self) -> Level {
        self.class.level()
    }

    pub fn to_report(&self) -> CheckReport {
        CheckReport::new(self.level(), self.class.message())
            .with_value("events", self.events)
            .with_value("observed_hz", format!("{:.3}", self.observed_hz))
            .with_value("min_frequency", self.bounds.min_frequency)
            .with_value("max_frequency", self.bounds.max_frequency)
            .with_value("window_s", self.bounds.window.as_secs_f64())
            .with_value("tolerance", self.bounds.tolerance)
    }
}

/// Tracks tick times and classifies the rate over a sliding window.
///
/// # Example
///
/// ```rust
/// use camwatch_sdk::monitor::{FrequencyClass, FrequencyMonitor, RateWindow};
/// use camwatch_types::Timestamp;
///
/// let monitor = FrequencyMonitor::new(RateWindow::around(10.0).unwrap());
/// for i in 0..10 {
///     monitor.tick(Timestamp::from_millis(i * 100));
/// }
///
/// let status = monitor.evaluate(Timestamp::from_secs(1));
/// assert_eq!(status.class, FrequencyClass::Healthy);
/// assert_eq!(status.events, 10);
/// ```
#[derive(Debug)]
pub struct FrequencyMonitor {
    bounds: RwLock<Arc<RateWindow>>,
    ticks: Mutex<VecDeque<Timestamp>>,
}

impl FrequencyMonitor {
    pub fn new(bounds: RateWindow) -> Self {
        Self {
            bounds: RwLock::new(Arc::new(bounds)),
            ticks: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one event at `stamp`.
    pub fn tick(&self, stamp: Timestamp) {
        let window = self.bounds.read().window;
        let horizon = stamp.saturating_sub(window);

        let mut ticks = self.ticks.lock();
        ticks.push_back(stamp);
        while ticks.front().is_some_and(|t| *t < horizon) {
            ticks.pop_front();
        }
        while ticks.len() > MAX_TICKS {
            ticks.pop_front();
        }
    }

    /// Classify the rate over `[now - window, now]`.
    ///
    /// Read-only: calling this twice with the same `now` gives the same
    /// answer.
    pub fn evaluate(&self, now: Timestamp) -> FrequencyStatus {
        let bounds = self.bounds();
        let start = now.saturating_sub(bounds.window);

        let (events, first, last) = {
            let ticks = self.ticks.lock();
            ticks
                .iter()
                .filter(|t| **t >= start && **t <= now)
                .fold((0usize, None::<Timestamp>, None::<Timestamp>), |(n, lo, hi), t| {
                    (
                        n + 1,
                        Some(lo.map_or(*t, |lo| lo.min(*t))),
                        Some(hi.map_or(*t, |hi| hi.max(*t))),
                    )
                })
        };

        let (first, last) = match (first, last) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return FrequencyStatus {
                    class: FrequencyClass::NoData,
                    observed_hz: 0.0,
                    events: 0,
                    bounds: *bounds,
                }
            }
        };

        // Measured up to `now` as well as up to the last tick, so a stream
        // that stops publishing decays instead of holding its old rate.
        let elapsed = now.saturating_duration_since(first).as_secs_f64();
        let until_now = if elapsed > 0.0 {
            events as f64 / elapsed
        } else {
            0.0
        };
        let observed_hz = if last > first {
            let between = (events - 1) as f64 / last.saturating_duration_since(first).as_secs_f64();
            between.min(until_now)
        } else {
            until_now
        };

        let class = if observed_hz < bounds.lower_limit() {
            FrequencyClass::TooSlow
        } else if observed_hz > bounds.upper_limit() {
            FrequencyClass::TooFast
        } else {
            FrequencyClass::Healthy
        };

        FrequencyStatus {
            class,
            observed_hz,
            events,
            bounds: *bounds,
        }
    }

    /// Swap in new bounds. Recorded ticks are kept.
    pub fn set_bounds(&self, bounds: RateWindow) {
        *self.bounds.write() = Arc::new(bounds);
    }

    pub fn bounds(&self) -> Arc<RateWindow> {
        self.bounds.read().clone()
    }

    /// Number of buffered ticks, including ones outside the current window.
    pub fn buffered(&self) -> usize {
        self.ticks.lock().len()
    }
}

impl HealthCheck for FrequencyMonitor {
    fn run(&self, now: Timestamp) -> CheckReport {
        self.evaluate(now).to_report()
    }
}
