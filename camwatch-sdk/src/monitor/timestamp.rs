//! Declared-stamp versus publication-time skew monitor.

use std::collections::VecDeque;
use std::sync::Arc;

use camwatch_types::{CheckReport, Level, Timestamp};
use parking_lot::{Mutex, RwLock};

use super::{SkewWindow, MAX_TICKS};
use crate::aggregator::HealthCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sample {
    arrival: Timestamp,
    /// `arrival - declared`, in nanoseconds.
    delta_ns: i64,
    /// The declared stamp was never set.
    zero: bool,
}

/// Result of one skew evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SkewStatus {
    pub level: Level,
    /// Samples inside the horizon.
    pub samples: usize,
    /// Smallest delay seen, in seconds.
    pub min_delta: Option<f64>,
    /// Largest delay seen, in seconds.
    pub max_delta: Option<f64>,
    /// Samples published earlier than `min_delay` allows.
    pub early: usize,
    /// Samples published later than `max_delay` allows.
    pub late: usize,
    /// Samples whose declared stamp was zero; excluded from the delays.
    pub zero: usize,
    /// Bounds the evaluation used.
    pub bounds: SkewWindow,
}

impl SkewStatus {
    pub fn message(&self) -> &'static str {
        if self.zero > 0 {
            return "Zero timestamp seen.";
        }
        match (self.samples, self.early > 0, self.late > 0) {
            (0, _, _) => "no timestamps received",
            (_, false, false) => "Timestamps are reasonable.",
            (_, true, false) => "Timestamps too far in future seen.",
            (_, false, true) => "Timestamps too far in past seen.",
            (_, true, true) => "Timestamps too far in future and past seen.",
        }
    }

    pub fn to_report(&self) -> CheckReport {
        let mut report = CheckReport::new(self.level, self.message())
            .with_value("samples", self.samples)
            .with_value("min_acceptable_delay", self.bounds.min_delay)
            .with_value("max_acceptable_delay", self.bounds.max_delay);
        if self.zero > 0 {
            report = report.with_value("zero_stamps", self.zero);
        }
        if let (Some(min), Some(max)) = (self.min_delta, self.max_delta) {
            report = report
                .with_value("earliest_delay", format!("{min:.6}"))
                .with_value("latest_delay", format!("{max:.6}"))
                .with_value("early", self.early)
                .with_value("late", self.late);
        }
        report
    }
}

/// Tracks `arrival - declared` deltas and classifies them against bounds.
///
/// Bounds are inclusive and compared in whole nanoseconds. A delta outside
/// the bounds by no more than the width of the band is a warning; further out
/// is an error.
///
/// ```rust
/// use camwatch_sdk::monitor::{SkewWindow, TimestampSkewMonitor};
/// use camwatch_types::{Level, Timestamp};
///
/// let monitor = TimestampSkewMonitor::new(SkewWindow::default());
/// monitor.tick(Timestamp::from_secs(1), Timestamp::from_millis(1020));
///
/// assert_eq!(monitor.evaluate(Timestamp::from_secs(2)).level, Level::Ok);
/// ```
#[derive(Debug)]
pub struct TimestampSkewMonitor {
    bounds: RwLock<Arc<SkewWindow>>,
    samples: Mutex<VecDeque<Sample>>,
}

impl TimestampSkewMonitor {
    pub fn new(bounds: SkewWindow) -> Self {
        Self {
            bounds: RwLock::new(Arc::new(bounds)),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a frame declared at `declared` and published at `arrival`.
    pub fn tick(&self, declared: Timestamp, arrival: Timestamp) {
        let horizon = self.bounds.read().horizon;
        let oldest = arrival.saturating_sub(horizon);

        let mut samples = self.samples.lock();
        samples.push_back(Sample {
            arrival,
            delta_ns: arrival.signed_nanos_since(declared),
            zero: declared == Timestamp::ZERO,
        });
        while samples.front().is_some_and(|s| s.arrival < oldest) {
            samples.pop_front();
        }
        while samples.len() > MAX_TICKS {
            samples.pop_front();
        }
    }

    /// Classify samples that arrived in `[now - horizon, now]`.
    pub fn evaluate(&self, now: Timestamp) -> SkewStatus {
        let bounds = self.bounds();
        let start = now.saturating_sub(bounds.horizon);
        let lo = bounds.min_delay_nanos();
        let hi = bounds.max_delay_nanos();

        let mut status = SkewStatus {
            level: Level::Warn,
            samples: 0,
            min_delta: None,
            max_delta: None,
            early: 0,
            late: 0,
            zero: 0,
            bounds: *bounds,
        };

        let mut min_ns = i64::MAX;
        let mut max_ns = i64::MIN;
        {
            let samples = self.samples.lock();
            for sample in samples.iter().filter(|s| s.arrival >= start && s.arrival <= now) {
                status.samples += 1;
                if sample.zero {
                    status.zero += 1;
                    continue;
                }
                min_ns = min_ns.min(sample.delta_ns);
                max_ns = max_ns.max(sample.delta_ns);
                if sample.delta_ns < lo {
                    status.early += 1;
                } else if sample.delta_ns > hi {
                    status.late += 1;
                }
            }
        }

        if status.samples == 0 {
            return status;
        }
        status.level = if status.zero > 0 { Level::Error } else { Level::Ok };
        if status.zero == status.samples {
            return status;
        }

        status.min_delta = Some(min_ns as f64 / 1e9);
        status.max_delta = Some(max_ns as f64 / 1e9);

        let excess = (lo as i128 - min_ns as i128).max(max_ns as i128 - hi as i128);
        let band = hi as i128 - lo as i128;
        let level = if excess <= 0 {
            Level::Ok
        } else if excess <= band {
            Level::Warn
        } else {
            Level::Error
        };
        status.level = status.level.max(level);
        status
    }

    /// Swap in new bounds. Recorded samples are kept.
    pub fn set_bounds(&self, bounds: SkewWindow) {
        *self.bounds.write() = Arc::new(bounds);
    }

    pub fn bounds(&self) -> Arc<SkewWindow> {
        self.bounds.read().clone()
    }
}

impl HealthCheck for TimestampSkewMonitor {
    fn run(&self, now: Timestamp) -> CheckReport {
        self.evaluate(now).to_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor() -> TimestampSkewMonitor {
        TimestampSkewMonitor::new(SkewWindow::default())
    }

    fn at(declared_ns: u64, delta_ns: i64) -> (Timestamp, Timestamp) {
        let arrival = (declared_ns as i64 + delta_ns) as u64;
        (Timestamp::from_nanos(declared_ns), Timestamp::from_nanos(arrival))
    }

    const BASE: u64 = 1_000_000_000;

    #[test]
    fn nothing_received_warns() {
        let status = monitor().evaluate(Timestamp::from_secs(3));
        assert_eq!(status.level, Level::Warn);
        assert_eq!(status.message(), "no timestamps received");
        assert_eq!(status.min_delta, None);
    }

    #[test]
    fn bounds_are_inclusive() {
        for delta in [-10_000_000, 0, 100_000_000] {
            let m = monitor();
            let (declared, arrival) = at(BASE, delta);
            m.tick(declared, arrival);
            assert_eq!(m.evaluate(arrival).level, Level::Ok, "delta {delta}");
        }
    }

    #[test]
    fn one_nanosecond_outside_is_flagged() {
        let late = monitor();
        let (declared, arrival) = at(BASE, 100_000_001);
        late.tick(declared, arrival);
        let status = late.evaluate(arrival);
        assert_eq!(status.level, Level::Warn);
        assert_eq!(status.late, 1);
        assert_eq!(status.message(), "Timestamps too far in past seen.");

        let early = monitor();
        let (declared, arrival) = at(BASE, -10_000_001);
        early.tick(declared, arrival);
        let status = early.evaluate(arrival);
        assert_eq!(status.level, Level::Warn);
        assert_eq!(status.early, 1);
        assert_eq!(status.message(), "Timestamps too far in future seen.");
    }

    #[test]
    fn far_outside_is_error() {
        let m = monitor();
        // 110 ms band; 0.1 s + 0.11 s + 1 ns late.
        let (declared, arrival) = at(BASE, 210_000_001);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival).level, Level::Error);

        let m = monitor();
        let (declared, arrival) = at(BASE, 210_000_000);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival).level, Level::Warn);
    }

    #[test]
    fn worst_sample_decides() {
        let m = monitor();
        for (i, delta) in [0i64, 50_000_000, -20_000_000].into_iter().enumerate() {
            let (declared, arrival) = at(BASE + i as u64 * 100_000_000, delta);
            m.tick(declared, arrival);
        }
        let status = m.evaluate(Timestamp::from_secs(2));
        assert_eq!(status.level, Level::Warn);
        assert_eq!(status.samples, 3);
        assert_eq!(status.early, 1);
        assert_eq!(status.late, 0);
    }

    #[test]
    fn stale_samples_fall_out_of_horizon() {
        let m = monitor();
        let (declared, arrival) = at(BASE, 500_000_000);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival).level, Level::Error);

        let later = arrival + Duration::from_secs(6);
        assert_eq!(m.evaluate(later).samples, 0);
        assert_eq!(m.evaluate(later).message(), "no timestamps received");
    }

    #[test]
    fn negative_min_delay_tolerates_future_stamps() {
        let m = monitor();
        // Published 5 ms before its declared stamp.
        let (declared, arrival) = at(BASE, -5_000_000);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival).level, Level::Ok);
    }

    #[test]
    fn zero_stamp_is_reported_on_its_own() {
        let m = monitor();
        let arrival = Timestamp::from_secs(30);
        m.tick(Timestamp::ZERO, arrival);

        let status = m.evaluate(arrival);
        assert_eq!(status.level, Level::Error);
        assert_eq!(status.zero, 1);
        assert_eq!(status.late, 0);
        assert_eq!(status.max_delta, None);
        assert_eq!(status.message(), "Zero timestamp seen.");
        assert_eq!(m.run(arrival).value("zero_stamps"), Some("1"));

        // Valid samples alongside keep their own statistics.
        let (declared, arrival) = at(30 * BASE, 20_000_000);
        m.tick(declared, arrival);
        let status = m.evaluate(arrival);
        assert_eq!(status.samples, 2);
        assert_eq!(status.zero, 1);
        assert_eq!(status.max_delta, Some(0.02));
        assert_eq!(status.level, Level::Error);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let m = monitor();
        let (declared, arrival) = at(BASE, 20_000_000);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival), m.evaluate(arrival));
    }

    #[test]
    fn report_values() {
        let m = monitor();
        let (declared, arrival) = at(BASE, 20_000_000);
        m.tick(declared, arrival);

        let report = m.run(arrival);
        assert_eq!(report.level, Level::Ok);
        assert_eq!(report.value("samples"), Some("1"));
        assert_eq!(report.value("latest_delay"), Some("0.020000"));
        assert_eq!(report.value("max_acceptable_delay"), Some("0.1"));
    }

    #[test]
    fn set_bounds_swaps_whole_value() {
        let m = monitor();
        let (declared, arrival) = at(BASE, 150_000_000);
        m.tick(declared, arrival);
        assert_eq!(m.evaluate(arrival).level, Level::Warn);

        m.set_bounds(SkewWindow::new(0.0, 0.2).unwrap());
        assert_eq!(m.bounds().max_delay, 0.2);
        assert_eq!(m.evaluate(arrival).level, Level::Ok);
    }
}
