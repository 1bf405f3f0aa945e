//! Publication health monitors.
//!
//! Two monitors watch every image topic:
//!
//! - [`FrequencyMonitor`] counts ticks in a sliding window and compares the
//!   observed rate with a [`RateWindow`].
//! - [`TimestampSkewMonitor`] compares each frame's declared stamp with the
//!   time it was actually published, against a [`SkewWindow`].
//!
//! Bounds are immutable values. Reconfiguring a monitor swaps the whole
//! value, so an evaluation never sees a minimum from one configuration and a
//! maximum from another.

use std::time::Duration;

use crate::error::ConfigError;

pub mod frequency;
pub mod timestamp;

pub use frequency::{FrequencyClass, FrequencyMonitor, FrequencyStatus};
pub use timestamp::{SkewStatus, TimestampSkewMonitor};

/// Default length of the frequency window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Default earliest acceptable publication delay, in seconds.
///
/// Negative: a frame may be published slightly before its declared stamp.
pub const DEFAULT_MIN_DELAY: f64 = -0.01;

/// Default latest acceptable publication delay, in seconds.
pub const DEFAULT_MAX_DELAY: f64 = 0.1;

/// Default horizon for timestamp samples.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(5);

/// Upper bound on buffered ticks or samples per monitor.
pub const MAX_TICKS: usize = 10_000;

/// Acceptable publication rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateWindow {
    /// Lowest acceptable rate in Hz.
    pub min_frequency: f64,
    /// Highest acceptable rate in Hz.
    pub max_frequency: f64,
    /// How far back ticks are counted.
    pub window: Duration,
    /// Fraction by which the bounds are widened before a rate is flagged.
    pub tolerance: f64,
}

impl RateWindow {
    /// Create a validated window with no tolerance.
    pub fn new(min_frequency: f64, max_frequency: f64, window: Duration) -> Result<Self, ConfigError> {
        let bounds = Self {
            min_frequency,
            max_frequency,
            window,
            tolerance: 0.0,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Bounds of ±10% around `fps` over [`DEFAULT_WINDOW`].
    pub fn around(fps: f64) -> Result<Self, ConfigError> {
        Self::new(fps * 0.9, fps * 1.1, DEFAULT_WINDOW)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self, ConfigError> {
        self.tolerance = tolerance;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_frequency.is_finite() || !self.max_frequency.is_finite() {
            return Err(ConfigError::InvalidBounds(format!(
                "frequency bounds must be finite, got [{}, {}]",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.min_frequency < 0.0 || self.min_frequency > self.max_frequency {
            return Err(ConfigError::InvalidBounds(format!(
                "expected 0 <= min_frequency <= max_frequency, got [{}, {}]",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidBounds("frequency window must be non-zero".into()));
        }
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(ConfigError::InvalidBounds(format!(
                "tolerance must be in [0, 1), got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Lowest rate that still counts as healthy, tolerance included.
    pub fn lower_limit(&self) -> f64 {
        self.min_frequency * (1.0 - self.tolerance)
    }

    /// Highest rate that still counts as healthy, tolerance included.
    pub fn upper_limit(&self) -> f64 {
        self.max_frequency * (1.0 + self.tolerance)
    }
}

/// Acceptable delay between a frame's declared stamp and its publication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewWindow {
    /// Earliest acceptable delay in seconds; may be negative.
    pub min_delay: f64,
    /// Latest acceptable delay in seconds.
    pub max_delay: f64,
    /// Samples older than this, relative to the evaluation time, are ignored.
    pub horizon: Duration,
}

impl SkewWindow {
    /// Create a validated window with the default horizon.
    pub fn new(min_delay: f64, max_delay: f64) -> Result<Self, ConfigError> {
        let bounds = Self {
            min_delay,
            max_delay,
            horizon: DEFAULT_HORIZON,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Result<Self, ConfigError> {
        self.horizon = horizon;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_delay.is_finite() || !self.max_delay.is_finite() {
            return Err(ConfigError::InvalidBounds(format!(
                "delay bounds must be finite, got [{}, {}]",
                self.min_delay, self.max_delay
            )));
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidBounds(format!(
                "expected min_delay <= max_delay, got [{}, {}]",
                self.min_delay, self.max_delay
            )));
        }
        if self.horizon.is_zero() {
            return Err(ConfigError::InvalidBounds("timestamp horizon must be non-zero".into()));
        }
        Ok(())
    }

    pub(crate) fn min_delay_nanos(&self) -> i64 {
        secs_to_nanos(self.min_delay)
    }

    pub(crate) fn max_delay_nanos(&self) -> i64 {
        secs_to_nanos(self.max_delay)
    }
}

impl Default for SkewWindow {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            horizon: DEFAULT_HORIZON,
        }
    }
}

fn secs_to_nanos(secs: f64) -> i64 {
    (secs * 1e9).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_fps() {
        let bounds = RateWindow::around(10.0).unwrap();
        assert!((bounds.min_frequency - 9.0).abs() < 1e-9);
        assert!((bounds.max_frequency - 11.0).abs() < 1e-9);
        assert_eq!(bounds.window, DEFAULT_WINDOW);
        assert_eq!(bounds.tolerance, 0.0);
    }

    #[test]
    fn rate_window_rejects_nonsense() {
        assert!(RateWindow::new(11.0, 9.0, DEFAULT_WINDOW).is_err());
        assert!(RateWindow::new(-1.0, 9.0, DEFAULT_WINDOW).is_err());
        assert!(RateWindow::new(1.0, f64::NAN, DEFAULT_WINDOW).is_err());
        assert!(RateWindow::new(1.0, 2.0, Duration::ZERO).is_err());
        assert!(RateWindow::new(1.0, 2.0, DEFAULT_WINDOW)
            .unwrap()
            .with_tolerance(1.0)
            .is_err());
    }

    #[test]
    fn tolerance_widens_limits() {
        let bounds = RateWindow::new(10.0, 20.0, DEFAULT_WINDOW)
            .unwrap()
            .with_tolerance(0.5)
            .unwrap();
        assert_eq!(bounds.lower_limit(), 5.0);
        assert_eq!(bounds.upper_limit(), 30.0);
    }

    #[test]
    fn skew_window_defaults() {
        let bounds = SkewWindow::default();
        assert_eq!(bounds.min_delay_nanos(), -10_000_000);
        assert_eq!(bounds.max_delay_nanos(), 100_000_000);
        assert_eq!(bounds.horizon, DEFAULT_HORIZON);
        assert!(bounds.validate().is_ok());
    }

    #[test]
    fn skew_window_rejects_nonsense() {
        assert!(SkewWindow::new(0.2, 0.1).is_err());
        assert!(SkewWindow::new(f64::INFINITY, 0.1).is_err());
        assert!(SkewWindow::new(0.0, 0.1).unwrap().with_horizon(Duration::ZERO).is_err());
        assert!(SkewWindow::new(0.1, 0.1).is_ok());
    }
}
