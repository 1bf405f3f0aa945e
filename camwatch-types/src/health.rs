//! Health reports - a point-in-time view of publication health.

use std::collections::BTreeMap;
use std::fmt;

use crate::{SchemaVersion, Timestamp};

/// Severity of a single check or of a whole report.
///
/// Ordered so that the worst of several levels is simply their `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum Level {
    #[default]
    #[cfg_attr(feature = "minicbor", n(0))]
    Ok,
    #[cfg_attr(feature = "minicbor", n(1))]
    Warn,
    #[cfg_attr(feature = "minicbor", n(2))]
    Error,
}

impl Level {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Level::Ok
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Result of running one named health check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct CheckReport {
    #[cfg_attr(feature = "minicbor", n(0))]
    pub level: Level,

    /// Human readable summary.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub message: String,

    /// Key/value details (observed rate, bounds, sample counts...).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    #[cfg_attr(feature = "minicbor", n(2))]
    pub values: BTreeMap<String, String>,
}

impl CheckReport {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Level::Ok, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Level::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Create a builder for a check report.
    pub fn builder() -> CheckReportBuilder {
        CheckReportBuilder::new()
    }

    /// Attach a key/value detail.
    pub fn with_value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    /// Look up a detail value.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// A consolidated health report across every registered check.
///
/// Reports are derived fresh from monitor state on every evaluation; they are
/// never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct HealthReport {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub version: SchemaVersion,

    /// Hardware identity of the reporting device.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub hardware_id: String,

    /// When the checks were evaluated.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub stamp: Timestamp,

    /// Worst level across all checks (`Ok` when there are none).
    #[cfg_attr(feature = "minicbor", n(3))]
    pub level: Level,

    /// Check results keyed by check name.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub checks: BTreeMap<String, CheckReport>,
}

impl HealthReport {
    /// Create an empty report (overall `Ok`).
    pub fn new(hardware_id: impl Into<String>, stamp: Timestamp) -> Self {
        Self {
            version: SchemaVersion::current(),
            hardware_id: hardware_id.into(),
            stamp,
            level: Level::Ok,
            checks: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing reports.
    pub fn builder() -> HealthReportBuilder {
        HealthReportBuilder::new()
    }

    /// Add a check result and fold its level into the overall level.
    pub fn insert(&mut self, name: impl Into<String>, check: CheckReport) {
        self.checks.insert(name.into(), check);
        self.level = worst_level(self.checks.values());
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn get(&self, name: &str) -> Option<&CheckReport> {
        self.checks.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CheckReport)> {
        self.checks.iter()
    }

    /// Checks that are not `Ok`, worst first, then by name.
    pub fn unhealthy(&self) -> Vec<(&String, &CheckReport)> {
        let mut result: Vec<_> = self.checks.iter().filter(|(_, c)| !c.level.is_ok()).collect();
        result.sort_by(|a, b| b.1.level.cmp(&a.1.level).then_with(|| a.0.cmp(b.0)));
        result
    }
}

fn worst_level<'a>(checks: impl Iterator<Item = &'a CheckReport>) -> Level {
    checks.map(|c| c.level).max().unwrap_or(Level::Ok)
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for `CheckReport`.
#[derive(Debug, Default)]
pub struct CheckReportBuilder {
    level: Level,
    message: String,
    values: BTreeMap<String, String>,
}

impl CheckReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn build(self) -> CheckReport {
        CheckReport {
            level: self.level,
            message: self.message,
            values: self.values,
        }
    }
}

/// Builder for `HealthReport`.
#[derive(Debug, Default)]
pub struct HealthReportBuilder {
    hardware_id: String,
    stamp: Option<Timestamp>,
    checks: BTreeMap<String, CheckReport>,
}

impl HealthReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hardware_id(mut self, id: impl Into<String>) -> Self {
        self.hardware_id = id.into();
        self
    }

    /// Set the evaluation time. Defaults to the current system time.
    pub fn stamp(mut self, stamp: Timestamp) -> Self {
        self.stamp = Some(stamp);
        self
    }

    /// Add a check built using a closure.
    pub fn check<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(CheckReportBuilder) -> CheckReportBuilder,
    {
        let check = f(CheckReportBuilder::new()).build();
        self.checks.insert(name.into(), check);
        self
    }

    /// Add a pre-built check.
    pub fn check_report(mut self, name: impl Into<String>, check: CheckReport) -> Self {
        self.checks.insert(name.into(), check);
        self
    }

    pub fn build(self) -> HealthReport {
        let level = worst_level(self.checks.values());
        HealthReport {
            version: SchemaVersion::current(),
            hardware_id: self.hardware_id,
            stamp: self.stamp.unwrap_or_else(Timestamp::now),
            level,
            checks: self.checks,
        }
    }
}
