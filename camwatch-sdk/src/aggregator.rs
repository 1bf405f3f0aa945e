//! Registry of named health checks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use camwatch_types::{CheckReport, HealthReport, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

/// A named diagnostic that can be evaluated on demand.
///
/// Implemented by the monitors, by the calibration check, and by any closure
/// `Fn(Timestamp) -> CheckReport`.
pub trait HealthCheck: Send + Sync {
    /// Evaluate the check as of `now`.
    fn run(&self, now: Timestamp) -> CheckReport;
}

impl<F> HealthCheck for F
where
    F: Fn(Timestamp) -> CheckReport + Send + Sync,
{
    fn run(&self, now: Timestamp) -> CheckReport {
        self(now)
    }
}

/// Consolidates named checks into a single [`HealthReport`].
///
/// Registering under an existing name first removes the old entry, so a
/// reconfigured check never leaves a stale twin behind.
///
/// # Example
///
/// ```rust
/// use camwatch_sdk::DiagnosticAggregator;
/// use camwatch_types::{CheckReport, Level, Timestamp};
///
/// let aggregator = DiagnosticAggregator::new();
/// aggregator.set_hardware_id("cam-0042");
/// aggregator.register("power", |_now: Timestamp| CheckReport::ok("nominal"));
/// aggregator.register("link", |_now: Timestamp| CheckReport::warn("retrying"));
///
/// let report = aggregator.evaluate_at(Timestamp::from_secs(1));
/// assert_eq!(report.level, Level::Warn);
/// assert_eq!(report.len(), 2);
/// ```
pub struct DiagnosticAggregator {
    checks: RwLock<BTreeMap<String, Arc<dyn HealthCheck>>>,
    hardware_id: RwLock<String>,
    clock: Arc<dyn Clock>,
    evaluations: AtomicU64,
    warned_missing_id: AtomicBool,
}

impl DiagnosticAggregator {
    /// Create an aggregator on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            checks: RwLock::new(BTreeMap::new()),
            hardware_id: RwLock::new(String::new()),
            clock,
            evaluations: AtomicU64::new(0),
            warned_missing_id: AtomicBool::new(false),
        }
    }

    /// Register `check` under `name`, replacing any existing entry.
    ///
    /// Returns the check that was replaced, if any.
    pub fn register(
        &self,
        name: impl Into<String>,
        check: impl HealthCheck + 'static,
    ) -> Option<Arc<dyn HealthCheck>> {
        self.replace(name, Arc::new(check))
    }

    /// Register a shared check under `name`, removing any existing entry
    /// first.
    pub fn replace(
        &self,
        name: impl Into<String>,
        check: Arc<dyn HealthCheck>,
    ) -> Option<Arc<dyn HealthCheck>> {
        let name = name.into();
        let mut checks = self.checks.write();
        let previous = checks.remove(&name);
        if previous.is_some() {
            debug!(check = %name, "replacing health check");
        }
        checks.insert(name, check);
        previous
    }

    /// Swap several checks as one step.
    ///
    /// Every named entry is removed before any new one is inserted, all under
    /// a single registry write, so an evaluation sees either the old set or
    /// the new set.
    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn HealthCheck>)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut checks = self.checks.write();
        for (name, _) in &entries {
            if checks.remove(name).is_some() {
                debug!(check = %name, "tearing down health check");
            }
        }
        checks.extend(entries);
    }

    /// Remove the check registered under `name`.
    ///
    /// Returns `true` if a check was removed.
    pub fn unregister(&self, name: &str) -> bool {
        self.checks.write().remove(name).is_some()
    }

    pub fn set_hardware_id(&self, id: impl Into<String>) {
        *self.hardware_id.write() = id.into();
    }

    pub fn hardware_id(&self) -> String {
        self.hardware_id.read().clone()
    }

    /// Evaluate every check as of the aggregator's clock.
    pub fn evaluate_all(&self) -> HealthReport {
        self.evaluate_at(self.clock.now())
    }

    /// Evaluate every check as of `now`.
    ///
    /// Checks run outside the registry lock, so a check may itself register
    /// or unregister entries without deadlocking.
    pub fn evaluate_at(&self, now: Timestamp) -> HealthReport {
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self
            .checks
            .read()
            .iter()
            .map(|(name, check)| (name.clone(), check.clone()))
            .collect();

        let hardware_id = self.hardware_id();
        if hardware_id.is_empty() && !self.warned_missing_id.swap(true, Ordering::Relaxed) {
            warn!("no hardware id set; health reports will carry an empty hardware id");
        }

        let mut report = HealthReport::new(hardware_id, now);
        for (name, check) in checks {
            report.insert(name, check.run(now));
        }

        self.evaluations.fetch_add(1, Ordering::Relaxed);
        report
    }

    /// How many times the checks have been evaluated.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn check_names(&self) -> Vec<String> {
        self.checks.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.checks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.read().is_empty()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for DiagnosticAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DiagnosticAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAggregator")
            .field("checks", &self.check_names())
            .field("hardware_id", &self.hardware_id())
            .field("clock", &self.clock)
            .field("evaluations", &self.evaluations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use camwatch_types::Level;

    fn ok(_: Timestamp) -> CheckReport {
        CheckReport::ok("fine")
    }

    #[test]
    fn empty_report_is_ok() {
        let aggregator = DiagnosticAggregator::new();
        let report = aggregator.evaluate_at(Timestamp::from_secs(1));
        assert!(report.is_empty());
        assert_eq!(report.level, Level::Ok);
        assert_eq!(aggregator.evaluations(), 1);
    }

    #[test]
    fn worst_level_wins() {
        let aggregator = DiagnosticAggregator::new();
        aggregator.register("a", ok);
        aggregator.register("b", |_: Timestamp| CheckReport::error("down"));
        aggregator.register("c", |_: Timestamp| CheckReport::warn("slow"));

        let report = aggregator.evaluate_at(Timestamp::ZERO);
        assert_eq!(report.level, Level::Error);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn reregistration_replaces() {
        let aggregator = DiagnosticAggregator::new();
        assert!(aggregator.register("link", ok).is_none());
        let previous = aggregator.register("link", |_: Timestamp| CheckReport::warn("retrying"));

        assert!(previous.is_some());
        assert_eq!(aggregator.len(), 1);
        let report = aggregator.evaluate_at(Timestamp::ZERO);
        assert_eq!(report.get("link").map(|c| c.level), Some(Level::Warn));
    }

    #[test]
    fn replace_all_swaps_as_a_set() {
        let aggregator = DiagnosticAggregator::new();
        aggregator.register("keep", ok);
        aggregator.register("rate", |_: Timestamp| CheckReport::error("old"));

        let rate: Arc<dyn HealthCheck> = Arc::new(|_: Timestamp| CheckReport::ok("new"));
        let skew: Arc<dyn HealthCheck> = Arc::new(|_: Timestamp| CheckReport::warn("new"));
        aggregator.replace_all([("rate".to_string(), rate), ("skew".to_string(), skew)]);

        assert_eq!(aggregator.check_names(), vec!["keep", "rate", "skew"]);
        let report = aggregator.evaluate_at(Timestamp::ZERO);
        assert_eq!(report.get("rate").map(|c| c.message.as_str()), Some("new"));
        assert_eq!(report.level, Level::Warn);
    }

    #[test]
    fn unregister() {
        let aggregator = DiagnosticAggregator::new();
        aggregator.register("a", ok);
        assert!(aggregator.unregister("a"));
        assert!(!aggregator.unregister("a"));
        assert!(aggregator.is_empty());
    }

    #[test]
    fn hardware_id_overrides() {
        let aggregator = DiagnosticAggregator::new();
        aggregator.set_hardware_id("first");
        aggregator.set_hardware_id("second");
        assert_eq!(aggregator.evaluate_at(Timestamp::ZERO).hardware_id, "second");
    }

    #[test]
    fn evaluate_all_uses_clock() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(42)));
        let aggregator = DiagnosticAggregator::with_clock(clock.clone());
        aggregator.register("stamp", |now: Timestamp| {
            CheckReport::ok("seen").with_value("now", now)
        });

        let report = aggregator.evaluate_all();
        assert_eq!(report.stamp, Timestamp::from_secs(42));
        assert_eq!(
            report.get("stamp").and_then(|c| c.value("now")),
            Some("42.000000000")
        );
    }

    #[test]
    fn names_are_sorted() {
        let aggregator = DiagnosticAggregator::new();
        aggregator.register("zeta", ok);
        aggregator.register("alpha", ok);
        assert_eq!(aggregator.check_names(), vec!["alpha", "zeta"]);
        assert!(aggregator.contains("zeta"));
    }

    #[test]
    fn check_may_touch_registry() {
        let aggregator = Arc::new(DiagnosticAggregator::new());
        let inner = Arc::downgrade(&aggregator);
        aggregator.register("self", move |_: Timestamp| {
            let count = inner.upgrade().map(|a| a.len()).unwrap_or_default();
            CheckReport::ok("registry readable").with_value("checks", count)
        });

        let report = aggregator.evaluate_at(Timestamp::ZERO);
        assert_eq!(report.get("self").and_then(|c| c.value("checks")), Some("1"));
    }
}
