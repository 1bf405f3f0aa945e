//! Destinations for the health report produced every cycle.

use camwatch_types::{HealthReport, Level};
use tracing::{debug, error, info, warn};

/// Receives each cycle's health report.
///
/// Delivery is best effort and must not block the publishing cycle.
pub trait HealthSink: Send + Sync {
    fn deliver(&self, report: &HealthReport);
}

/// Logs health reports through `tracing`.
///
/// Only level changes are logged at their own severity; repeated reports at
/// the same level go to `debug`.
#[derive(Debug, Default)]
pub struct LogSink {
    last: parking_lot::Mutex<Option<Level>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HealthSink for LogSink {
    fn deliver(&self, report: &HealthReport) {
        let previous = self.last.lock().replace(report.level);
        if previous == Some(report.level) {
            debug!(level = %report.level, checks = report.len(), "health unchanged");
            return;
        }

        let failing: Vec<String> = report
            .unhealthy()
            .into_iter()
            .map(|(name, check)| format!("{name}: {}", check.message))
            .collect();
        let failing = failing.join("; ");

        match report.level {
            Level::Ok => info!(hardware_id = %report.hardware_id, "camera healthy"),
            Level::Warn => warn!(hardware_id = %report.hardware_id, %failing, "camera degraded"),
            Level::Error => error!(hardware_id = %report.hardware_id, %failing, "camera unhealthy"),
        }
    }
}

#[cfg(feature = "tokio")]
impl HealthSink for tokio::sync::watch::Sender<HealthReport> {
    fn deliver(&self, report: &HealthReport) {
        self.send_replace(report.clone());
    }
}

#[cfg(feature = "tokio")]
impl HealthSink for tokio::sync::mpsc::Sender<HealthReport> {
    fn deliver(&self, report: &HealthReport) {
        if self.try_send(report.clone()).is_err() {
            debug!("health report dropped; channel full or closed");
        }
    }
}
