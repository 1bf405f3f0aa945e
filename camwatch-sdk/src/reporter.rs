//! Periodic emission of the latest health report.

use std::sync::Arc;
use std::time::Duration;

use camwatch_types::HealthReport;
use tokio::sync::watch;

use crate::output::Output;

/// Forwards the most recent health report to configured outputs.
///
/// The reporter owns a watch channel; hand [`Reporter::sink`] to a publisher
/// and every cycle's report becomes the latest value. A background task
/// started with [`Reporter::start`] writes the latest report to each output
/// at a fixed interval, skipping intervals with nothing new.
///
/// # Example
///
/// ```rust,no_run
/// use camwatch_sdk::{Output, Reporter};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let reporter = Reporter::builder()
///         .output(Output::file("health.json"))
///         .interval(Duration::from_secs(1))
///         .build();
///
///     // Pass `reporter.sink()` to `CameraPublisherBuilder::shared_sink`.
///     let handle = reporter.start();
///
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     handle.stop();
/// }
/// ```
#[derive(Debug)]
pub struct Reporter {
    latest: Arc<watch::Sender<HealthReport>>,
    outputs: Arc<Vec<Output>>,
    interval: Duration,
}

impl Reporter {
    /// Create a reporter with no outputs and a one-second interval.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::new()
    }

    /// A health sink feeding this reporter.
    pub fn sink(&self) -> Arc<watch::Sender<HealthReport>> {
        self.latest.clone()
    }

    /// Watch the latest report directly.
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.latest.subscribe()
    }

    /// The latest report delivered to the sink.
    pub fn latest(&self) -> HealthReport {
        self.latest.borrow().clone()
    }

    /// Start background emission.
    ///
    /// Spawns a tokio task that wakes every interval and, if a new report has
    /// arrived since the last emission, writes it to every output.
    ///
    /// Returns a handle that can be used to stop the emission.
    pub fn start(&self) -> EmissionHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut latest = self.latest.subscribe();
        let outputs = self.outputs.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if !latest.has_changed().unwrap_or(false) {
                            continue;
                        }
                        let report = latest.borrow_and_update().clone();
                        emit_all(&outputs, &report).await;
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        EmissionHandle { stop_tx }
    }

    /// Emit the latest report to all outputs immediately.
    pub async fn emit_now(&self) {
        let report = self.latest();
        emit_all(&self.outputs, &report).await;
    }
}

async fn emit_all(outputs: &[Output], report: &HealthReport) {
    for output in outputs {
        if let Err(e) = output.emit(report).await {
            tracing::warn!(?output, error = %e, "failed to emit health report");
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`Reporter`].
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    outputs: Vec<Output>,
    interval: Option<Duration>,
}

impl ReporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output destination.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the emission interval. Defaults to 1 second.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn build(self) -> Reporter {
        let (latest, _) = watch::channel(HealthReport::default());
        Reporter {
            latest: Arc::new(latest),
            outputs: Arc::new(self.outputs),
            interval: self.interval.unwrap_or(Duration::from_secs(1)),
        }
    }
}

/// Handle for controlling background emission.
///
/// Call `stop()` to end emission.
#[derive(Debug)]
pub struct EmissionHandle {
    stop_tx: watch::Sender<bool>,
}

impl EmissionHandle {
    /// Stop background emission.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::HealthSink;
    use camwatch_types::{CheckReport, Level, Timestamp};

    fn report(level: Level) -> HealthReport {
        HealthReport::builder()
            .hardware_id("cam")
            .stamp(Timestamp::from_secs(1))
            .check_report("check", CheckReport::new(level, "state"))
            .build()
    }

    #[test]
    fn builder_defaults() {
        let reporter = Reporter::builder().build();
        assert_eq!(reporter.interval, Duration::from_secs(1));
        assert!(reporter.outputs.is_empty());

        let reporter = Reporter::builder()
            .output(Output::file("a.json"))
            .output(Output::tcp("localhost:9"))
            .interval(Duration::from_millis(250))
            .build();
        assert_eq!(reporter.outputs.len(), 2);
        assert_eq!(reporter.interval, Duration::from_millis(250));
    }

    #[test]
    fn sink_updates_latest() {
        let reporter = Reporter::new();
        reporter.sink().deliver(&report(Level::Error));
        assert_eq!(reporter.latest().level, Level::Error);
        assert_eq!(reporter.subscribe().borrow().level, Level::Error);
    }

    #[tokio::test]
    async fn emit_now_writes_latest() {
        let (output, mut rx) = Output::channel(4);
        let reporter = Reporter::builder().output(output).build();
        reporter.sink().deliver(&report(Level::Warn));

        reporter.emit_now().await;
        assert_eq!(rx.recv().await.map(|r| r.level), Some(Level::Warn));
    }

    #[tokio::test(start_paused = true)]
    async fn background_emission_skips_stale_intervals() {
        let (output, mut rx) = Output::channel(16);
        let reporter = Reporter::builder()
            .output(output)
            .interval(Duration::from_millis(100))
            .build();
        let handle = reporter.start();

        reporter.sink().deliver(&report(Level::Ok));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(rx.recv().await.map(|r| r.level), Some(Level::Ok));
        assert!(rx.try_recv().is_err());

        reporter.sink().deliver(&report(Level::Error));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.recv().await.map(|r| r.level), Some(Level::Error));

        handle.stop();
    }
}
