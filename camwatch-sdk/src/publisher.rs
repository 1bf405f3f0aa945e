//! The health-monitored publication pipeline.
//!
//! A [`CameraPublisher`] wraps an acquisition routine. Every cycle it grabs a
//! frame, stamps it with the camera's identity, attaches the current
//! calibration snapshot, hands the pair to the transport and feeds the topic
//! monitors. Health is evaluated at the end of every cycle, including cycles
//! where acquisition failed, so an outage shows up as missing data instead of
//! silence.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camwatch_types::{CameraInfo, Frame, HealthReport, Identity, Timestamp};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::acquire::Acquire;
use crate::aggregator::{DiagnosticAggregator, HealthCheck};
use crate::calibration::{CalibrationCheck, CalibrationStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{AcquisitionError, ConfigError};
use crate::monitor::{FrequencyMonitor, RateWindow, SkewWindow, TimestampSkewMonitor};
use crate::params::{CameraParams, ParamSource};
use crate::sink::HealthSink;
use crate::transport::Transport;

/// Name of the calibration health check.
pub const CALIBRATION_CHECK: &str = "calibration";

/// What one call to [`CameraPublisher::publish_cycle`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Sequence number of the published frame, or why nothing was published.
    pub result: Result<u64, AcquisitionError>,
    /// Health as evaluated at the end of the cycle.
    pub report: HealthReport,
}

impl CycleOutcome {
    pub fn published(&self) -> bool {
        self.result.is_ok()
    }

    pub fn seq(&self) -> Option<u64> {
        self.result.as_ref().ok().copied()
    }
}

/// Running totals for a publisher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Cycles run, idle cycles included.
    pub cycles: u64,
    /// Frames handed to the transport.
    pub published: u64,
    /// Cycles where acquisition failed.
    pub acquisition_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    published: AtomicU64,
    acquisition_failures: AtomicU64,
}

/// The frequency and timestamp monitors for one topic, replaced as a unit.
#[derive(Debug)]
struct TopicMonitors {
    frequency: Arc<FrequencyMonitor>,
    skew: Arc<TimestampSkewMonitor>,
}

impl TopicMonitors {
    fn new(rate: RateWindow, skew: SkewWindow) -> Self {
        Self {
            frequency: Arc::new(FrequencyMonitor::new(rate)),
            skew: Arc::new(TimestampSkewMonitor::new(skew)),
        }
    }
}

/// Publishes frames and keeps their health under continuous evaluation.
///
/// All methods take `&self`; the publisher can be shared behind an `Arc`
/// and reconfigured from another thread while cycles run.
///
/// # Example
///
/// ```rust
/// use camwatch_sdk::{CameraParams, CameraPublisher, ChannelTransport, Clock, ManualClock, TestPattern};
/// use camwatch_types::{Level, Timestamp};
/// use std::sync::Arc;
///
/// let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1)));
/// let publisher = CameraPublisher::builder()
///     .params(CameraParams::new("camera", "front", "none"))
///     .acquire(TestPattern::new(8, 8))
///     .transport(Arc::new(ChannelTransport::new(4)))
///     .clock(clock.clone())
///     .build()
///     .unwrap();
///
/// let cycle = publisher.publish_cycle(clock.now());
/// assert_eq!(cycle.seq(), Some(1));
///
/// // Not calibrated, and one tick is not a rate yet.
/// assert_eq!(cycle.report.level, Level::Warn);
/// ```
pub struct CameraPublisher {
    identity: RwLock<Identity>,
    topic: String,
    fps: RwLock<f64>,
    calibration: Arc<CalibrationStore>,
    aggregator: Arc<DiagnosticAggregator>,
    transport: Arc<dyn Transport>,
    acquire: Mutex<Box<dyn Acquire>>,
    sinks: Vec<Arc<dyn HealthSink>>,
    clock: Arc<dyn Clock>,
    monitors: RwLock<Arc<TopicMonitors>>,
    seq: AtomicU64,
    counters: Counters,
    last_report: RwLock<Option<HealthReport>>,
}

impl CameraPublisher {
    pub fn builder() -> CameraPublisherBuilder {
        CameraPublisherBuilder::new()
    }

    /// Run one full cycle: acquire, stamp, publish, tick, evaluate.
    ///
    /// Acquisition failures are logged and counted; the cycle still
    /// evaluates and delivers health.
    pub fn publish_cycle(&self, now: Timestamp) -> CycleOutcome {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let grabbed = self.acquire.lock().grab(now);
        let result = match grabbed {
            Ok(mut frame) => {
                frame.header.stamp = now;
                Ok(self.stamp_and_publish(frame))
            }
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "frame acquisition failed");
                self.counters.acquisition_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        };

        CycleOutcome {
            result,
            report: self.evaluate(),
        }
    }

    /// Publish a frame acquired elsewhere.
    ///
    /// The frame keeps its own stamp; identity fields and the sequence number
    /// are overwritten.
    pub fn publish_existing(&self, frame: Frame) -> HealthReport {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        self.stamp_and_publish(frame);
        self.evaluate()
    }

    /// Evaluate and deliver health without acquiring.
    pub fn idle_cycle(&self) -> HealthReport {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        self.evaluate()
    }

    fn stamp_and_publish(&self, mut frame: Frame) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let identity = self.identity.read();
            frame.header.frame_id.clone_from(&identity.frame_id);
            frame.source.clone_from(&identity.logical_name);
        }
        frame.header.seq = seq;

        let stamp = frame.header.stamp;
        let info = CameraInfo::new(frame.header.clone(), self.calibration.snapshot());
        let monitors = self.monitors.read().clone();

        self.transport.publish(frame, info);
        monitors.frequency.tick(stamp);
        monitors.skew.tick(stamp, self.clock.now());

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %self.topic, seq, %stamp, "published frame");
        seq
    }

    fn evaluate(&self) -> HealthReport {
        let report = self.aggregator.evaluate_all();
        for sink in &self.sinks {
            sink.deliver(&report);
        }
        *self.last_report.write() = Some(report.clone());
        report
    }

    /// Replace the topic diagnostics with new bounds.
    ///
    /// `window` is the frequency window; delays are in seconds.
    pub fn set_rate_bounds(
        &self,
        min_frequency: f64,
        max_frequency: f64,
        window: Duration,
        min_delay: f64,
        max_delay: f64,
    ) -> Result<(), ConfigError> {
        let rate = RateWindow::new(min_frequency, max_frequency, window)?;
        let skew = SkewWindow::new(min_delay, max_delay)?;
        self.set_topic_diagnostics(rate, skew)
    }

    /// Tear down both topic checks and register fresh monitors.
    ///
    /// The new monitors start with no history.
    pub fn set_topic_diagnostics(&self, rate: RateWindow, skew: SkewWindow) -> Result<(), ConfigError> {
        rate.validate()?;
        skew.validate()?;
        self.install_monitors(rate, skew);

        info!(
            topic = %self.topic,
            min_frequency = rate.min_frequency,
            max_frequency = rate.max_frequency,
            window_s = rate.window.as_secs_f64(),
            min_delay = skew.min_delay,
            max_delay = skew.max_delay,
            "topic diagnostics reconfigured"
        );
        Ok(())
    }

    fn install_monitors(&self, rate: RateWindow, skew: SkewWindow) {
        let mut current = self.monitors.write();
        let fresh = Arc::new(TopicMonitors::new(rate, skew));
        self.register_monitors(&fresh);
        *current = fresh;
    }

    fn register_monitors(&self, monitors: &TopicMonitors) {
        let frequency: Arc<dyn HealthCheck> = monitors.frequency.clone();
        let timestamp: Arc<dyn HealthCheck> = monitors.skew.clone();
        self.aggregator.replace_all([
            (self.frequency_check_name(), frequency),
            (self.timestamp_check_name(), timestamp),
        ]);
    }

    /// Current frequency bounds.
    pub fn rate_bounds(&self) -> RateWindow {
        *self.monitors.read().frequency.bounds()
    }

    /// Current timestamp bounds.
    pub fn skew_bounds(&self) -> SkewWindow {
        *self.monitors.read().skew.bounds()
    }

    pub fn set_hardware_id(&self, id: impl Into<String>) {
        let id = id.into();
        self.aggregator.set_hardware_id(id.clone());
        self.identity.write().hardware_id = id;
    }

    pub fn identity(&self) -> Identity {
        self.identity.read().clone()
    }

    pub fn frame_id(&self) -> String {
        self.identity.read().frame_id.clone()
    }

    pub fn identifier(&self) -> String {
        self.identity.read().identifier.clone()
    }

    /// Image topic, `<namespace>/image_raw`.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn frequency_check_name(&self) -> String {
        format!("{} frequency", self.topic)
    }

    pub fn timestamp_check_name(&self) -> String {
        format!("{} timestamp", self.topic)
    }

    /// Nominal frame rate.
    pub fn fps(&self) -> f64 {
        *self.fps.read()
    }

    /// Change the nominal frame rate.
    ///
    /// Diagnostic bounds are left alone; call
    /// [`set_rate_bounds`](Self::set_rate_bounds) to follow the new rate.
    pub fn set_fps(&self, fps: f64) -> Result<(), ConfigError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "fps".into(),
                reason: format!("expected a positive frame rate, got {fps}"),
            });
        }
        *self.fps.write() = fps;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.transport.subscriber_count()
    }

    /// The report delivered at the end of the most recent cycle.
    pub fn last_report(&self) -> Option<HealthReport> {
        self.last_report.read().clone()
    }

    pub fn calibration(&self) -> &Arc<CalibrationStore> {
        &self.calibration
    }

    pub fn aggregator(&self) -> &Arc<DiagnosticAggregator> {
        &self.aggregator
    }

    /// The clock used for arrival stamps and evaluation.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            published: self.counters.published.load(Ordering::Relaxed),
            acquisition_failures: self.counters.acquisition_failures.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for CameraPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraPublisher")
            .field("identity", &*self.identity.read())
            .field("topic", &self.topic)
            .field("fps", &self.fps())
            .field("aggregator", &self.aggregator)
            .field("sinks", &self.sinks.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`CameraPublisher`].
///
/// Parameters, a transport and an acquisition routine are required. Bounds
/// default to ±10% of the configured frame rate over ten seconds and a
/// delay band of -10 ms to 100 ms.
#[derive(Default)]
pub struct CameraPublisherBuilder {
    params: Option<CameraParams>,
    transport: Option<Arc<dyn Transport>>,
    acquire: Option<Box<dyn Acquire>>,
    clock: Option<Arc<dyn Clock>>,
    sinks: Vec<Arc<dyn HealthSink>>,
    rate: Option<RateWindow>,
    skew: Option<SkewWindow>,
    calibration: Option<Arc<CalibrationStore>>,
}

impl CameraPublisherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: CameraParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Read parameters from `source` under `namespace`.
    pub fn load_params(self, source: &dyn ParamSource, namespace: &str) -> Result<Self, ConfigError> {
        Ok(self.params(CameraParams::from_source(source, namespace)?))
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn acquire(mut self, acquire: impl Acquire + 'static) -> Self {
        self.acquire = Some(Box::new(acquire));
        self
    }

    /// Clock for arrival stamps and health evaluation. Defaults to the
    /// system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Add a destination for each cycle's health report.
    pub fn sink(mut self, sink: impl HealthSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn shared_sink(mut self, sink: Arc<dyn HealthSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn rate_window(mut self, rate: RateWindow) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn skew_window(mut self, skew: SkewWindow) -> Self {
        self.skew = Some(skew);
        self
    }

    /// Use an existing calibration store instead of creating one.
    pub fn calibration_store(mut self, store: Arc<CalibrationStore>) -> Self {
        self.calibration = Some(store);
        self
    }

    /// Build the publisher and load its calibration.
    ///
    /// A calibration that cannot be loaded is not fatal: the publisher starts
    /// with the uncalibrated sentinel and reports it through the calibration
    /// check.
    pub fn build(self) -> Result<CameraPublisher, ConfigError> {
        let params = self.params.ok_or(ConfigError::MissingComponent("parameters"))?;
        let transport = self.transport.ok_or(ConfigError::MissingComponent("transport"))?;
        let acquire = self.acquire.ok_or(ConfigError::MissingComponent("acquisition routine"))?;

        let identity = params.identity();
        if let Some(field) = identity.missing_field() {
            return Err(ConfigError::MissingParameter(field.to_string()));
        }
        if !params.fps.is_finite() || params.fps <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "fps".into(),
                reason: format!("expected a positive frame rate, got {}", params.fps),
            });
        }

        let rate = match self.rate {
            Some(rate) => {
                rate.validate()?;
                rate
            }
            None => RateWindow::around(params.fps)?,
        };
        let skew = self.skew.unwrap_or_default();
        skew.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let calibration = self
            .calibration
            .unwrap_or_else(|| Arc::new(CalibrationStore::new(&params.camera_name)));
        if let Err(e) = calibration.load(&params.camera_name, &params.calib_url) {
            warn!(
                camera = %params.camera_name,
                url = %params.calib_url,
                error = %e,
                "calibration unavailable; publishing uncalibrated"
            );
        }

        let aggregator = Arc::new(DiagnosticAggregator::with_clock(clock.clone()));
        aggregator.set_hardware_id(identity.hardware_id.clone());
        aggregator.register(CALIBRATION_CHECK, CalibrationCheck::new(calibration.clone()));

        let monitors = Arc::new(TopicMonitors::new(rate, skew));
        let publisher = CameraPublisher {
            identity: RwLock::new(identity),
            topic: params.topic(),
            fps: RwLock::new(params.fps),
            calibration,
            aggregator,
            transport,
            acquire: Mutex::new(acquire),
            sinks: self.sinks,
            clock,
            monitors: RwLock::new(monitors.clone()),
            seq: AtomicU64::new(0),
            counters: Counters::default(),
            last_report: RwLock::new(None),
        };
        publisher.register_monitors(&monitors);

        info!(
            camera = %params.camera_name,
            topic = %publisher.topic,
            fps = params.fps,
            "camera publisher ready"
        );
        Ok(publisher)
    }
}

impl fmt::Debug for CameraPublisherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraPublisherBuilder")
            .field("params", &self.params)
            .field("has_transport", &self.transport.is_some())
            .field("has_acquire", &self.acquire.is_some())
            .field("sinks", &self.sinks.len())
            .field("rate", &self.rate)
            .field("skew", &self.skew)
            .finish_non_exhaustive()
    }
}
