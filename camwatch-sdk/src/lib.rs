//! # camwatch-sdk
//!
//! Health-monitored publication pipeline for camera drivers.
//!
//! A driver supplies an acquisition routine and a transport; the
//! [`CameraPublisher`] stamps each frame with the camera's identity, attaches
//! its calibration, publishes the pair and keeps frequency, timestamp and
//! calibration health under continuous evaluation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camwatch_sdk::{
//!     CameraParams, CameraPublisher, ChannelTransport, LogSink, Output, Reporter, TestPattern,
//! };
//! use camwatch_types::Timestamp;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let reporter = Reporter::builder()
//!         .output(Output::file("health.json"))
//!         .build();
//!
//!     let publisher = CameraPublisher::builder()
//!         .params(CameraParams::new("camera", "front", "file:///etc/camwatch/${NAME}.json"))
//!         .acquire(TestPattern::default())
//!         .transport(Arc::new(ChannelTransport::new(16)))
//!         .sink(LogSink::new())
//!         .shared_sink(reporter.sink())
//!         .build()
//!         .expect("valid camera parameters");
//!
//!     let emission = reporter.start();
//!     let mut ticker = tokio::time::interval(Duration::from_millis(100));
//!     for _ in 0..100 {
//!         ticker.tick().await;
//!         publisher.publish_cycle(Timestamp::now());
//!     }
//!     emission.stop();
//! }
//! ```
//!
//! ## Features
//!
//! - **Injected acquisition**: any `FnMut(Timestamp) -> Result<Frame, _>` works
//! - **Live diagnostics**: rate and timestamp-skew monitors per topic
//! - **Atomic reconfiguration**: bounds are swapped whole, checks are never duplicated
//! - **Deterministic time**: a [`ManualClock`] drives the whole pipeline in tests
//! - **Health outputs**: tracing, watch/mpsc channels, JSON file or TCP

mod acquire;
mod aggregator;
mod calibration;
mod clock;
pub mod error;
pub mod monitor;
mod params;
mod publisher;
mod sink;
mod transport;

#[cfg(feature = "tokio")]
mod output;
#[cfg(feature = "tokio")]
mod reporter;

pub use acquire::{Acquire, TestPattern};
pub use aggregator::{DiagnosticAggregator, HealthCheck};
pub use calibration::{validate_url, CalibrationCheck, CalibrationStore, CalibrationUrl};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AcquisitionError, CalibrationError, ConfigError};
pub use monitor::{
    FrequencyClass, FrequencyMonitor, FrequencyStatus, RateWindow, SkewStatus, SkewWindow,
    TimestampSkewMonitor,
};
pub use params::{key, CameraParams, MemoryParams, ParamSource, DEFAULT_FPS};
pub use publisher::{
    CameraPublisher, CameraPublisherBuilder, CycleOutcome, PublisherStats, CALIBRATION_CHECK,
};
pub use sink::{HealthSink, LogSink};
pub use transport::{Published, Transport};

#[cfg(feature = "tokio")]
pub use output::Output;
#[cfg(feature = "tokio")]
pub use reporter::{EmissionHandle, Reporter, ReporterBuilder};
#[cfg(feature = "tokio")]
pub use transport::ChannelTransport;

// Re-export types for convenience
pub use camwatch_types::{
    CameraInfo, Calibration, CheckReport, Frame, HealthReport, Identity, Level, Timestamp,
};
