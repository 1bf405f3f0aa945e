//! # camwatch
//!
//! Command-line driver for the camwatch publication pipeline.
//!
//! The binary builds a [`camwatch_sdk::CameraPublisher`] from layered
//! configuration, feeds it synthetic test-pattern frames at the configured
//! rate and reports health through `tracing` and optional JSON outputs.
//!
//! ```text
//!   settings ──▶ CameraParams ──▶ CameraPublisher ──▶ ChannelTransport
//!                                      │
//!   driver (tokio interval) ───────────┘──▶ LogSink, Reporter ──▶ file / TCP
//! ```
//!
//! - **[`settings`]**: TOML file, `CAMWATCH_` environment and CLI overrides
//! - **[`driver`]**: the paced publish loop with duration, Ctrl-C and lazy mode
//! - **[`logging`]**: `tracing-subscriber` setup with selectable layout
//! - **[`duration`]**: human-readable durations for flags and log lines
//!
//! ## Usage
//!
//! ```bash
//! # Ten seconds at the configured rate, health written to a file
//! camwatch --config camera.toml --duration 10s --output-file health.json
//!
//! # No config file: everything from flags and the environment
//! CAMWATCH_CAMERA__FPS=15 camwatch --camera-name front --calib-url none --lazy
//! ```
//!
//! ## As a library
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use camwatch::driver::{run, DriveOptions};
//! use camwatch_sdk::{CameraParams, CameraPublisher, ChannelTransport, TestPattern};
//!
//! # tokio_test::block_on(async {
//! let publisher = Arc::new(
//!     CameraPublisher::builder()
//!         .params(CameraParams::new("camera", "front", "none"))
//!         .acquire(TestPattern::new(8, 8))
//!         .transport(Arc::new(ChannelTransport::new(8)))
//!         .build()
//!         .unwrap(),
//! );
//! let options = DriveOptions { fps: 50.0, duration: Some(Duration::from_millis(100)), lazy: false };
//! let summary = run(publisher, options, std::future::pending()).await.unwrap();
//! assert!(summary.stats.cycles > 0);
//! # });
//! ```

pub mod driver;
pub mod duration;
pub mod logging;
pub mod settings;
