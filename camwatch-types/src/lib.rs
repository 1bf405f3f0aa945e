//! # camwatch-types
//!
//! Core types for health-monitored camera publication. This crate defines the
//! data that flows out of a camera driver built on camwatch: image frames, the
//! calibration metadata published alongside them, and the health reports the
//! diagnostic subsystem produces every cycle.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Shared calibration**: Calibration snapshots are immutable and shared by `Arc`
//! - **Deterministic reports**: Health reports use ordered maps so identical state
//!   always serializes identically
//! - **Ergonomic builders**: Fluent API for constructing reports and calibrations
//!
//! ## Features
//!
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization of health reports via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use camwatch_types::{HealthReport, Level, Timestamp};
//!
//! let report = HealthReport::builder()
//!     .hardware_id("cam-0042")
//!     .stamp(Timestamp::from_secs(10))
//!     .check("camera/image_raw frequency", |c| {
//!         c.level(Level::Ok)
//!             .message("Desired frequency met")
//!             .value("observed_hz", 10.0)
//!     })
//!     .check("calibration", |c| c.level(Level::Warn).message("camera is not calibrated"))
//!     .build();
//!
//! assert_eq!(report.level, Level::Warn);
//! assert_eq!(report.len(), 2);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! health reports so consumers can handle format evolution gracefully.

mod calibration;
mod frame;
mod health;
mod identity;
mod time;
mod version;

pub use calibration::*;
pub use frame::*;
pub use health::*;
pub use identity::*;
pub use time::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the health report format.
pub const SCHEMA_VERSION: u32 = 1;
