//! Calibration storage and loading.
//!
//! A [`CalibrationStore`] owns the current calibration snapshot for one
//! camera. Snapshots are immutable `Arc<Calibration>` values: loading or
//! setting a calibration swaps the whole `Arc`, so frames already in flight
//! keep the snapshot they were published with.
//!
//! URLs understood by the store:
//!
//! - `""` or `"none"`: the camera has no calibration.
//! - `file:///abs/path.json`: a JSON calibration document.
//!
//! `${NAME}` anywhere in a URL is replaced by the camera name, so one URL
//! template can serve several cameras.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use camwatch_types::{Calibration, CheckReport, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::aggregator::HealthCheck;
use crate::error::CalibrationError;

const NAME_PLACEHOLDER: &str = "${NAME}";
const FILE_SCHEME: &str = "file://";

/// Where a calibration URL points after substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationUrl {
    None,
    File(PathBuf),
}

impl CalibrationUrl {
    /// Parse `url`, substituting `${NAME}` with `camera_name`.
    pub fn parse(url: &str, camera_name: &str) -> Result<Self, CalibrationError> {
        let resolved = url.trim().replace(NAME_PLACEHOLDER, camera_name);
        if resolved.is_empty() || resolved.eq_ignore_ascii_case("none") {
            return Ok(CalibrationUrl::None);
        }
        match resolved.strip_prefix(FILE_SCHEME) {
            Some(path) if !path.is_empty() => Ok(CalibrationUrl::File(PathBuf::from(path))),
            _ => Err(CalibrationError::UnsupportedUrl(url.to_string())),
        }
    }
}

/// Whether `url` is a calibration URL this store understands.
pub fn validate_url(url: &str) -> bool {
    CalibrationUrl::parse(url, "camera").is_ok()
}

/// Holds the current calibration snapshot for one camera.
///
/// # Example
///
/// ```rust
/// use camwatch_sdk::CalibrationStore;
///
/// let store = CalibrationStore::new("front");
/// assert!(store.load("front", "none").is_err());
///
/// // A failed load never leaves the store without a snapshot.
/// assert!(!store.snapshot().is_calibrated());
/// ```
#[derive(Debug)]
pub struct CalibrationStore {
    camera_name: String,
    url: RwLock<String>,
    current: RwLock<Arc<Calibration>>,
    last_error: RwLock<Option<String>>,
}

impl CalibrationStore {
    /// Create a store holding the uncalibrated sentinel.
    pub fn new(camera_name: impl Into<String>) -> Self {
        Self {
            camera_name: camera_name.into(),
            url: RwLock::new("none".to_string()),
            current: RwLock::new(Arc::new(Calibration::uncalibrated())),
            last_error: RwLock::new(None),
        }
    }

    /// Load the calibration for `name` from `url`.
    ///
    /// On success the snapshot is replaced and returned. On failure the
    /// previous snapshot stays current and the error is remembered in
    /// [`last_error`](Self::last_error). The URL is remembered either way so a
    /// later [`reload`](Self::reload) or [`save`](Self::save) targets it.
    pub fn load(&self, name: &str, url: &str) -> Result<Arc<Calibration>, CalibrationError> {
        *self.url.write() = url.to_string();

        match read_calibration(name, url) {
            Ok(calibration) => {
                let calibration = Arc::new(calibration);
                *self.current.write() = calibration.clone();
                *self.last_error.write() = None;
                info!(camera = name, url, "loaded camera calibration");
                Ok(calibration)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load again from the last URL.
    pub fn reload(&self) -> Result<Arc<Calibration>, CalibrationError> {
        let url = self.url();
        self.load(&self.camera_name, &url)
    }

    /// The current snapshot. Never fails.
    pub fn snapshot(&self) -> Arc<Calibration> {
        self.current.read().clone()
    }

    /// Replace the snapshot wholesale.
    pub fn set(&self, calibration: Calibration) -> Arc<Calibration> {
        let calibration = Arc::new(calibration);
        *self.current.write() = calibration.clone();
        *self.last_error.write() = None;
        debug!(camera = %self.camera_name, "calibration replaced");
        calibration
    }

    /// Write the current snapshot to the store's URL.
    pub fn save(&self) -> Result<(), CalibrationError> {
        let url = self.url();
        let path = match CalibrationUrl::parse(&url, &self.camera_name)? {
            CalibrationUrl::File(path) => path,
            CalibrationUrl::None => return Err(CalibrationError::ReadOnly(url)),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CalibrationError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(snapshot.as_ref()).map_err(|source| {
            CalibrationError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| CalibrationError::Io {
            path: path.clone(),
            source,
        })?;

        info!(camera = %self.camera_name, path = %path.display(), "saved camera calibration");
        Ok(())
    }

    pub fn is_calibrated(&self) -> bool {
        self.current.read().is_calibrated()
    }

    pub fn camera_name(&self) -> &str {
        &self.camera_name
    }

    pub fn url(&self) -> String {
        self.url.read().clone()
    }

    /// Why the last load failed, if it did.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}

fn read_calibration(name: &str, url: &str) -> Result<Calibration, CalibrationError> {
    let path = match CalibrationUrl::parse(url, name)? {
        CalibrationUrl::File(path) => path,
        CalibrationUrl::None => {
            return Err(CalibrationError::NotFound {
                url: url.to_string(),
            })
        }
    };

    let content = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CalibrationError::NotFound {
                url: url.to_string(),
            }
        } else {
            CalibrationError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|source| CalibrationError::Parse { path, source })
}

/// Health check reporting whether the camera publishes a real calibration.
#[derive(Debug, Clone)]
pub struct CalibrationCheck {
    store: Arc<CalibrationStore>,
}

impl CalibrationCheck {
    pub fn new(store: Arc<CalibrationStore>) -> Self {
        Self { store }
    }
}

impl HealthCheck for CalibrationCheck {
    fn run(&self, _now: Timestamp) -> CheckReport {
        let snapshot = self.store.snapshot();
        let report = if snapshot.is_calibrated() {
            CheckReport::ok("camera is calibrated")
        } else {
            match self.store.last_error() {
                Some(err) => CheckReport::warn(format!("camera is not calibrated: {err}")),
                None => CheckReport::warn("camera is not calibrated"),
            }
        };
        report
            .with_value("url", self.store.url())
            .with_value("width", snapshot.width)
            .with_value("height", snapshot.height)
    }
}
