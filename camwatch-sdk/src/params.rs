//! Named parameters read when a publisher is constructed.
//!
//! Parameters live under a camera namespace: with the namespace `camera`, the
//! camera name is read from `camera.camera_name`. Any store that can answer
//! string and float lookups can back a publisher; a `config::Config` and an
//! in-memory map are provided.

use std::collections::BTreeMap;

use camwatch_types::Identity;

use crate::error::ConfigError;

/// Frame rate assumed when the `fps` parameter is absent.
pub const DEFAULT_FPS: f64 = 10.0;

/// A read-only store of named parameters.
///
/// Lookups return `Ok(None)` when the key is absent and an error when the key
/// exists but cannot be read as the requested type.
pub trait ParamSource {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError>;

    fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError>;
}

impl ParamSource for config::Config {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match config::Config::get_string(self, key) {
            Ok(value) => Ok(Some(value)),
            Err(config::ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(invalid(key, e.to_string())),
        }
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match config::Config::get_float(self, key) {
            Ok(value) => Ok(Some(value)),
            Err(config::ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(invalid(key, e.to_string())),
        }
    }
}

/// An in-memory parameter store, mostly for tests and embedding.
///
/// ```rust
/// use camwatch_sdk::{CameraParams, MemoryParams};
///
/// let params = MemoryParams::new()
///     .with("camera.camera_name", "front")
///     .with("camera.calib_url", "none");
///
/// let camera = CameraParams::from_source(&params, "camera").unwrap();
/// assert_eq!(camera.frame_id, "camera");
/// assert_eq!(camera.fps, 10.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryParams {
    values: BTreeMap<String, String>,
}

impl MemoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ParamSource for MemoryParams {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.values
            .get(key)
            .map(|v| v.trim().parse::<f64>().map_err(|e| invalid(key, e.to_string())))
            .transpose()
    }
}

fn invalid(key: &str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter {
        name: key.to_string(),
        reason,
    }
}

/// Everything a publisher reads from its parameter store.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParams {
    /// Namespace the parameters were read from; also names the image topic.
    pub namespace: String,
    pub camera_name: String,
    /// Calibration URL; `none` means no calibration.
    pub calib_url: String,
    pub frame_id: String,
    pub identifier: String,
    pub fps: f64,
    pub hardware_id: Option<String>,
}

impl CameraParams {
    /// Build parameters programmatically, with the same defaults as
    /// [`CameraParams::from_source`].
    pub fn new(
        namespace: impl Into<String>,
        camera_name: impl Into<String>,
        calib_url: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let camera_name = camera_name.into();
        let frame_id = default_frame_id(&namespace, &camera_name);
        Self {
            namespace,
            camera_name,
            calib_url: calib_url.into(),
            frame_id,
            identifier: String::new(),
            fps: DEFAULT_FPS,
            hardware_id: None,
        }
    }

    /// Read parameters under `namespace`.
    ///
    /// `camera_name` and `calib_url` are required; `frame_id` defaults to the
    /// namespace, `identifier` to empty and `fps` to [`DEFAULT_FPS`].
    pub fn from_source(source: &dyn ParamSource, namespace: &str) -> Result<Self, ConfigError> {
        let camera_name = required(source, namespace, "camera_name")?;
        let calib_key = key(namespace, "calib_url");
        let calib_url = source
            .get_string(&calib_key)?
            .ok_or(ConfigError::MissingParameter(calib_key))?;

        let frame_id = source
            .get_string(&key(namespace, "frame_id"))?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_frame_id(namespace, &camera_name));
        let identifier = source.get_string(&key(namespace, "identifier"))?.unwrap_or_default();
        let hardware_id = source
            .get_string(&key(namespace, "hardware_id"))?
            .filter(|s| !s.is_empty());

        let fps_key = key(namespace, "fps");
        let fps = source.get_f64(&fps_key)?.unwrap_or(DEFAULT_FPS);
        if !fps.is_finite() || fps <= 0.0 {
            return Err(invalid(&fps_key, format!("expected a positive frame rate, got {fps}")));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            camera_name,
            calib_url,
            frame_id,
            identifier,
            fps,
            hardware_id,
        })
    }

    /// Image topic name: `<namespace>/image_raw`, or `image_raw` at the root.
    pub fn topic(&self) -> String {
        if self.namespace.is_empty() {
            "image_raw".to_string()
        } else {
            format!("{}/image_raw", self.namespace.replace('.', "/"))
        }
    }

    /// The identity triple derived from these parameters.
    ///
    /// The hardware id falls back to the identifier, then to the camera name.
    pub fn identity(&self) -> Identity {
        let hardware_id = self
            .hardware_id
            .clone()
            .or_else(|| (!self.identifier.is_empty()).then(|| self.identifier.clone()))
            .unwrap_or_else(|| self.camera_name.clone());
        Identity::new(hardware_id, &self.frame_id, &self.camera_name)
            .with_identifier(&self.identifier)
    }
}

/// Join a namespace and a parameter name.
pub fn key(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn required(source: &dyn ParamSource, namespace: &str, name: &str) -> Result<String, ConfigError> {
    let key = key(namespace, name);
    match source.get_string(&key)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingParameter(key)),
    }
}

fn default_frame_id(namespace: &str, camera_name: &str) -> String {
    if namespace.is_empty() {
        camera_name.to_string()
    } else {
        namespace.to_string()
    }
}
