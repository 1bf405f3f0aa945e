//! Configuration loading for the `camwatch` binary.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults for the `[driver]` table.
//! 2. A TOML file given with `--config`.
//! 3. Environment variables prefixed `CAMWATCH_`, with `__` separating
//!    nested keys (`CAMWATCH_CAMERA__FPS=15` sets `camera.fps`).
//! 4. Command-line overrides.
//!
//! Camera parameters live under the namespace table (`[camera]` by default)
//! and are read by [`camwatch_sdk::CameraParams::from_source`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use camwatch_sdk::key;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Values given on the command line that take precedence over every other
/// source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub namespace: String,
    pub camera_name: Option<String>,
    pub calib_url: Option<String>,
    pub fps: Option<f64>,
    pub fail_every: Option<u64>,
    pub lazy: bool,
}

/// How the synthetic camera is driven, from the `[driver]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Test pattern width in pixels.
    pub width: u32,
    /// Test pattern height in pixels.
    pub height: u32,
    /// Fail every Nth acquisition; 0 never fails.
    pub fail_every: u64,
    /// Skip acquisition while nobody subscribes.
    pub lazy: bool,
    /// How often the reporter writes health outputs, in milliseconds.
    pub report_interval_ms: u64,
    /// Broadcast buffer of the in-process transport.
    pub transport_capacity: usize,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            fail_every: 0,
            lazy: false,
            report_interval_ms: 1000,
            transport_capacity: 16,
        }
    }
}

/// Build the layered configuration.
pub fn load(overrides: &Overrides) -> Result<Config> {
    let mut builder = Config::builder();

    if let Some(path) = &overrides.config {
        builder = builder.add_source(File::from(path.as_path()));
    }

    builder = builder.add_source(
        Environment::with_prefix("CAMWATCH")
            .prefix_separator("_")
            .separator("__"),
    );

    let ns = overrides.namespace.as_str();
    builder = builder
        .set_override_option(key(ns, "camera_name"), overrides.camera_name.clone())?
        .set_override_option(key(ns, "calib_url"), overrides.calib_url.clone())?
        .set_override_option(key(ns, "fps"), overrides.fps)?
        .set_override_option("driver.fail_every", overrides.fail_every)?;
    if overrides.lazy {
        builder = builder.set_override("driver.lazy", true)?;
    }

    builder.build().context("failed to load configuration")
}

/// Read the `[driver]` table, falling back to defaults for missing keys.
pub fn driver_settings(config: &Config) -> Result<DriverSettings> {
    match config.get::<DriverSettings>("driver") {
        Ok(settings) => Ok(settings),
        Err(config::ConfigError::NotFound(_)) => Ok(DriverSettings::default()),
        Err(e) => Err(e).context("invalid [driver] settings"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwatch_sdk::CameraParams;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_camera_table_from_file() {
        let file = write_config(
            r#"
            [camera]
            camera_name = "front"
            calib_url = "none"
            fps = 15

            [driver]
            width = 32
            "#,
        );
        let overrides = Overrides {
            config: Some(file.path().to_path_buf()),
            namespace: "camera".into(),
            ..Default::default()
        };

        let config = load(&overrides).unwrap();
        let params = CameraParams::from_source(&config, "camera").unwrap();
        assert_eq!(params.camera_name, "front");
        assert_eq!(params.fps, 15.0);

        let driver = driver_settings(&config).unwrap();
        assert_eq!(driver.width, 32);
        assert_eq!(driver.height, 48);
    }

    #[test]
    fn overrides_win() {
        let file = write_config(
            r#"
            [camera]
            camera_name = "front"
            calib_url = "none"
            fps = 15
            "#,
        );
        let overrides = Overrides {
            config: Some(file.path().to_path_buf()),
            namespace: "camera".into(),
            camera_name: Some("rear".into()),
            fps: Some(30.0),
            fail_every: Some(4),
            lazy: true,
            ..Default::default()
        };

        let config = load(&overrides).unwrap();
        let params = CameraParams::from_source(&config, "camera").unwrap();
        assert_eq!(params.camera_name, "rear");
        assert_eq!(params.fps, 30.0);
        assert_eq!(params.calib_url, "none");

        let driver = driver_settings(&config).unwrap();
        assert_eq!(driver.fail_every, 4);
        assert!(driver.lazy);
    }

    #[test]
    fn driver_defaults_without_table() {
        let config = load(&Overrides {
            namespace: "camera".into(),
            camera_name: Some("front".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(driver_settings(&config).unwrap(), DriverSettings::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let overrides = Overrides {
            config: Some(PathBuf::from("/nonexistent/camwatch.toml")),
            namespace: "camera".into(),
            ..Default::default()
        };
        assert!(load(&overrides).is_err());
    }
}
