//! Error types for the publication pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that make a publisher impossible to construct or reconfigure.
///
/// These are fatal: a camera with no resolvable name or with nonsensical
/// diagnostic bounds must not start publishing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required parameter is absent or empty.
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    /// A parameter is present but unusable.
    #[error("invalid value for parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Frequency or timestamp bounds are inconsistent.
    #[error("invalid diagnostic bounds: {0}")]
    InvalidBounds(String),

    /// The builder was not given a collaborator it needs.
    #[error("publisher is missing its {0}")]
    MissingComponent(&'static str),
}

/// Errors reported by an acquisition capability.
///
/// Transient: the cycle skips publishing but diagnostics still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The device did not deliver a frame in time.
    #[error("acquisition timed out")]
    Timeout,

    /// The device reported a failure.
    #[error("device error: {0}")]
    Device(String),

    /// The device is not streaming yet.
    #[error("device not ready")]
    NotReady,
}

/// Errors that can occur when loading or saving calibration.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// No calibration exists at the URL (including the `none` URL).
    #[error("no calibration available at `{url}`")]
    NotFound { url: String },

    /// The URL scheme is not understood.
    #[error("unsupported calibration URL `{0}`")]
    UnsupportedUrl(String),

    /// Reading or writing the backing file failed.
    #[error("I/O error on `{}`: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid calibration document.
    #[error("failed to parse calibration `{}`: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The URL cannot be written to.
    #[error("calibration URL `{0}` is not writable")]
    ReadOnly(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        let err = ConfigError::MissingParameter("camera.camera_name".into());
        assert_eq!(err.to_string(), "missing required parameter `camera.camera_name`");

        let err = CalibrationError::Io {
            path: PathBuf::from("/tmp/cam.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "I/O error on `/tmp/cam.json`: denied");
    }

    #[test]
    fn acquisition_errors_compare() {
        assert_eq!(AcquisitionError::Timeout, AcquisitionError::Timeout);
        assert_ne!(AcquisitionError::Timeout, AcquisitionError::NotReady);
        assert_eq!(
            AcquisitionError::Device("usb reset".into()).to_string(),
            "device error: usb reset"
        );
    }
}
