//! Image frames and the metadata published alongside them.

use std::sync::Arc;

use crate::{Calibration, Timestamp};

/// Well-known pixel encodings.
pub mod encodings {
    pub const MONO8: &str = "mono8";
    pub const MONO16: &str = "mono16";
    pub const RGB8: &str = "rgb8";
    pub const BGR8: &str = "bgr8";
    pub const RGBA8: &str = "rgba8";

    /// Bytes per pixel for a known encoding.
    pub fn bytes_per_pixel(encoding: &str) -> Option<u32> {
        match encoding {
            MONO8 => Some(1),
            MONO16 => Some(2),
            RGB8 | BGR8 => Some(3),
            RGBA8 => Some(4),
            _ => None,
        }
    }
}

/// Per-message header shared by a frame and its camera info.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// Publication sequence number, assigned by the publisher.
    pub seq: u64,

    /// Acquisition time.
    pub stamp: Timestamp,

    /// Coordinate frame the image is expressed in.
    pub frame_id: String,
}

impl Header {
    pub fn new(seq: u64, stamp: Timestamp, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// A single image frame.
///
/// The pixel payload is opaque to camwatch; `encoding`, `width`, `height` and
/// `step` only describe it for subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub header: Header,

    /// Logical name of the camera that produced the frame.
    pub source: String,

    pub encoding: String,
    pub width: u32,
    pub height: u32,

    /// Row length in bytes.
    pub step: u32,

    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame with a packed row layout (`step = width * bpp`).
    ///
    /// Unknown encodings are treated as one byte per pixel.
    pub fn new(encoding: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        let encoding = encoding.into();
        let bpp = encodings::bytes_per_pixel(&encoding).unwrap_or(1);
        Self {
            header: Header::default(),
            source: String::new(),
            encoding,
            width,
            height,
            step: width.saturating_mul(bpp),
            data,
        }
    }

    /// Whether `data` holds exactly `step * height` bytes.
    pub fn is_consistent(&self) -> bool {
        self.data.len() as u64 == self.step as u64 * self.height as u64
    }

    /// Whether the frame carries no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Calibration metadata published with one frame.
///
/// The header is per frame; the calibration itself is an immutable snapshot
/// shared by every frame published while it is current.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraInfo {
    pub header: Header,
    pub calibration: Arc<Calibration>,
}

impl CameraInfo {
    /// Attach `calibration` to a copy of `header`.
    pub fn new(header: Header, calibration: Arc<Calibration>) -> Self {
        Self {
            header,
            calibration,
        }
    }

    /// Whether this info belongs to `frame` (identical headers).
    pub fn matches(&self, frame: &Frame) -> bool {
        self.header == frame.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_computes_packed_step() {
        let frame = Frame::new(encodings::RGB8, 4, 2, vec![0; 24]);
        assert_eq!(frame.step, 12);
        assert!(frame.is_consistent());
    }

    #[test]
    fn unknown_encoding_defaults_to_one_byte() {
        let frame = Frame::new("bayer_rggb8", 4, 2, vec![0; 8]);
        assert_eq!(frame.step, 4);
        assert!(frame.is_consistent());
    }

    #[test]
    fn inconsistent_payload_detected() {
        let frame = Frame::new(encodings::MONO16, 4, 2, vec![0; 8]);
        assert!(!frame.is_consistent());
    }

    #[test]
    fn camera_info_matches_only_identical_header() {
        let mut frame = Frame::new(encodings::MONO8, 1, 1, vec![7]);
        frame.header = Header::new(3, Timestamp::from_secs(1), "cam");

        let calibration = Arc::new(Calibration::uncalibrated());
        let info = CameraInfo::new(frame.header.clone(), calibration.clone());
        assert!(info.matches(&frame));

        let mut stale = CameraInfo::new(frame.header.clone(), calibration);
        stale.header.seq = 2;
        assert!(!stale.matches(&frame));
    }

    #[test]
    fn camera_infos_share_one_calibration() {
        let calibration = Arc::new(Calibration::uncalibrated());
        let a = CameraInfo::new(Header::new(1, Timestamp::from_secs(1), "cam"), calibration.clone());
        let b = CameraInfo::new(Header::new(2, Timestamp::from_secs(2), "cam"), calibration);

        assert!(Arc::ptr_eq(&a.calibration, &b.calibration));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn camera_info_serializes_calibration_inline() {
        let info = CameraInfo::new(
            Header::new(1, Timestamp::from_secs(1), "cam"),
            Arc::new(Calibration::uncalibrated()),
        );
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["header"]["frame_id"], "cam");
        assert_eq!(json["calibration"]["width"], 0);
    }
}
