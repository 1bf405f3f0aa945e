//! Camera calibration snapshots.

/// Region of interest within the full sensor image.
///
/// All zeros means the full resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionOfInterest {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
    pub do_rectify: bool,
}

/// Intrinsic calibration of a camera.
///
/// Instances are immutable once published: a reload replaces the whole
/// snapshot instead of editing fields in place. Matrices are row-major.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Calibration {
    /// Calibrated image width in pixels.
    pub width: u32,

    /// Calibrated image height in pixels.
    pub height: u32,

    /// Distortion model name, e.g. `plumb_bob`.
    pub distortion_model: String,

    /// Distortion coefficients; their meaning depends on the model.
    pub d: Vec<f64>,

    /// 3x3 intrinsic matrix.
    pub k: [f64; 9],

    /// 3x3 rectification matrix.
    pub r: [f64; 9],

    /// 3x4 projection matrix.
    pub p: [f64; 12],

    pub binning_x: u32,
    pub binning_y: u32,
    pub roi: RegionOfInterest,
}

impl Calibration {
    /// The sentinel published when no calibration is available.
    pub fn uncalibrated() -> Self {
        Self::default()
    }

    /// Create a builder for a calibration.
    pub fn builder() -> CalibrationBuilder {
        CalibrationBuilder::new()
    }

    /// Whether this carries a real calibration (non-zero focal length).
    pub fn is_calibrated(&self) -> bool {
        self.k[0] != 0.0
    }

    /// Focal lengths `(fx, fy)`.
    pub fn focal_length(&self) -> (f64, f64) {
        (self.k[0], self.k[4])
    }

    /// Principal point `(cx, cy)`.
    pub fn principal_point(&self) -> (f64, f64) {
        (self.k[2], self.k[5])
    }
}

const IDENTITY_3X3: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Builder for [`Calibration`].
///
/// The rectification defaults to identity and the projection to `[K | 0]`,
/// which is what a monocular camera without rectification publishes.
#[derive(Debug, Clone)]
pub struct CalibrationBuilder {
    width: u32,
    height: u32,
    distortion_model: String,
    d: Vec<f64>,
    k: [f64; 9],
    r: [f64; 9],
    p: Option<[f64; 12]>,
    binning: (u32, u32),
    roi: RegionOfInterest,
}

impl CalibrationBuilder {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            distortion_model: String::new(),
            d: Vec::new(),
            k: [0.0; 9],
            r: IDENTITY_3X3,
            p: None,
            binning: (0, 0),
            roi: RegionOfInterest::default(),
        }
    }

    /// Set the calibrated resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the pinhole intrinsics.
    pub fn intrinsics(mut self, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        self.k = [fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0];
        self
    }

    /// Set the distortion model and its coefficients.
    pub fn distortion(mut self, model: impl Into<String>, coefficients: Vec<f64>) -> Self {
        self.distortion_model = model.into();
        self.d = coefficients;
        self
    }

    pub fn rectification(mut self, r: [f64; 9]) -> Self {
        self.r = r;
        self
    }

    pub fn projection(mut self, p: [f64; 12]) -> Self {
        self.p = Some(p);
        self
    }

    pub fn binning(mut self, x: u32, y: u32) -> Self {
        self.binning = (x, y);
        self
    }

    pub fn roi(mut self, roi: RegionOfInterest) -> Self {
        self.roi = roi;
        self
    }

    pub fn build(self) -> Calibration {
        let k = self.k;
        let p = self.p.unwrap_or([
            k[0], k[1], k[2], 0.0, //
            k[3], k[4], k[5], 0.0, //
            k[6], k[7], k[8], 0.0,
        ]);
        Calibration {
            width: self.width,
            height: self.height,
            distortion_model: self.distortion_model,
            d: self.d,
            k,
            r: self.r,
            p,
            binning_x: self.binning.0,
            binning_y: self.binning.1,
            roi: self.roi,
        }
    }
}

impl Default for CalibrationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncalibrated_sentinel_is_all_zero() {
        let c = Calibration::uncalibrated();
        assert!(!c.is_calibrated());
        assert_eq!(c.width, 0);
        assert!(c.distortion_model.is_empty());
        assert!(c.d.is_empty());
        assert_eq!(c.k, [0.0; 9]);
    }

    #[test]
    fn builder_fills_projection_from_intrinsics() {
        let c = Calibration::builder()
            .resolution(640, 480)
            .intrinsics(500.0, 505.0, 320.0, 240.0)
            .distortion("plumb_bob", vec![0.1, -0.05, 0.0, 0.0, 0.0])
            .build();

        assert!(c.is_calibrated());
        assert_eq!(c.focal_length(), (500.0, 505.0));
        assert_eq!(c.principal_point(), (320.0, 240.0));
        assert_eq!(c.r, IDENTITY_3X3);
        assert_eq!(c.p[0], 500.0);
        assert_eq!(c.p[3], 0.0);
        assert_eq!(c.p[5], 505.0);
        assert_eq!(c.p[10], 1.0);
        assert_eq!(c.d.len(), 5);
    }

    #[test]
    fn explicit_projection_wins() {
        let mut p = [0.0; 12];
        p[0] = 42.0;
        let c = Calibration::builder()
            .intrinsics(500.0, 500.0, 1.0, 1.0)
            .projection(p)
            .build();
        assert_eq!(c.p[0], 42.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let c: Calibration = serde_json::from_str(r#"{"width": 640, "height": 480}"#).unwrap();
        assert_eq!(c.width, 640);
        assert!(!c.is_calibrated());
    }
}
