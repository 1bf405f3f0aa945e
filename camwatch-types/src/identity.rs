//! Identity of one camera instance.

/// Who is publishing: fixed when the publisher is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// Identity reported in health reports (serial number, bus address...).
    pub hardware_id: String,

    /// Coordinate frame stamped onto every frame header.
    pub frame_id: String,

    /// Logical camera name; also the calibration lookup name.
    pub logical_name: String,

    /// Free-form device identifier (may be empty).
    pub identifier: String,
}

impl Identity {
    pub fn new(
        hardware_id: impl Into<String>,
        frame_id: impl Into<String>,
        logical_name: impl Into<String>,
    ) -> Self {
        Self {
            hardware_id: hardware_id.into(),
            frame_id: frame_id.into(),
            logical_name: logical_name.into(),
            identifier: String::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// The first identity field that is empty but must not be.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.logical_name.is_empty() {
            Some("logical_name")
        } else if self.frame_id.is_empty() {
            Some("frame_id")
        } else if self.hardware_id.is_empty() {
            Some("hardware_id")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_identity_has_no_missing_field() {
        let id = Identity::new("hw-1", "cam_optical", "front").with_identifier("SN42");
        assert_eq!(id.missing_field(), None);
        assert_eq!(id.identifier, "SN42");
    }

    #[test]
    fn reports_first_missing_field() {
        assert_eq!(Identity::new("hw", "frame", "").missing_field(), Some("logical_name"));
        assert_eq!(Identity::new("hw", "", "front").missing_field(), Some("frame_id"));
        assert_eq!(Identity::new("", "frame", "front").missing_field(), Some("hardware_id"));
    }

    #[test]
    fn identifier_is_optional() {
        assert_eq!(Identity::new("hw", "frame", "front").missing_field(), None);
    }
}
