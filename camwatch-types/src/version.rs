//! Schema versioning for health reports.

use std::fmt;

use crate::SCHEMA_VERSION;

/// Schema version stamped into every [`HealthReport`](crate::HealthReport).
///
/// Health sinks may persist or forward reports; the version lets a consumer
/// reject a layout it does not understand instead of misreading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct SchemaVersion {
    /// Bumped on breaking layout changes.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub major: u32,

    /// Bumped when fields are added.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version written by this library.
    pub const fn current() -> Self {
        Self::new(SCHEMA_VERSION, 0)
    }

    /// Whether a report with this version can be read by this library.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_compatible() {
        assert!(SchemaVersion::current().is_compatible());
        assert_eq!(SchemaVersion::default(), SchemaVersion::current());
    }

    #[test]
    fn minor_bump_stays_compatible_major_does_not() {
        assert!(SchemaVersion::new(SCHEMA_VERSION, 7).is_compatible());
        assert!(!SchemaVersion::new(SCHEMA_VERSION + 1, 0).is_compatible());
    }

    #[test]
    fn display() {
        assert_eq!(SchemaVersion::new(1, 2).to_string(), "v1.2");
    }
}
