use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a test, step or fixture execution.
///
/// Readers emit free-form status strings; anything unrecognised decodes as
/// [`TestStatus::Unknown`] instead of failing ingestion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Every assertion held.
    Passed,
    /// An assertion failed.
    Failed,
    /// The test errored outside of an assertion.
    Broken,
    /// The test did not run.
    Skipped,
    /// Status was missing or not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TestStatus {
    /// All statuses in report display order.
    pub const ALL: [Self; 5] = [
        Self::Failed,
        Self::Broken,
        Self::Passed,
        Self::Skipped,
        Self::Unknown,
    ];

    /// Whether this status counts as a failure for known-issue matching.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Broken)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
            Self::Broken => f.write_str("broken"),
            Self::Skipped => f.write_str("skipped"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Failure diagnostics attached to a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl StatusDetails {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.trace.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_string_decodes_as_unknown() {
        let status: TestStatus = serde_json::from_str("\"exploded\"").expect("decode");
        assert_eq!(status, TestStatus::Unknown);
    }

    #[test]
    fn known_status_strings_decode() {
        let status: TestStatus = serde_json::from_str("\"broken\"").expect("decode");
        assert_eq!(status, TestStatus::Broken);
        assert_eq!(TestStatus::Broken.to_string(), "broken");
    }

    #[test]
    fn failure_classification() {
        assert!(TestStatus::Failed.is_failure());
        assert!(TestStatus::Broken.is_failure());
        assert!(!TestStatus::Passed.is_failure());
        assert!(!TestStatus::Unknown.is_failure());
    }
}
