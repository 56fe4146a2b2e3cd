use serde::{Deserialize, Serialize};

use crate::meta::{Label, Link, Parameter};
use crate::status::{StatusDetails, TestStatus};
use crate::step::{AttachmentLink, StepNode, collect_links};

/// Environment every result falls into when no configured matcher claims it.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Canonical, reconciled test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub history_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "StatusDetails::is_empty")]
    pub status_details: StatusDetails,
    /// Start timestamp in Unix milliseconds.
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub flaky: bool,
    #[serde(default)]
    pub known: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub steps: Vec<StepNode>,
    /// Reader that produced the raw record.
    #[serde(default)]
    pub reader_id: String,
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_owned()
}

impl TestResult {
    /// Value of the first label with the given name.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    #[must_use]
    pub fn attachment_links(&self) -> Vec<&AttachmentLink> {
        collect_links(&self.steps)
    }
}

/// Identity of a test independent of its parameterization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    Before,
    After,
}

/// Setup or teardown execution wrapping one or more test results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFixtureResult {
    pub id: String,
    pub kind: FixtureKind,
    pub name: String,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "StatusDetails::is_empty")]
    pub status_details: StatusDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default)]
    pub steps: Vec<StepNode>,
    /// Ids of the test results this fixture wraps.
    #[serde(default)]
    pub test_result_ids: Vec<String>,
    #[serde(default)]
    pub reader_id: String,
}

/// Per-status counts over a set of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatistic {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub skipped: usize,
    pub unknown: usize,
    pub flaky: usize,
    pub retries: usize,
    pub new: usize,
}

impl TestStatistic {
    pub fn record(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Broken => self.broken += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Unknown => self.unknown += 1,
        }
    }
}
