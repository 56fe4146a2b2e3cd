//! Records handed to the store by format-specific readers.
//!
//! Every field is optional. The store applies the defaulting rules documented
//! on each field; no combination of missing fields makes ingestion fail.

use serde::{Deserialize, Serialize};

use crate::meta::{GlobalError, Label, Link, Parameter};
use crate::status::TestStatus;
use crate::test_result::FixtureKind;

/// Provenance passed along with every ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderContext {
    pub reader_id: String,
}

impl ReaderContext {
    pub fn new(reader_id: impl Into<String>) -> Self {
        Self {
            reader_id: reader_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTestResult {
    /// Preferred result id; a fresh one is generated when absent or taken.
    pub uuid: Option<String>,
    /// Defaults to `full_name`, then to the empty string.
    pub name: Option<String>,
    pub full_name: Option<String>,
    /// Logical test key; defaults to `full_name`, then `name`.
    pub test_id: Option<String>,
    /// Overrides the derived history id when present.
    pub history_id: Option<String>,
    /// Defaults to [`TestStatus::Unknown`].
    pub status: Option<TestStatus>,
    pub message: Option<String>,
    pub trace: Option<String>,
    /// Defaults to the ingestion time.
    pub start: Option<i64>,
    pub stop: Option<i64>,
    /// Defaults to `stop - start` when both are known.
    pub duration: Option<i64>,
    pub description: Option<String>,
    pub flaky: Option<bool>,
    pub labels: Vec<Label>,
    pub parameters: Vec<Parameter>,
    pub links: Vec<Link>,
    pub steps: Vec<RawStepNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawStepNode {
    Step(RawStep),
    Attachment(RawAttachmentRef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStep {
    pub name: Option<String>,
    pub status: Option<TestStatus>,
    pub message: Option<String>,
    pub trace: Option<String>,
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub duration: Option<i64>,
    pub parameters: Vec<Parameter>,
    pub steps: Vec<RawStepNode>,
}

/// Attachment reference found inside a step tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAttachmentRef {
    /// Display name; defaults to the file name.
    pub name: Option<String>,
    /// File the reference points at; defaults to `name`. A reference with
    /// neither cannot be linked and is dropped.
    pub original_file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestFixtureResult {
    #[serde(default)]
    pub uuid: Option<String>,
    pub kind: FixtureKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<TestStatus>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trace: Option<String>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub stop: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub steps: Vec<RawStepNode>,
    /// Ids of the wrapped test results (the `uuid`s the reader assigned them).
    #[serde(default)]
    pub test_result_ids: Vec<String>,
}

/// Process-wide errors and attachments reported outside any test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGlobals {
    pub errors: Vec<GlobalError>,
    pub attachments: Vec<RawAttachmentRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_a_valid_raw_result() {
        let raw: RawTestResult = serde_json::from_str("{}").expect("decode");
        assert_eq!(raw, RawTestResult::default());
    }

    #[test]
    fn raw_step_tree_decodes() {
        let raw: RawTestResult = serde_json::from_str(
            r#"{
                "name": "login",
                "steps": [
                    {"type": "step", "name": "open", "steps": [
                        {"type": "attachment", "name": "page", "originalFileName": "page.html"}
                    ]}
                ]
            }"#,
        )
        .expect("decode");
        let RawStepNode::Step(step) = &raw.steps[0] else {
            panic!("expected step node");
        };
        assert!(matches!(step.steps[0], RawStepNode::Attachment(_)));
    }
}
