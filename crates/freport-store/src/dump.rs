//! Flat, transferable snapshot of a store.
//!
//! Every map is keyed by string id and every value is plain JSON, so dumps
//! produced by independent shards can be shipped and merged with
//! `ReportStore::restore_state`. Missing top-level keys decode as empty.

use std::collections::BTreeMap;

use freport_error::{ReportError, Result};
use freport_types::{
    Attachment, GlobalError, KnownIssue, TestCase, TestFixtureResult, TestResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dump schema version written by this store.
pub const DUMP_SCHEMA_VERSION: u32 = 1;

fn current_schema_version() -> u32 {
    DUMP_SCHEMA_VERSION
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateDump {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    pub test_results: BTreeMap<String, TestResult>,
    pub attachments: BTreeMap<String, Attachment>,
    pub test_cases: BTreeMap<String, TestCase>,
    pub fixtures: BTreeMap<String, TestFixtureResult>,
    /// Environment names in order; `default` always first.
    pub environments: Vec<String>,
    pub report_variables: BTreeMap<String, String>,
    /// Attachment ids.
    pub global_attachments: Vec<String>,
    pub global_errors: Vec<GlobalError>,
    /// History id → result ids in arrival order.
    pub index_test_result_by_history_id: BTreeMap<String, Vec<String>>,
    /// History id → environment → visible result id.
    pub index_latest_env_test_result_by_history_id: BTreeMap<String, BTreeMap<String, String>>,
    pub index_attachment_by_test_result: BTreeMap<String, Vec<String>>,
    pub index_fixtures_by_test_result: BTreeMap<String, Vec<String>>,
    pub index_attachment_by_fixture: BTreeMap<String, Vec<String>>,
    pub index_known_by_history_id: BTreeMap<String, Vec<KnownIssue>>,
}

impl StateDump {
    /// Decode a dump from a JSON value.
    ///
    /// # Errors
    ///
    /// [`ReportError::InvalidDump`] when the value is not an object or a
    /// present key has the wrong shape; [`ReportError::UnsupportedDumpVersion`]
    /// when the dump comes from a newer schema.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = match &value {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("boolean"),
            Value::Number(_) => Some("number"),
            Value::String(_) => Some("string"),
            Value::Array(_) => Some("array"),
        };
        if let Some(kind) = kind {
            return Err(ReportError::invalid_dump(format!(
                "expected a JSON object, got {kind}"
            )));
        }
        let dump: Self =
            serde_json::from_value(value).map_err(|err| ReportError::invalid_dump(err.to_string()))?;
        if dump.schema_version > DUMP_SCHEMA_VERSION {
            return Err(ReportError::UnsupportedDumpVersion {
                found: dump.schema_version,
                supported: DUMP_SCHEMA_VERSION,
            });
        }
        Ok(dump)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| ReportError::invalid_dump(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Extra inputs for `restore_state`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Attachment bytes keyed by attachment id, as produced by
    /// `ReportStore::dump_attachment_contents`.
    pub attachment_contents: BTreeMap<String, Vec<u8>>,
}

/// Counts of what a restore merged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub test_results: usize,
    pub attachments: usize,
    pub fixtures: usize,
    pub buckets_reconciled: usize,
}
