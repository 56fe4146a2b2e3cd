use serde::{Deserialize, Serialize};

/// Name/value label attached by a test framework (`suite`, `owner`, `os`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Test parameter.
///
/// Hidden, masked and excluded parameters do not take part in the history
/// identity of a test. Hidden and masked still show up in reports (masked with
/// its value obscured); excluded is purely an identity opt-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub masked: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub excluded: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Whether this parameter contributes to the history identity.
    #[must_use]
    pub const fn identifies(&self) -> bool {
        !(self.hidden || self.masked || self.excluded)
    }
}

/// External link (issue tracker, TMS, docs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

/// Process-wide failure not tied to a single test (global setup, teardown).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// A failure that is expected for a given history id and tracked elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownIssue {
    pub history_id: String,
    #[serde(default)]
    pub issues: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifying_parameters() {
        let mut param = Parameter::new("browser", "firefox");
        assert!(param.identifies());
        param.masked = true;
        assert!(!param.identifies());
        let excluded = Parameter {
            excluded: true,
            ..Parameter::new("attempt", "3")
        };
        assert!(!excluded.identifies());
    }

    #[test]
    fn parameter_flags_default_when_absent() {
        let param: Parameter =
            serde_json::from_str(r#"{"name":"user","value":"bob"}"#).expect("decode");
        assert!(param.identifies());
        let encoded = serde_json::to_string(&param).expect("encode");
        assert_eq!(encoded, r#"{"name":"user","value":"bob"}"#);
    }
}
