//! Store configuration.
//!
//! Loadable from TOML (the usual report config file) or JSON:
//!
//! ```toml
//! tie_break = "last_ingested_wins"
//! history_limit = 20
//!
//! [variables]
//! branch = "main"
//!
//! [[environments]]
//! name = "linux"
//! matcher = { kind = "label_equals", name = "os", value = "linux" }
//! variables = { arch = "x86_64" }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use freport_error::{ReportError, Result};
use freport_types::{DEFAULT_ENVIRONMENT, Label};
use serde::{Deserialize, Serialize};

/// How two results with identical start timestamps in one bucket are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The result ingested later becomes visible.
    #[default]
    LastIngestedWins,
    /// The result ingested first stays visible.
    FirstIngestedWins,
}

/// Declarative predicate over a result's labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentMatcher {
    Always,
    LabelEquals {
        name: String,
        value: String,
    },
    LabelPresent {
        name: String,
    },
    LabelMatchesAny {
        name: String,
        values: Vec<String>,
    },
    All {
        matchers: Vec<EnvironmentMatcher>,
    },
    Any {
        matchers: Vec<EnvironmentMatcher>,
    },
    Not {
        matcher: Box<EnvironmentMatcher>,
    },
}

impl EnvironmentMatcher {
    pub fn label_equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::LabelEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, labels: &[Label]) -> bool {
        match self {
            Self::Always => true,
            Self::LabelEquals { name, value } => labels
                .iter()
                .any(|label| &label.name == name && &label.value == value),
            Self::LabelPresent { name } => labels.iter().any(|label| &label.name == name),
            Self::LabelMatchesAny { name, values } => labels
                .iter()
                .any(|label| &label.name == name && values.contains(&label.value)),
            Self::All { matchers } => matchers.iter().all(|m| m.matches(labels)),
            Self::Any { matchers } => matchers.iter().any(|m| m.matches(labels)),
            Self::Not { matcher } => !matcher.matches(labels),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    pub matcher: EnvironmentMatcher,
}

impl EnvironmentConfig {
    pub fn new(name: impl Into<String>, matcher: EnvironmentMatcher) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
            matcher,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Evaluated in order; the first matching environment wins.
    pub environments: Vec<EnvironmentConfig>,
    /// Report-wide variables, merged under each environment's own variables.
    pub variables: BTreeMap<String, String>,
    /// Keep only the newest N history data points.
    pub history_limit: Option<usize>,
    pub tie_break: TieBreak,
    /// Mark a passing visible result flaky when one of its retries failed.
    pub detect_flaky: bool,
    pub logging: LoggingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            environments: Vec::new(),
            variables: BTreeMap::new(),
            history_limit: None,
            tie_break: TieBreak::default(),
            detect_flaky: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check environment names: non-empty, unique, and not `default`.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for env in &self.environments {
            let name = env.name.trim();
            if name.is_empty() {
                return Err(ReportError::config("environment name must not be empty"));
            }
            if name == DEFAULT_ENVIRONMENT {
                return Err(ReportError::config(format!(
                    "environment name '{DEFAULT_ENVIRONMENT}' is reserved"
                )));
            }
            if !seen.insert(name) {
                return Err(ReportError::DuplicateEnvironment {
                    name: name.to_owned(),
                });
            }
        }
        if self.history_limit == Some(0) {
            return Err(ReportError::config("history_limit must be at least 1"));
        }
        Ok(())
    }
}
