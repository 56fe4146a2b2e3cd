//! Environment classification.
//!
//! Each result lands in exactly one environment: the first configured
//! environment whose matcher accepts the result's labels, else `default`.

use std::collections::BTreeMap;

use freport_types::{DEFAULT_ENVIRONMENT, Label};

use crate::config::EnvironmentConfig;

#[derive(Debug, Clone, Default)]
pub struct EnvironmentClassifier {
    environments: Vec<EnvironmentConfig>,
}

impl EnvironmentClassifier {
    #[must_use]
    pub fn new(environments: Vec<EnvironmentConfig>) -> Self {
        Self { environments }
    }

    /// Name of the environment the labels belong to.
    #[must_use]
    pub fn classify(&self, labels: &[Label]) -> &str {
        self.environments
            .iter()
            .find(|env| env.matcher.matches(labels))
            .map_or(DEFAULT_ENVIRONMENT, |env| env.name.as_str())
    }

    /// `default` followed by the configured environments in declared order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        std::iter::once(DEFAULT_ENVIRONMENT.to_owned())
            .chain(self.environments.iter().map(|env| env.name.clone()))
            .collect()
    }

    /// Variables declared on one configured environment.
    #[must_use]
    pub fn variables(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.environments
            .iter()
            .find(|env| env.name == name)
            .map(|env| &env.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentMatcher;

    fn classifier() -> EnvironmentClassifier {
        EnvironmentClassifier::new(vec![
            EnvironmentConfig::new("linux", EnvironmentMatcher::label_equals("os", "linux")),
            EnvironmentConfig::new(
                "any-os",
                EnvironmentMatcher::LabelPresent {
                    name: "os".to_owned(),
                },
            ),
        ])
    }

    #[test]
    fn first_match_wins() {
        let c = classifier();
        assert_eq!(c.classify(&[Label::new("os", "linux")]), "linux");
        assert_eq!(c.classify(&[Label::new("os", "mac")]), "any-os");
    }

    #[test]
    fn unmatched_goes_to_default() {
        assert_eq!(classifier().classify(&[]), DEFAULT_ENVIRONMENT);
        assert_eq!(
            EnvironmentClassifier::default().classify(&[Label::new("os", "linux")]),
            DEFAULT_ENVIRONMENT
        );
    }

    #[test]
    fn names_start_with_default() {
        assert_eq!(classifier().names(), vec!["default", "linux", "any-os"]);
    }
}
