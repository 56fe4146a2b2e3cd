//! Stable test identity.
//!
//! `history_id = H(test_key) "." H(parameter_signature)` where `H` is
//! lowercase hex SHA-256. The parameter signature is sorted, so parameter
//! declaration order does not matter; hidden, masked and excluded parameters
//! are skipped. `test_case_id = H(full_name)` ignores parameters entirely.

use std::fmt::Write;

use freport_types::Parameter;
use sha2::{Digest, Sha256};

/// Resolved identity of one raw test result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub history_id: String,
    pub test_case_id: Option<String>,
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// Order-independent signature over identifying parameters.
///
/// Each sorted pair is written as `<len>:<name><len>:<value>` with byte
/// lengths, so no name or value content can mimic a pair boundary. No
/// identifying parameters gives the empty signature.
#[must_use]
pub fn parameter_signature(parameters: &[Parameter]) -> String {
    let mut pairs: Vec<(&str, &str)> = parameters
        .iter()
        .filter(|param| param.identifies())
        .map(|param| (param.name.as_str(), param.value.as_str()))
        .collect();
    pairs.sort_unstable();
    let mut signature = String::new();
    for (name, value) in pairs {
        let _ = write!(&mut signature, "{}:{name}{}:{value}", name.len(), value.len());
    }
    signature
}

/// History id of a test key plus its parameters, or the explicit override.
#[must_use]
pub fn resolve_history_id(
    test_key: &str,
    parameters: &[Parameter],
    explicit_history_id: Option<&str>,
) -> String {
    if let Some(explicit) = explicit_history_id.filter(|id| !id.is_empty()) {
        return explicit.to_owned();
    }
    format!(
        "{}.{}",
        sha256_hex(test_key),
        sha256_hex(&parameter_signature(parameters))
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Full identity from the optional identifying fields of a raw record.
///
/// The test key falls back `test_id` → `full_name` → `name` → `""`;
/// the test case id uses `full_name` → `name` and is `None` when both are absent.
#[must_use]
pub fn resolve_identity(
    test_id: Option<&str>,
    full_name: Option<&str>,
    name: Option<&str>,
    parameters: &[Parameter],
    explicit_history_id: Option<&str>,
) -> Identity {
    let test_key = non_empty(test_id)
        .or_else(|| non_empty(full_name))
        .or_else(|| non_empty(name))
        .unwrap_or_default();
    let test_case_id = non_empty(full_name).or_else(|| non_empty(name)).map(sha256_hex);
    Identity {
        history_id: resolve_history_id(test_key, parameters, explicit_history_id),
        test_case_id,
    }
}
