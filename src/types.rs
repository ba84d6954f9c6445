use colored::Colorize;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{error::Error, fmt::Display};

#[derive(Debug)]
pub struct ProviderError {
    pub msg: String,
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl Error for ProviderError {
    fn description(&self) -> &str {
        &self.msg
    }
}

/// Fatal errors of a single evaluation run. None of these produce a report:
/// the identifier and expectation set are rejected before the provider is
/// called, and a provider failure aborts the run without partial results.
#[derive(Debug)]
pub enum EvaluateError {
    InvalidIdentifier(String),
    EmptyExpectationSet,
    Provider(ProviderError),
}

impl Display for EvaluateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluateError::InvalidIdentifier(id) => {
                write!(f, "not a valid resource identifier: '{}'", id)
            }
            EvaluateError::EmptyExpectationSet => {
                f.write_str("expectation set is empty - nothing to check")
            }
            EvaluateError::Provider(err) => write!(f, "provider call failed: {}", err),
        }
    }
}

impl Error for EvaluateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EvaluateError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-expectation errors. These are recorded in the report next to the
/// expectation they belong to and never abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckError {
    ResourceNotFound,
    FieldNotFound(FieldPath),
    NotAMapping(FieldPath),
}

impl Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckError::ResourceNotFound => f.write_str("resource not found"),
            CheckError::FieldNotFound(path) => {
                write!(f, "field '{}' not present in the fetched resource", path)
            }
            CheckError::NotAMapping(path) => write!(f, "field '{}' is not a mapping", path),
        }
    }
}

impl Error for CheckError {}

/// Dot-separated path addressing a field of a fetched resource, either a
/// scalar field ("cidr_block") or a key inside a mapping ("tags.Name").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        FieldPath(value.to_string())
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Mapping(BTreeMap<String, FieldValue>),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Scalar(s) => f.write_str(s),
            FieldValue::Mapping(entries) => {
                let rendered = entries.iter().map(|(k, v)| format!("{}={}", k, v)).join(", ");
                write!(f, "{{{}}}", rendered)
            }
        }
    }
}

/// Point-in-time state of a single resource. Built once per evaluation from
/// the provider response and never re-fetched mid-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    fields: BTreeMap<String, FieldValue>,
}

impl ResourceSnapshot {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        ResourceSnapshot { fields }
    }

    /// Walks the path segments into the snapshot. Returns None if a segment
    /// is missing or a non-terminal segment resolves to a scalar.
    pub fn resolve(&self, path: &FieldPath) -> Option<&FieldValue> {
        let mut segments = path.segments();
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            match current {
                FieldValue::Mapping(entries) => current = entries.get(segment)?,
                FieldValue::Scalar(_) => return None,
            }
        }
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expectation {
    Exists,
    Equals {
        path: FieldPath,
        expected: FieldValue,
    },
    ContainsEntry {
        path: FieldPath,
        key: String,
        value: String,
    },
}

impl Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::Exists => f.write_str("resource exists"),
            Expectation::Equals { path, expected } => write!(f, "{} equals {}", path, expected),
            Expectation::ContainsEntry { path, key, value } => {
                write!(f, "{} contains {}={}", path, key, value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed {
        actual: Option<FieldValue>,
        expected: Option<FieldValue>,
    },
    Error(CheckError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub expectation: Expectation,
    pub status: CheckStatus,
}

impl Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            CheckStatus::Passed => {
                write!(f, "{}", format!("PASS: {}", self.expectation).green())
            }
            CheckStatus::Failed { actual, expected } => {
                let detail = match (actual, expected) {
                    (Some(actual), Some(expected)) => {
                        format!(" (expected: {}, actual: {})", expected, actual)
                    }
                    (None, Some(expected)) => {
                        format!(" (expected: {}, actual: absent)", expected)
                    }
                    _ => String::new(),
                };
                write!(f, "{}", format!("FAIL: {}{}", self.expectation, detail).red())
            }
            CheckStatus::Error(err) => {
                write!(f, "{}", format!("ERROR: {}: {}", self.expectation, err).yellow())
            }
        }
    }
}

/// Results for one evaluation run, in expectation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub results: Vec<CheckResult>,
}

impl OutcomeReport {
    pub fn passed(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.status, CheckStatus::Passed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ResourceSnapshot {
        let tags = BTreeMap::from([(
            "Name".to_string(),
            FieldValue::Scalar("vpc-gabriel-p".to_string()),
        )]);
        let fields = BTreeMap::from([
            (
                "cidr_block".to_string(),
                FieldValue::Scalar("192.168.0.0/16".to_string()),
            ),
            ("tags".to_string(), FieldValue::Mapping(tags)),
        ]);
        ResourceSnapshot::new(fields)
    }

    #[test]
    fn test_resolve_scalar_field() {
        assert_eq!(
            snapshot().resolve(&"cidr_block".into()),
            Some(&FieldValue::Scalar("192.168.0.0/16".to_string()))
        );
    }

    #[test]
    fn test_resolve_nested_mapping_key() {
        assert_eq!(
            snapshot().resolve(&"tags.Name".into()),
            Some(&FieldValue::Scalar("vpc-gabriel-p".to_string()))
        );
    }

    #[test]
    fn test_resolve_missing_field() {
        assert_eq!(snapshot().resolve(&"dhcp_options_id".into()), None);
        assert_eq!(snapshot().resolve(&"tags.Team".into()), None);
    }

    #[test]
    fn test_resolve_through_scalar_fails() {
        assert_eq!(snapshot().resolve(&"cidr_block.prefix".into()), None);
    }
}
