//! This checker asserts static properties of a single resource.
//! It can check the following conditions right now:
//!
//! - The resource exists at all.
//! - A field of the resource equals an expected literal.
//! - A mapping-shaped field contains an expected key/value entry.

use derive_builder::Builder;
use log::{debug, info};

use crate::provider::{FetchOutcome, ResourceProvider};
use crate::types::{
    CheckError, CheckResult, CheckStatus, EvaluateError, Expectation, FieldValue, OutcomeReport,
    ResourceSnapshot,
};

/// One evaluation run: a resource identifier plus the ordered expectations
/// to assert against it. The resource is fetched exactly once per run and
/// every expectation is evaluated against that one snapshot.
#[derive(Debug, Builder)]
pub struct PropertyCheck {
    resource_id: String,
    #[builder(default = "vec![]")]
    expectations: Vec<Expectation>,
}

impl PropertyCheck {
    pub async fn evaluate(
        &self,
        provider: &impl ResourceProvider,
    ) -> Result<OutcomeReport, EvaluateError> {
        if !provider.valid_id(&self.resource_id) {
            return Err(EvaluateError::InvalidIdentifier(self.resource_id.clone()));
        }
        if self.expectations.is_empty() {
            return Err(EvaluateError::EmptyExpectationSet);
        }
        info!(
            "Checking {} expectations against {}",
            self.expectations.len(),
            self.resource_id
        );
        let outcome = provider
            .fetch(&self.resource_id)
            .await
            .map_err(EvaluateError::Provider)?;
        let results = match outcome {
            FetchOutcome::NotFound => self.expectations.iter().map(Self::check_absent).collect(),
            FetchOutcome::Found(snapshot) => self
                .expectations
                .iter()
                .map(|e| Self::check(e, &snapshot))
                .collect(),
        };
        Ok(OutcomeReport { results })
    }

    /// The resource is gone: existence fails outright, every field-level
    /// expectation has nothing to compare against.
    fn check_absent(expectation: &Expectation) -> CheckResult {
        let status = match expectation {
            Expectation::Exists => CheckStatus::Failed {
                actual: None,
                expected: None,
            },
            _ => CheckStatus::Error(CheckError::ResourceNotFound),
        };
        CheckResult {
            expectation: expectation.clone(),
            status,
        }
    }

    fn check(expectation: &Expectation, snapshot: &ResourceSnapshot) -> CheckResult {
        debug!("Checking: {}", expectation);
        let status = match expectation {
            Expectation::Exists => CheckStatus::Passed,
            Expectation::Equals { path, expected } => match snapshot.resolve(path) {
                None => CheckStatus::Error(CheckError::FieldNotFound(path.clone())),
                Some(actual) if actual == expected => CheckStatus::Passed,
                Some(actual) => CheckStatus::Failed {
                    actual: Some(actual.clone()),
                    expected: Some(expected.clone()),
                },
            },
            Expectation::ContainsEntry { path, key, value } => match snapshot.resolve(path) {
                None => CheckStatus::Error(CheckError::FieldNotFound(path.clone())),
                Some(FieldValue::Scalar(_)) => {
                    CheckStatus::Error(CheckError::NotAMapping(path.clone()))
                }
                Some(FieldValue::Mapping(entries)) => {
                    let expected = FieldValue::Scalar(value.clone());
                    match entries.get(key) {
                        Some(actual) if *actual == expected => CheckStatus::Passed,
                        Some(actual) => CheckStatus::Failed {
                            actual: Some(actual.clone()),
                            expected: Some(expected),
                        },
                        None => CheckStatus::Failed {
                            actual: None,
                            expected: Some(expected),
                        },
                    }
                }
            },
        };
        CheckResult {
            expectation: expectation.clone(),
            status,
        }
    }
}
