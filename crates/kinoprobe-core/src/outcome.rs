//! Test outcomes and the run summary
//!
//! Every probe returns a [`TestOutcome`]; the runner aggregates them into a
//! [`RunSummary`] that is both printed and persisted as `summary.json`.

use serde::{Deserialize, Serialize};

/// Final status of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Skip => "SKIP",
        };
        f.write_str(s)
    }
}

/// Result of one probe: a status plus the accumulated error messages
///
/// Errors are ordered as they were discovered. A SKIP outcome carries the
/// reason for skipping as its only message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub status: TestStatus,
    pub errors: Vec<String>,
}

impl TestOutcome {
    /// PASS when the accumulator is empty, FAIL otherwise
    pub fn from_errors(errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };
        Self { status, errors }
    }

    /// FAIL with the given messages
    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            status: TestStatus::Fail,
            errors,
        }
    }

    /// SKIP with an explanatory reason
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skip,
            errors: vec![reason.into()],
        }
    }
}

/// One row of the run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: String,
    pub status: TestStatus,
    pub errors: Vec<String>,
}

/// Aggregate of all probe outcomes for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub results: Vec<TestRecord>,
}

impl RunSummary {
    pub fn record(&mut self, id: impl Into<String>, outcome: TestOutcome) {
        self.results.push(TestRecord {
            id: id.into(),
            status: outcome.status,
            errors: outcome.errors,
        });
    }

    /// True when at least one probe reported FAIL; SKIP never fails a run
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == TestStatus::Fail)
    }

    pub fn get(&self, id: &str) -> Option<&TestRecord> {
        self.results.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errors_empty_is_pass() {
        let outcome = TestOutcome::from_errors(Vec::new());
        assert_eq!(outcome.status, TestStatus::Pass);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_from_errors_nonempty_is_fail() {
        let outcome = TestOutcome::from_errors(vec!["status: expected int, got string".into()]);
        assert_eq!(outcome.status, TestStatus::Fail);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_skip_carries_reason() {
        let outcome = TestOutcome::skip("mutating tests disabled (enable with --include-mutating)");
        assert_eq!(outcome.status, TestStatus::Skip);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("--include-mutating"));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&TestStatus::Pass).unwrap();
        assert_eq!(json, "\"PASS\"");
        let json = serde_json::to_string(&TestStatus::Skip).unwrap();
        assert_eq!(json, "\"SKIP\"");
    }

    #[test]
    fn test_summary_failure_detection() {
        let mut summary = RunSummary::default();
        summary.record("test-a", TestOutcome::from_errors(Vec::new()));
        summary.record("test-b", TestOutcome::skip("disabled"));
        assert!(!summary.has_failures());

        summary.record("test-c", TestOutcome::fail(vec!["boom".into()]));
        assert!(summary.has_failures());
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let mut summary = RunSummary::default();
        summary.record("test-user", TestOutcome::from_errors(vec!["user: expected object, got array".into()]));
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results.len(), 1);
        assert_eq!(back.results[0].id, "test-user");
        assert_eq!(back.results[0].status, TestStatus::Fail);
    }
}
