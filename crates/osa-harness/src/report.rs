//! Simulation reports

use crate::submitter::SubmissionOutcome;
use osa_core::WorkflowStatus;
use std::time::Duration;

/// One submitted workflow and how it ended
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub workflow_id: String,
    pub outcome: SubmissionOutcome,
}

impl SubmissionRecord {
    /// Accepted under a different id than the one submitted
    #[must_use]
    pub fn id_mismatch(&self) -> bool {
        match &self.outcome {
            SubmissionOutcome::Accepted { workflow_id, .. } => *workflow_id != self.workflow_id,
            _ => false,
        }
    }

    /// One-line description
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.outcome {
            SubmissionOutcome::Accepted {
                status,
                agents_received,
                latency,
                ..
            } => format!(
                "{}: accepted, status={status}, agents={agents_received}, {}ms",
                self.workflow_id,
                latency.as_millis()
            ),
            SubmissionOutcome::Rejected {
                http_status,
                error,
                message,
                ..
            } => format!("{}: rejected ({http_status} {error}): {message}", self.workflow_id),
            SubmissionOutcome::TransportFailed { error } => {
                format!("{}: not submitted: {error}", self.workflow_id)
            }
        }
    }
}

/// Result of a concurrent run
#[derive(Debug, Clone)]
pub struct ConcurrentReport {
    pub records: Vec<SubmissionRecord>,
    pub elapsed: Duration,
    pub max_in_flight: Option<usize>,
}

impl ConcurrentReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn accepted(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_accepted()).count()
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, SubmissionOutcome::Rejected { .. }))
            .count()
    }

    #[must_use]
    pub fn transport_failures(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.is_transport_failure())
            .count()
    }

    /// Accepted runs with the given status
    #[must_use]
    pub fn with_status(&self, status: WorkflowStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.status() == Some(status))
            .count()
    }

    /// Ids whose acceptance echoed a different workflow id
    #[must_use]
    pub fn mismatched_ids(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.id_mismatch())
            .map(|r| r.workflow_id.as_str())
            .collect()
    }

    /// Workflows per second over the whole run
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempted() as f64 / secs
        } else {
            0.0
        }
    }

    /// Every workflow reached the endpoint, was accepted, and kept its id
    #[must_use]
    pub fn passed(&self) -> bool {
        self.transport_failures() == 0 && self.rejected() == 0 && self.mismatched_ids().is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== OSA Concurrent Simulation Report ===\n\n");
        report.push_str(&format!("Workflows Attempted: {}\n", self.attempted()));
        report.push_str(&format!("Accepted: {}\n", self.accepted()));
        report.push_str(&format!(
            "  complete: {}, partial: {}, failed: {}\n",
            self.with_status(WorkflowStatus::Complete),
            self.with_status(WorkflowStatus::Partial),
            self.with_status(WorkflowStatus::Failed)
        ));
        report.push_str(&format!("Rejected by Endpoint: {}\n", self.rejected()));
        report.push_str(&format!("Transport Failures: {}\n", self.transport_failures()));
        report.push_str(&format!(
            "Max In Flight: {}\n",
            self.max_in_flight
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
        ));
        report.push_str(&format!("Elapsed: {}ms\n", self.elapsed.as_millis()));
        report.push_str(&format!("Throughput: {:.2} workflows/s\n", self.throughput()));

        let problems: Vec<&SubmissionRecord> = self
            .records
            .iter()
            .filter(|r| !r.outcome.is_accepted() || r.id_mismatch())
            .collect();
        if !problems.is_empty() {
            report.push_str("\n=== Problems ===\n");
            for (i, record) in problems.iter().enumerate() {
                report.push_str(&format!("{}. {}\n", i + 1, record.describe()));
                if record.id_mismatch() {
                    report.push_str("   endpoint echoed a different workflow id\n");
                }
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// One named sweep scenario and its outcome
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub expected: WorkflowStatus,
    pub record: SubmissionRecord,
}

impl ScenarioResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.record.outcome.status() == Some(self.expected)
    }
}

/// Result of a failure-scenario sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub scenarios: Vec<ScenarioResult>,
}

impl SweepReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.scenarios.is_empty() && self.scenarios.iter().all(ScenarioResult::passed)
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== OSA Failure Scenario Sweep ===\n\n");
        for scenario in &self.scenarios {
            let actual = match &scenario.record.outcome {
                SubmissionOutcome::Accepted { status, .. } => status.to_string(),
                SubmissionOutcome::Rejected { http_status, error, .. } => {
                    format!("rejected ({http_status} {error})")
                }
                SubmissionOutcome::TransportFailed { error } => format!("not submitted ({error})"),
            };
            report.push_str(&format!(
                "[{}] {}: expected {}, got {}\n",
                if scenario.passed() { "PASS" } else { "FAIL" },
                scenario.name,
                scenario.expected,
                actual
            ));
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submitter::TransportError;

    fn accepted(id: &str, echoed: &str, status: WorkflowStatus) -> SubmissionRecord {
        SubmissionRecord {
            workflow_id: id.to_string(),
            outcome: SubmissionOutcome::Accepted {
                workflow_id: echoed.to_string(),
                status,
                agents_received: 9,
                latency: Duration::from_millis(4),
            },
        }
    }

    fn unreachable(id: &str) -> SubmissionRecord {
        SubmissionRecord {
            workflow_id: id.to_string(),
            outcome: SubmissionOutcome::TransportFailed {
                error: TransportError::Connect("connection refused".to_string()),
            },
        }
    }

    #[test]
    fn transport_failures_are_counted_apart_from_rejections() {
        let report = ConcurrentReport {
            records: vec![
                accepted("a", "a", WorkflowStatus::Complete),
                unreachable("b"),
            ],
            elapsed: Duration::from_secs(1),
            max_in_flight: None,
        };

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.transport_failures(), 1);
        assert_eq!(report.rejected(), 0);
        assert!(!report.passed());
        assert!((report.throughput() - 2.0).abs() < f64::EPSILON);
        assert!(report.generate_text().contains("b: not submitted"));
    }

    #[test]
    fn echoed_id_mismatch_fails_the_run() {
        let report = ConcurrentReport {
            records: vec![accepted("a", "b", WorkflowStatus::Partial)],
            elapsed: Duration::from_millis(10),
            max_in_flight: Some(4),
        };

        assert_eq!(report.mismatched_ids(), vec!["a"]);
        assert!(!report.passed());
    }

    #[test]
    fn sweep_passes_only_when_every_status_matches() {
        let mut report = SweepReport {
            scenarios: vec![ScenarioResult {
                name: "all-success".to_string(),
                expected: WorkflowStatus::Complete,
                record: accepted("a", "a", WorkflowStatus::Complete),
            }],
        };
        assert!(report.passed());

        report.scenarios.push(ScenarioResult {
            name: "all-fail".to_string(),
            expected: WorkflowStatus::Failed,
            record: unreachable("b"),
        });
        assert!(!report.passed());
        assert!(report.generate_text().contains("[FAIL] all-fail"));
        assert!(!SweepReport::default().passed());
    }
}
