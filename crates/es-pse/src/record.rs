//! Per-sample records and the run-level execution status.

use std::fmt;

use es_core::Error;
use serde::Serialize;

use crate::pipeline::OutputRecord;

/// Why a sample failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// A target path/index did not resolve against the cloned state.
    PathResolution(String),
    /// `configure` or `analyze_stability` returned an error.
    Analysis(String),
    /// The sample overran the per-sample time limit.
    Timeout {
        /// Configured limit in milliseconds.
        limit_ms: u64,
    },
    /// The run was cancelled before the sample started.
    Cancelled,
    /// The pipeline panicked.
    Panicked(String),
}

impl From<Error> for FailureReason {
    fn from(e: Error) -> Self {
        match e {
            Error::PathResolution(msg) => Self::PathResolution(msg),
            Error::Analysis(msg) => Self::Analysis(msg),
            other => Self::Analysis(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathResolution(msg) => write!(f, "path resolution: {}", msg),
            Self::Analysis(msg) => write!(f, "analysis: {}", msg),
            Self::Timeout { limit_ms } => write!(f, "timeout after {} ms", limit_ms),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

/// `success(outputs) | failed(reason)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SampleOutcome {
    /// Outputs of the analysis.
    Success(OutputRecord),
    /// Failure reason.
    Failed(FailureReason),
}

/// Values written by one PSE entry for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedValue {
    /// Entry name.
    pub name: String,
    /// Written values, one per entry index.
    pub values: Vec<f64>,
}

/// Outcome of one sample, tagged with its index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    /// Sample index in `[0, n_samples)`.
    pub index: usize,
    /// Perturbations applied before the analysis.
    pub applied: Vec<AppliedValue>,
    /// Result.
    pub outcome: SampleOutcome,
}

impl SampleRecord {
    /// Successful sample.
    pub fn success(index: usize, applied: Vec<AppliedValue>, outputs: OutputRecord) -> Self {
        Self { index, applied, outcome: SampleOutcome::Success(outputs) }
    }

    /// Failed sample.
    pub fn failed(index: usize, applied: Vec<AppliedValue>, reason: FailureReason) -> Self {
        Self { index, applied, outcome: SampleOutcome::Failed(reason) }
    }

    /// Whether the sample succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SampleOutcome::Success(_))
    }

    /// Outputs of a successful sample.
    pub fn outputs(&self) -> Option<&OutputRecord> {
        match &self.outcome {
            SampleOutcome::Success(out) => Some(out),
            SampleOutcome::Failed(_) => None,
        }
    }

    /// Failure reason of a failed sample.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            SampleOutcome::Success(_) => None,
            SampleOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionStatus {
    /// Samples attempted (records produced).
    pub n_samples: usize,
    /// Successful samples.
    pub n_success: usize,
    /// Failed samples (including timeouts and cancellations).
    pub n_failed: usize,
    /// `(sample index, reason)` of every failure, by index.
    pub failures: Vec<(usize, FailureReason)>,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl ExecutionStatus {
    /// Summarise records.
    pub fn from_records(records: &[SampleRecord], cancelled: bool) -> Self {
        let failures: Vec<(usize, FailureReason)> = records
            .iter()
            .filter_map(|r| r.failure().map(|f| (r.index, f.clone())))
            .collect();
        Self {
            n_samples: records.len(),
            n_success: records.len() - failures.len(),
            n_failed: failures.len(),
            failures,
            cancelled,
        }
    }

    /// Every sample succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.n_failed == 0 && !self.cancelled
    }

    /// No sample succeeded.
    pub fn all_failed(&self) -> bool {
        self.n_success == 0
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} samples succeeded, {} failed",
            self.n_success, self.n_samples, self.n_failed
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts() {
        let records = vec![
            SampleRecord::success(0, vec![], OutputRecord::new()),
            SampleRecord::failed(1, vec![], FailureReason::Analysis("singular".into())),
            SampleRecord::failed(2, vec![], FailureReason::Timeout { limit_ms: 5 }),
        ];
        let status = ExecutionStatus::from_records(&records, false);
        assert_eq!(status.n_success, 1);
        assert_eq!(status.n_failed, 2);
        assert_eq!(status.failures[1].0, 2);
        assert_eq!(status.to_string(), "1/3 samples succeeded, 2 failed");
        assert!(!status.all_failed());
    }

    #[test]
    fn test_error_to_reason() {
        let r: FailureReason = Error::PathResolution("x".into()).into();
        assert_eq!(r, FailureReason::PathResolution("x".into()));
        let r: FailureReason = Error::Computation("nan".into()).into();
        assert!(matches!(r, FailureReason::Analysis(msg) if msg.contains("nan")));
    }
}
