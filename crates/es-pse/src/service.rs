//! Parameter-space exploration runner.
//!
//! Every sample clones the base state, applies its perturbations and runs the
//! analysis pipeline on a rayon worker. A failing sample is recorded and the run
//! continues; records are tagged by sample index and returned in input order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use es_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedResult, AggregationPolicy, aggregate, aggregate_strict};
use crate::hypothesis::Connectivity;
use crate::params::PseParameterSet;
use crate::pipeline::AnalysisPipeline;
use crate::record::{ExecutionStatus, FailureReason, SampleOutcome, SampleRecord};
use crate::target::SampleState;

/// Cooperative cancellation flag shared with a running exploration.
///
/// Once cancelled, samples that have not started are recorded as
/// [`FailureReason::Cancelled`]; samples already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution settings of a [`PseService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Worker threads (0 = rayon default).
    pub workers: usize,
    /// Per-sample time limit in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Treatment of fields missing from some samples.
    pub aggregation: AggregationPolicy,
    /// Fail when successful samples disagree on their output fields.
    pub strict_aggregation: bool,
}

impl ServiceSettings {
    /// Per-sample time limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Runs an analysis pipeline over every sample of a parameter set.
pub struct PseService<P> {
    name: String,
    base: SampleState,
    connectivity: Arc<Connectivity>,
    params: PseParameterSet,
    pipeline: Arc<P>,
    settings: ServiceSettings,
    cancel: CancellationToken,
}

impl<P> PseService<P>
where
    P: AnalysisPipeline + 'static,
{
    /// Exploration of `params` around `base`.
    pub fn new(
        name: impl Into<String>,
        base: SampleState,
        connectivity: Connectivity,
        params: PseParameterSet,
        pipeline: P,
    ) -> Self {
        Self {
            name: name.into(),
            base,
            connectivity: Arc::new(connectivity),
            params,
            pipeline: Arc::new(pipeline),
            settings: ServiceSettings::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace all execution settings.
    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Worker threads (0 = rayon default).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.settings.workers = workers;
        self
    }

    /// Per-sample time limit, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.timeout_ms = timeout.map(|t| t.as_nanos().div_ceil(1_000_000) as u64);
        self
    }

    /// Aggregation policy for mismatched output fields.
    pub fn with_aggregation(mut self, policy: AggregationPolicy) -> Self {
        self.settings.aggregation = policy;
        self
    }

    /// Fail the run when successful samples disagree on their output fields.
    pub fn with_strict_aggregation(mut self, strict: bool) -> Self {
        self.settings.strict_aggregation = strict;
        self
    }

    /// Current execution settings.
    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Share an external cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token cancelling this service's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Exploration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter set.
    pub fn params(&self) -> &PseParameterSet {
        &self.params
    }

    /// Run every sample and return one record per sample, sorted by index.
    ///
    /// Only a failure to build the worker pool is an error.
    pub fn run_records(&self) -> Result<Vec<SampleRecord>> {
        let start = Instant::now();
        let indices: Vec<usize> = (0..self.params.n_samples()).collect();

        let run_samples = |indices: &[usize]| -> Vec<SampleRecord> {
            indices.par_iter().map(|&i| self.run_sample(i)).collect()
        };

        let mut records = if self.settings.workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.settings.workers)
                .build()
                .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;
            pool.install(|| run_samples(&indices))
        } else {
            run_samples(&indices)
        };
        records.sort_by_key(|r| r.index);

        log::debug!(
            "PSE `{}`: {} samples in {:.3}s",
            self.name,
            records.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(records)
    }

    /// Run the exploration and aggregate the successful samples.
    ///
    /// Sample failures never make this fail; they are reported in the status.
    pub fn run(&self) -> Result<(AggregatedResult, ExecutionStatus)> {
        let records = self.run_records()?;
        let status = ExecutionStatus::from_records(&records, self.cancel.is_cancelled());
        if status.n_failed > 0 {
            log::warn!("PSE `{}`: {}", self.name, status);
        } else {
            log::info!("PSE `{}`: {}", self.name, status);
        }
        let result = if self.settings.strict_aggregation {
            aggregate_strict(&records)?
        } else {
            aggregate(&records, self.settings.aggregation)
        };
        Ok((result, status))
    }

    fn run_sample(&self, index: usize) -> SampleRecord {
        if self.cancel.is_cancelled() {
            return SampleRecord::failed(index, Vec::new(), FailureReason::Cancelled);
        }

        let mut state = self.base.clone();
        let applied = match self.params.apply(index, &mut state) {
            Ok(applied) => applied,
            Err(e) => {
                log::warn!("PSE `{}` sample {}: {}", self.name, index, e);
                return SampleRecord::failed(index, Vec::new(), e.into());
            }
        };

        let outcome = match self.settings.timeout() {
            None => execute(&*self.pipeline, &state, &self.connectivity),
            Some(limit) => execute_with_timeout(
                Arc::clone(&self.pipeline),
                state,
                Arc::clone(&self.connectivity),
                index,
                limit,
            ),
        };
        if let SampleOutcome::Failed(reason) = &outcome {
            log::warn!("PSE `{}` sample {} failed: {}", self.name, index, reason);
        }
        SampleRecord { index, applied, outcome }
    }
}

fn execute<P: AnalysisPipeline>(
    pipeline: &P,
    state: &SampleState,
    connectivity: &Connectivity,
) -> SampleOutcome {
    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        let configuration = pipeline.configure(state, connectivity)?;
        pipeline.analyze_stability(configuration)
    }));
    match run {
        Ok(Ok(outputs)) => SampleOutcome::Success(outputs),
        Ok(Err(e)) => SampleOutcome::Failed(e.into()),
        Err(payload) => SampleOutcome::Failed(FailureReason::Panicked(panic_message(&*payload))),
    }
}

/// Run on a detached thread; on overrun the thread is abandoned.
fn execute_with_timeout<P: AnalysisPipeline + 'static>(
    pipeline: Arc<P>,
    state: SampleState,
    connectivity: Arc<Connectivity>,
    index: usize,
    limit: Duration,
) -> SampleOutcome {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new().name(format!("pse-sample-{}", index)).spawn(move || {
        let _ = tx.send(execute(&*pipeline, &state, &connectivity));
    });
    if let Err(e) = spawned {
        return SampleOutcome::Failed(FailureReason::Panicked(format!(
            "cannot spawn sample thread: {}",
            e
        )));
    }
    match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            SampleOutcome::Failed(FailureReason::Timeout { limit_ms: limit.as_millis() as u64 })
        }
        Err(RecvTimeoutError::Disconnected) => SampleOutcome::Failed(FailureReason::Panicked(
            "sample thread exited without a result".to_string(),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ModelConfigurationService;
    use crate::hypothesis::DiseaseHypothesis;
    use crate::params::{PseParameter, PseSamples};
    use crate::pipeline::{FnPipeline, OutputRecord};
    use crate::target::{FieldIndex, PseTarget};

    fn setup(samples: Vec<f64>) -> (SampleState, Connectivity, PseParameterSet) {
        let h = DiseaseHypothesis::builder(3).excitability(vec![0], vec![0.5]).build().unwrap();
        let state = SampleState::new(h, ModelConfigurationService::new(3).unwrap()).unwrap();
        let conn = Connectivity::from_rows(&vec![vec![0.0; 3]; 3], vec![]).unwrap();
        let entry = PseParameter::new(
            "x0",
            PseTarget::parse("x0_values").unwrap(),
            vec![FieldIndex::Position(0)],
            PseSamples::Scalar(samples),
        )
        .unwrap();
        (state, conn, PseParameterSet::new(vec![entry]).unwrap())
    }

    fn x0_record(state: &SampleState, _c: &Connectivity) -> Result<f64> {
        Ok(state.hypothesis.x0_values()[0])
    }

    #[test]
    fn test_timeout_becomes_failed_record() {
        let (state, conn, params) = setup(vec![0.1, 0.9]);
        let pipeline = FnPipeline::new(x0_record, |v: f64| {
            if v > 0.5 {
                thread::sleep(Duration::from_millis(500));
            }
            Ok(OutputRecord::from([("x0".to_string(), v.into())]))
        });
        let svc = PseService::new("timeout", state, conn, params, pipeline)
            .with_timeout(Some(Duration::from_millis(50)));
        let (agg, status) = svc.run().unwrap();
        assert_eq!(status.n_success, 1);
        assert_eq!(status.failures, vec![(1, FailureReason::Timeout { limit_ms: 50 })]);
        assert_eq!(agg.scalars("x0").unwrap(), vec![0.1]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (state, conn, params) = setup(vec![0.1, 0.2, 0.3]);
        let pipeline = FnPipeline::new(x0_record, |v: f64| {
            Ok(OutputRecord::from([("x0".to_string(), v.into())]))
        });
        let svc = PseService::new("cancel", state, conn, params, pipeline);
        svc.cancellation_token().cancel();
        let records = svc.run_records().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.failure() == Some(&FailureReason::Cancelled)));
        let (agg, status) = svc.run().unwrap();
        assert!(status.cancelled);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_panic_is_isolated() {
        let (state, conn, params) = setup(vec![0.1, 0.9]);
        let pipeline = FnPipeline::new(x0_record, |v: f64| {
            if v > 0.5 {
                panic!("diverged");
            }
            Ok(OutputRecord::from([("x0".to_string(), v.into())]))
        });
        let svc = PseService::new("panic", state, conn, params, pipeline).with_workers(2);
        let (_, status) = svc.run().unwrap();
        assert_eq!(status.n_success, 1);
        assert_eq!(status.failures, vec![(1, FailureReason::Panicked("diverged".to_string()))]);
    }

    #[test]
    fn test_path_resolution_is_per_sample() {
        let (state, conn, _) = setup(vec![0.1]);
        let entry = PseParameter::new(
            "missing",
            PseTarget::parse("hypothesis.e_values").unwrap(),
            vec![FieldIndex::Position(0)],
            PseSamples::Scalar(vec![0.1, 0.2]),
        )
        .unwrap();
        let params = PseParameterSet::new(vec![entry]).unwrap();
        let pipeline = FnPipeline::new(x0_record, |v: f64| {
            Ok(OutputRecord::from([("x0".to_string(), v.into())]))
        });
        let (agg, status) = PseService::new("p", state, conn, params, pipeline).run().unwrap();
        assert_eq!(status.n_failed, 2);
        assert!(matches!(status.failures[0].1, FailureReason::PathResolution(_)));
        assert!(agg.is_empty());
    }
}
