//! The external analysis pipeline seam (`configure` + `analyze_stability`).

use std::collections::BTreeMap;
use std::fmt;

use es_core::Result;
use serde::{Deserialize, Serialize};

use crate::hypothesis::Connectivity;
use crate::target::SampleState;

/// One named output value of the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// Flag (e.g. `stable`).
    Bool(bool),
    /// Scalar (e.g. largest eigenvalue).
    Scalar(f64),
    /// Per-region array (e.g. propagation strengths).
    Vector(Vec<f64>),
    /// Padding for a field a successful sample did not produce.
    Missing,
}

impl OutputValue {
    /// Whether this is the padding sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<bool> for OutputValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for OutputValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for OutputValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

/// Named outputs of one successful sample.
pub type OutputRecord = BTreeMap<String, OutputValue>;

/// Deterministic analysis run for every sample.
///
/// Both steps may fail with a domain error; the PSE service records that as a
/// per-sample failure.
pub trait AnalysisPipeline: Send + Sync {
    /// Intermediate model configuration handed from `configure` to `analyze_stability`.
    type Configuration: Send;

    /// Build the model configuration of a (perturbed) state.
    fn configure(&self, state: &SampleState, connectivity: &Connectivity)
    -> Result<Self::Configuration>;

    /// Stability analysis of a configuration.
    fn analyze_stability(&self, configuration: Self::Configuration) -> Result<OutputRecord>;
}

/// Pipeline assembled from two closures.
pub struct FnPipeline<F, G> {
    configure: F,
    analyze: G,
}

impl<F, G> FnPipeline<F, G> {
    /// Wrap `configure` and `analyze_stability` closures.
    pub fn new<C>(configure: F, analyze: G) -> Self
    where
        F: Fn(&SampleState, &Connectivity) -> Result<C>,
        G: Fn(C) -> Result<OutputRecord>,
    {
        Self { configure, analyze }
    }
}

impl<F, G> fmt::Debug for FnPipeline<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPipeline").finish_non_exhaustive()
    }
}

impl<C, F, G> AnalysisPipeline for FnPipeline<F, G>
where
    C: Send,
    F: Fn(&SampleState, &Connectivity) -> Result<C> + Send + Sync,
    G: Fn(C) -> Result<OutputRecord> + Send + Sync,
{
    type Configuration = C;

    fn configure(&self, state: &SampleState, connectivity: &Connectivity) -> Result<C> {
        (self.configure)(state, connectivity)
    }

    fn analyze_stability(&self, configuration: C) -> Result<OutputRecord> {
        (self.analyze)(configuration)
    }
}
