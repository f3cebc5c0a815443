//! # es-pse
//!
//! Parameter-space exploration (PSE) over epileptogenicity hypotheses.
//!
//! A [`PseParameterSet`] holds named perturbations of hypothesis or
//! model-configuration fields. [`PseService`] clones a base [`SampleState`] per
//! sample, applies the perturbations, runs an external [`AnalysisPipeline`] on a
//! rayon pool and aggregates the outputs column-wise.
//!
//! ## Architecture
//!
//! The numerical model lives outside this crate: it is reached only through the
//! [`AnalysisPipeline`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Run configuration and hypothesis files.
pub mod config;
/// Model-configuration service defaults.
pub mod configuration;
/// Epileptor model constants.
pub mod constants;
/// Column-wise aggregation of sample outputs.
pub mod aggregate;
/// Grid-mode parameter sets.
pub mod grid;
/// Connectivity and disease hypotheses.
pub mod hypothesis;
/// PSE parameter sets and the hypothesis-driven builder.
pub mod params;
/// The analysis pipeline seam.
pub mod pipeline;
/// Per-sample records and run status.
pub mod record;
/// The PSE runner.
pub mod service;
/// Mutable field references.
pub mod target;

pub use aggregate::{AggregatedResult, AggregationPolicy, aggregate, aggregate_strict};
pub use config::{GridConfig, HypothesisSpec, PseRunConfig, read_hypothesis, read_run_config};
pub use configuration::ModelConfigurationService;
pub use grid::{GridAxis, GridMode, GridSpec, grid_parameter_set};
pub use hypothesis::{Connectivity, DiseaseHypothesis, HypothesisBuilder, HypothesisGroup};
pub use params::{
    CouplingSpec, HealthyJitterSpec, PseParameter, PseParameterSet, PseParamsBuilder, PseSamples,
};
pub use pipeline::{AnalysisPipeline, FnPipeline, OutputRecord, OutputValue};
pub use record::{AppliedValue, ExecutionStatus, FailureReason, SampleOutcome, SampleRecord};
pub use service::{CancellationToken, PseService, ServiceSettings};
pub use target::{FieldIndex, HypothesisField, PseTarget, SampleState, ServiceField};
