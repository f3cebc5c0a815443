//! # es-inversion
//!
//! Bayesian model inversion for EpiStat.
//!
//! This crate provides:
//! - prior construction ([`ModelInversionParameterFactory`]) over the
//!   stochastic-parameter layer of `es-prob`
//! - [`StatisticalModel`], a named prior set implementing `ParameterSpace`
//! - reassembly of flattened backend estimates (`p.i.j`) into arrays
//! - [`ModelInversionService`], which drives an external [`FittingBackend`]

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Flattened-estimate reassembly.
pub mod estimates;
/// Prior factory.
pub mod factory;
/// Statistical model.
pub mod model;
/// Fitting service and backend boundary.
pub mod service;

pub use estimates::{Estimate, Estimates, FlatEstimates, IndexBase, reassemble};
pub use factory::{
    ModelInversionParameterFactory, PRIOR_NAMES, PriorOverride, PriorSettings, read_prior_overrides,
    read_structural_connectivity,
};
pub use model::StatisticalModel;
pub use service::{
    FitMode, FitResult, FitTimings, FittingBackend, ModelData, ModelInversionService,
    default_sig_eq,
};
