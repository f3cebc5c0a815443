//! Probability building blocks for EpiStat.
//!
//! This crate hosts the stochastic-parameter layer:
//! - base distributions (logpdf/cdf/quantile/moments) behind one closed [`Distribution`] enum
//! - moment matching from `(mean | mode, std)` targets
//! - [`StochasticParameter`] (bounds + shape + distribution)
//! - [`SamplingService`] with seeded, optionally truncated draws

pub mod math;
pub mod moments;

pub mod bernoulli;
pub mod beta;
pub mod binomial;
pub mod chisquare;
pub mod exponential;
pub mod gamma;
pub mod lognormal;
pub mod normal;
pub mod poisson;
pub mod student_t;
pub mod uniform;

pub mod distribution;
pub mod sampling;
pub mod stochastic;

pub use distribution::{Distribution, DistributionKind};
pub use moments::{Location, MomentSummary, MomentTarget, Moments};
pub use sampling::{SampleSet, SampleStats, SamplingBackend, SamplingService, TruncLimits};
pub use stochastic::{ParameterDescription, StochasticParameter};
