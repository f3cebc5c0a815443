//! Epileptor defaults shared by hypotheses, the configuration service and the priors.

/// Resting equilibrium of the fast variable `x1`.
pub const X1_DEF: f64 = -5.0 / 3.0;

/// Critical equilibrium of `x1` (onset of seizure-like behaviour).
pub const X1_EQ_CR_DEF: f64 = -4.0 / 3.0;

/// Default (healthy) excitability.
pub const X0_DEF: f64 = 0.0;

/// Critical excitability.
pub const X0_CR_DEF: f64 = 1.0;

/// Default (healthy) epileptogenicity.
pub const E_DEF: f64 = 0.0;

/// Default global coupling.
pub const K_DEF: f64 = 1.0;

/// Upper limit for perturbed disease values.
pub const MAX_DISEASE_VALUE: f64 = 1.0 - 1e-3;
