//! Model-configuration service state (the coupling/excitability defaults a
//! hypothesis is configured against).

use es_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{E_DEF, K_DEF, X0_DEF};

/// Per-region defaults consumed by the external `configure` step.
///
/// `k_unscaled` is the global coupling before division by the number of regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfigurationService {
    n_regions: usize,
    /// Unscaled coupling per region.
    pub k_unscaled: Vec<f64>,
    /// Baseline excitability per region.
    pub x0_values: Vec<f64>,
    /// Baseline epileptogenicity per region.
    pub e_values: Vec<f64>,
}

impl ModelConfigurationService {
    /// Defaults (`K_DEF`, `X0_DEF`, `E_DEF`) for every region.
    pub fn new(n_regions: usize) -> Result<Self> {
        if n_regions == 0 {
            return Err(Error::Validation("model configuration needs at least one region".into()));
        }
        Ok(Self {
            n_regions,
            k_unscaled: vec![K_DEF; n_regions],
            x0_values: vec![X0_DEF; n_regions],
            e_values: vec![E_DEF; n_regions],
        })
    }

    /// Same global coupling for every region.
    pub fn with_k(mut self, k: f64) -> Self {
        self.k_unscaled = vec![k; self.n_regions];
        self
    }

    /// Same baseline excitability for every region.
    pub fn with_x0(mut self, x0: f64) -> Self {
        self.x0_values = vec![x0; self.n_regions];
        self
    }

    /// Number of regions.
    pub fn number_of_regions(&self) -> usize {
        self.n_regions
    }

    /// Coupling divided by the number of regions.
    pub fn k_scaled(&self) -> Vec<f64> {
        let n = self.n_regions as f64;
        self.k_unscaled.iter().map(|k| k / n).collect()
    }
}
