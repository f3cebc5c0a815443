//! Prior construction for the Bayesian inversion of the epileptor model.
//!
//! Every prior is a [`StochasticParameter`] solved from a `(mode, std)` target.
//! Defaults follow the epileptor constants; each field is individually
//! overridable and a pre-built parameter replaces its default entirely.
//!
//! With a structural connectivity matrix, `EC` becomes element-wise: the mode of
//! element `(i, j)` is the connection weight (floored at the `EC` lower bound) and
//! its std defaults to that mode.

use std::collections::BTreeMap;
use std::path::Path;

use es_core::{Error, Result, Shape};
use es_prob::{DistributionKind, MomentTarget, StochasticParameter};
use es_pse::constants::{K_DEF, X1_DEF, X1_EQ_CR_DEF};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::StatisticalModel;

/// Prior names, in model order.
pub const PRIOR_NAMES: [&str; 7] = ["x1eq", "K", "tau1", "tau0", "EC", "sig_eq", "eps"];

/// Caller overrides of one prior's defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriorOverride {
    /// Distribution name (any registry alias).
    #[serde(default)]
    pub distribution: Option<String>,
    /// Mode of the prior.
    #[serde(default)]
    pub mode: Option<f64>,
    /// Standard deviation of the prior.
    #[serde(default)]
    pub std: Option<f64>,
    /// Lower bound.
    #[serde(default)]
    pub low: Option<f64>,
    /// Upper bound.
    #[serde(default)]
    pub high: Option<f64>,
}

/// Resolved settings of one prior, before moment matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorSettings {
    /// Prior name.
    pub name: String,
    /// Distribution name.
    pub distribution: String,
    /// Mode target.
    pub mode: f64,
    /// Std target.
    pub std: f64,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
    /// Parameter shape.
    pub shape: Shape,
}

/// Builds the prior set of a [`StatisticalModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInversionParameterFactory {
    n_regions: usize,
    overrides: BTreeMap<String, PriorOverride>,
    prebuilt: BTreeMap<String, StochasticParameter>,
    /// Row-major `n_regions × n_regions` weights.
    connectivity: Option<Vec<f64>>,
}

fn check_prior_name(name: &str) -> Result<()> {
    if PRIOR_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "unknown prior `{}` (expected one of {})",
            name,
            PRIOR_NAMES.join(", ")
        )))
    }
}

impl ModelInversionParameterFactory {
    /// Factory for a model over `n_regions` regions.
    pub fn new(n_regions: usize) -> Result<Self> {
        if n_regions == 0 {
            return Err(Error::Validation("model inversion needs at least one region".to_string()));
        }
        Ok(Self {
            n_regions,
            overrides: BTreeMap::new(),
            prebuilt: BTreeMap::new(),
            connectivity: None,
        })
    }

    /// Number of regions.
    pub fn n_regions(&self) -> usize {
        self.n_regions
    }

    /// Override some defaults of one prior.
    pub fn with_override(mut self, name: &str, overrides: PriorOverride) -> Result<Self> {
        check_prior_name(name)?;
        self.overrides.insert(name.to_string(), overrides);
        Ok(self)
    }

    /// Override several priors at once.
    pub fn with_overrides(self, overrides: BTreeMap<String, PriorOverride>) -> Result<Self> {
        overrides.into_iter().try_fold(self, |f, (name, o)| f.with_override(&name, o))
    }

    /// Use `parameter` as-is for the prior of the same name.
    pub fn with_parameter(mut self, parameter: StochasticParameter) -> Result<Self> {
        check_prior_name(parameter.name())?;
        self.prebuilt.insert(parameter.name().to_string(), parameter);
        Ok(self)
    }

    /// Structural connectivity weights (`n_regions` rows of `n_regions` entries) that
    /// set the element-wise `EC` modes.
    pub fn with_structural_connectivity(mut self, weights: Vec<Vec<f64>>) -> Result<Self> {
        let n = self.n_regions;
        if weights.len() != n || weights.iter().any(|row| row.len() != n) {
            return Err(Error::Validation(format!(
                "structural connectivity must be {0} x {0}, got {1} rows of lengths {2:?}",
                n,
                weights.len(),
                weights.iter().map(Vec::len).collect::<Vec<_>>()
            )));
        }
        let flat: Vec<f64> = weights.into_iter().flatten().collect();
        if let Some(w) = flat.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(Error::Validation(format!(
                "structural connectivity weights must be finite and non-negative, got {}",
                w
            )));
        }
        self.connectivity = Some(flat);
        Ok(self)
    }

    /// Row-major structural connectivity, if set.
    pub fn structural_connectivity(&self) -> Option<&[f64]> {
        self.connectivity.as_deref()
    }

    /// Defaults of `name` merged with its overrides.
    ///
    /// Except for `x1eq` and `K`, the std defaults to the (possibly overridden) mode;
    /// `sig_eq` bounds default to `[mode / 10, 3 * mode]`.
    pub fn settings(&self, name: &str) -> Result<PriorSettings> {
        check_prior_name(name)?;
        let n = self.n_regions;
        let o = self.overrides.get(name).cloned().unwrap_or_default();

        let (distribution, mode, shape) = match name {
            "x1eq" => ("normal", (X1_EQ_CR_DEF - X1_DEF) / 2.0, Shape::vector(n)?),
            "K" => ("gamma", K_DEF, Shape::scalar()),
            "tau1" => ("gamma", 0.5, Shape::scalar()),
            "tau0" => ("gamma", 30.0, Shape::scalar()),
            "EC" => ("gamma", 1e-3, Shape::square(n)?),
            "sig_eq" => ("gamma", 0.1, Shape::scalar()),
            _ => ("gamma", 0.1, Shape::scalar()),
        };
        let mode = o.mode.unwrap_or(mode);
        let std = o.std.unwrap_or(match name {
            "x1eq" => 0.1,
            "K" => K_DEF,
            _ => mode,
        });
        let (low, high) = match name {
            "x1eq" => (X1_DEF, X1_EQ_CR_DEF),
            "K" => (0.01, 2.0),
            "tau1" => (0.1, 0.9),
            "tau0" => (3.0, 30000.0),
            "EC" => (1e-6, 100.0),
            "sig_eq" => (mode / 10.0, 3.0 * mode),
            _ => (0.0, 1.0),
        };

        Ok(PriorSettings {
            name: name.to_string(),
            distribution: o.distribution.unwrap_or_else(|| distribution.to_string()),
            mode,
            std,
            low: o.low.unwrap_or(low),
            high: o.high.unwrap_or(high),
            shape,
        })
    }

    /// The prior `name`: the pre-built parameter if any, else moment-matched settings.
    pub fn parameter(&self, name: &str) -> Result<StochasticParameter> {
        check_prior_name(name)?;
        if let Some(p) = self.prebuilt.get(name) {
            return Ok(p.clone());
        }
        let s = self.settings(name)?;
        let kind = DistributionKind::from_name(&s.distribution)?;
        if name == "EC"
            && let Some(weights) = &self.connectivity
        {
            let std = self.overrides.get(name).and_then(|o| o.std);
            let targets: Vec<MomentTarget> = weights
                .iter()
                .map(|&w| {
                    let mode = w.max(s.low);
                    MomentTarget::mode_std(mode, std.unwrap_or(mode))
                })
                .collect();
            log::debug!("EC prior: element-wise modes from {} connectivity weights", targets.len());
            return StochasticParameter::from_targets(
                s.name, s.low, s.high, s.shape, kind, &targets,
            );
        }
        StochasticParameter::from_target(
            s.name,
            s.low,
            s.high,
            s.shape,
            kind,
            &MomentTarget::mode_std(s.mode, s.std),
        )
    }

    /// All priors in [`PRIOR_NAMES`] order.
    pub fn generate_parameters(&self) -> Result<Vec<StochasticParameter>> {
        PRIOR_NAMES.iter().map(|name| self.parameter(name)).collect()
    }

    /// Priors wrapped in a named model.
    pub fn generate_statistical_model(&self, name: &str) -> Result<StatisticalModel> {
        let parameters = self.generate_parameters()?;
        log::debug!(
            "statistical model `{}`: {} priors over {} regions",
            name,
            parameters.len(),
            self.n_regions
        );
        StatisticalModel::new(name, self.n_regions, parameters)
    }
}

/// `.json` → JSON, anything else → YAML.
fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let value = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    Ok(value)
}

/// Read prior overrides keyed by prior name (`.json` → JSON, anything else → YAML).
pub fn read_prior_overrides(path: &Path) -> Result<BTreeMap<String, PriorOverride>> {
    read_structured(path)
}

/// Read a structural connectivity matrix: a list of rows.
pub fn read_structural_connectivity(path: &Path) -> Result<Vec<Vec<f64>>> {
    read_structured(path)
}
