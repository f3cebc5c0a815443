//! Model inversion through an external fitting backend.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use es_core::{Error, Result};
use es_pse::constants::{X1_DEF, X1_EQ_CR_DEF};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::estimates::{Estimates, FlatEstimates, IndexBase, reassemble};
use crate::factory::ModelInversionParameterFactory;
use crate::model::StatisticalModel;

/// Default equilibrium noise: a third of the distance from rest to the critical equilibrium.
pub fn default_sig_eq() -> f64 {
    (X1_EQ_CR_DEF - X1_DEF) / 3.0
}

/// Fitting algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// MCMC sampling.
    #[default]
    Sampling,
    /// Point optimization (no draws).
    Optimizing,
    /// Variational inference.
    Variational,
}

impl FitMode {
    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sampling => "sampling",
            Self::Optimizing => "optimizing",
            Self::Variational => "variational",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sampling" | "nuts" => Ok(Self::Sampling),
            "optimizing" | "optimize" => Ok(Self::Optimizing),
            "variational" | "vb" | "advi" => Ok(Self::Variational),
            other => Err(Error::Validation(format!("unknown fit mode `{}`", other))),
        }
    }
}

/// Data payload handed to the backend.
pub type ModelData = BTreeMap<String, Value>;

/// External Bayesian fitting engine.
pub trait FittingBackend {
    /// Backend name (for logs).
    fn name(&self) -> &str;

    /// Compile the model. Called once before the first fit.
    fn compile(&mut self) -> Result<()> {
        Ok(())
    }

    /// Fit `data` and return flattened estimates.
    fn fit(&mut self, mode: FitMode, data: &ModelData) -> Result<FlatEstimates>;

    /// Index base of the flattened names.
    fn index_base(&self) -> IndexBase {
        IndexBase::One
    }
}

/// Wall-clock timings of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FitTimings {
    /// Compilation time (zero when already compiled).
    pub compilation_s: f64,
    /// Fitting time.
    pub fitting_s: f64,
}

/// Result of [`ModelInversionService::fit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    /// Mode used.
    pub mode: FitMode,
    /// Reassembled estimates.
    pub estimates: Estimates,
    /// Timings.
    pub timings: FitTimings,
}

/// Drives a [`FittingBackend`] over a statistical model.
#[derive(Debug)]
pub struct ModelInversionService<B> {
    n_regions: usize,
    backend: B,
    mode: FitMode,
    model_data: ModelData,
    compiled: bool,
}

impl<B: FittingBackend> ModelInversionService<B> {
    /// Service for a model over `n_regions` regions.
    pub fn new(n_regions: usize, backend: B) -> Result<Self> {
        if n_regions == 0 {
            return Err(Error::Validation("model inversion needs at least one region".to_string()));
        }
        Ok(Self {
            n_regions,
            backend,
            mode: FitMode::default(),
            model_data: ModelData::new(),
            compiled: false,
        })
    }

    /// Fitting algorithm.
    pub fn with_mode(mut self, mode: FitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of regions.
    pub fn n_regions(&self) -> usize {
        self.n_regions
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current data payload.
    pub fn model_data(&self) -> &ModelData {
        &self.model_data
    }

    /// Add or replace one data entry.
    pub fn insert_data(&mut self, key: impl Into<String>, value: Value) {
        self.model_data.insert(key.into(), value);
    }

    /// Prior factory for this region count.
    pub fn parameter_factory(&self) -> Result<ModelInversionParameterFactory> {
        ModelInversionParameterFactory::new(self.n_regions)
    }

    /// Priors built with default settings.
    pub fn generate_statistical_model(&self, name: &str) -> Result<StatisticalModel> {
        self.parameter_factory()?.generate_statistical_model(name)
    }

    /// Write the priors of `model` into the data payload.
    ///
    /// Each prior `p` contributes `p_lo`, `p_hi`, `p_dist` and `p_<native param>` entries.
    /// Infinite bounds are left out (JSON has no infinity). Native parameters of an
    /// element-wise prior are nested arrays of its shape.
    pub fn set_priors(&mut self, model: &StatisticalModel) -> Result<()> {
        if model.n_regions() != self.n_regions {
            return Err(Error::Validation(format!(
                "model `{}` has {} regions, the service {}",
                model.name(),
                model.n_regions(),
                self.n_regions
            )));
        }
        self.insert_data("n_regions", Value::from(self.n_regions));
        for p in model.parameters() {
            let name = p.name();
            for (suffix, bound) in [("lo", p.low()), ("hi", p.high())] {
                let key = format!("{}_{}", name, suffix);
                if bound.is_finite() {
                    self.insert_data(key, Value::from(bound));
                } else {
                    log::debug!("`{}` is unbounded ({}); left out of the model data", key, bound);
                    self.model_data.remove(&key);
                }
            }
            self.insert_data(format!("{}_dist", name), Value::from(p.kind().name()));
            if p.is_elementwise() {
                let dims = p.shape().dims().to_vec();
                let params: Vec<_> = p.element_distributions().iter().map(|d| d.params()).collect();
                for param in p.distribution().params().into_keys() {
                    let flat = params
                        .iter()
                        .map(|ps| ps.get(param).copied())
                        .collect::<Option<Vec<f64>>>()
                        .ok_or_else(|| {
                            Error::Validation(format!(
                                "prior `{}`: elements lack `{}`",
                                name, param
                            ))
                        })?;
                    self.insert_data(format!("{}_{}", name, param), nested(&flat, &dims));
                }
            } else {
                for (param, v) in p.distribution().params() {
                    self.insert_data(format!("{}_{}", name, param), Value::from(v));
                }
            }
        }
        Ok(())
    }

    /// Compile the backend model; returns the compilation time.
    pub fn compile(&mut self) -> Result<Duration> {
        let start = Instant::now();
        log::info!("compiling model with backend `{}`", self.backend.name());
        self.backend.compile()?;
        self.compiled = true;
        let elapsed = start.elapsed();
        log::info!("{:.3} sec required to compile", elapsed.as_secs_f64());
        Ok(elapsed)
    }

    /// Fit (compiling first if needed) and reassemble the estimates.
    ///
    /// Draws are dropped in optimizing mode.
    pub fn fit(&mut self) -> Result<FitResult> {
        let compilation = if self.compiled { Duration::ZERO } else { self.compile()? };

        log::info!("model fitting with {}...", self.mode);
        let start = Instant::now();
        let mut flat = self.backend.fit(self.mode, &self.model_data)?;
        let fitting = start.elapsed();
        log::info!("{:.3} sec required to fit", fitting.as_secs_f64());

        if self.mode == FitMode::Optimizing {
            flat.draws.clear();
        }
        let estimates = reassemble(&flat, self.backend.index_base())?;
        Ok(FitResult {
            mode: self.mode,
            estimates,
            timings: FitTimings {
                compilation_s: compilation.as_secs_f64(),
                fitting_s: fitting.as_secs_f64(),
            },
        })
    }
}

/// Row-major `values` as nested JSON arrays of `dims`.
fn nested(values: &[f64], dims: &[usize]) -> Value {
    match dims.split_first() {
        None => values.first().copied().map_or(Value::Null, Value::from),
        Some((_, rest)) if rest.is_empty() => Value::from(values.to_vec()),
        Some((&n, rest)) => {
            let stride = values.len() / n.max(1);
            let rows = (0..n).map(|i| nested(&values[i * stride..(i + 1) * stride], rest));
            Value::Array(rows.collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use es_core::Shape;
    use es_prob::StochasticParameter;

    struct Echo {
        compiles: usize,
    }

    impl FittingBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn compile(&mut self) -> Result<()> {
            self.compiles += 1;
            Ok(())
        }

        fn fit(&mut self, _mode: FitMode, data: &ModelData) -> Result<FlatEstimates> {
            let k = data.get("K_shape").and_then(Value::as_f64).unwrap_or(f64::NAN);
            Ok(FlatEstimates {
                names: vec!["K".into(), "x.1".into(), "x.2".into()],
                values: vec![k, 1.0, 2.0],
                draws: vec![vec![k], vec![1.0], vec![2.0]],
            })
        }
    }

    #[test]
    fn test_default_sig_eq() {
        assert_relative_eq!(default_sig_eq(), 1.0 / 9.0, epsilon = 1e-15);
    }

    #[test]
    fn test_fit_compiles_once_and_reassembles() {
        let mut svc = ModelInversionService::new(2, Echo { compiles: 0 }).unwrap();
        let model = svc.generate_statistical_model("vep").unwrap();
        svc.set_priors(&model).unwrap();
        assert_eq!(svc.model_data()["K_dist"], Value::from("gamma"));
        assert_eq!(svc.model_data()["n_regions"], Value::from(2));

        let r = svc.fit().unwrap();
        assert!(r.estimates.get("K").unwrap().scalar().unwrap().is_finite());
        assert_eq!(r.estimates.get("x").unwrap().values, vec![1.0, 2.0]);
        assert!(r.estimates.samples("x").is_some());
        svc.fit().unwrap();
        assert_eq!(svc.backend().compiles, 1);
    }

    #[test]
    fn test_unbounded_priors_omit_bounds() {
        let normal = es_prob::Distribution::normal(0.0, 1.0).unwrap();
        let x =
            StochasticParameter::new("x", f64::NEG_INFINITY, 2.0, Shape::scalar(), normal).unwrap();
        let model = StatisticalModel::new("m", 1, vec![x]).unwrap();
        let mut svc = ModelInversionService::new(1, Echo { compiles: 0 }).unwrap();
        svc.insert_data("x_lo", Value::from(-5.0));
        svc.set_priors(&model).unwrap();
        assert!(!svc.model_data().contains_key("x_lo"));
        assert_eq!(svc.model_data()["x_hi"], Value::from(2.0));
        let json = serde_json::to_string(svc.model_data()).unwrap();
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_elementwise_priors_are_nested() {
        let weights = vec![vec![0.0, 0.8], vec![0.3, 0.0]];
        let model = ModelInversionParameterFactory::new(2)
            .unwrap()
            .with_structural_connectivity(weights)
            .unwrap()
            .generate_statistical_model("vep")
            .unwrap();
        let mut svc = ModelInversionService::new(2, Echo { compiles: 0 }).unwrap();
        svc.set_priors(&model).unwrap();
        let ec = model.parameters()[4].clone();
        for param in ec.distribution().params().into_keys() {
            let rows = svc.model_data()[&format!("EC_{}", param)].as_array().unwrap().clone();
            assert_eq!(rows.len(), 2);
            let expected = ec.element_distribution(2).unwrap().params()[param];
            assert_eq!(rows[1][0], Value::from(expected));
        }
        assert!(svc.model_data()["K_shape"].is_number());
    }

    #[test]
    fn test_optimizing_drops_draws() {
        let mut svc = ModelInversionService::new(1, Echo { compiles: 0 })
            .unwrap()
            .with_mode(FitMode::Optimizing);
        let r = svc.fit().unwrap();
        assert!(r.estimates.draws.is_empty());
        assert_eq!(r.mode, FitMode::Optimizing);
    }

    #[test]
    fn test_fit_mode_parse() {
        assert_eq!("vb".parse::<FitMode>().unwrap(), FitMode::Variational);
        assert!("mcmc2".parse::<FitMode>().is_err());
    }
}
