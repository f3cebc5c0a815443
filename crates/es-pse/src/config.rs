//! Run configuration and hypothesis files (YAML or JSON, chosen by extension).

use std::path::Path;
use std::time::Duration;

use es_core::{Error, Result};
use es_prob::SamplingBackend;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationPolicy;
use crate::configuration::ModelConfigurationService;
use crate::constants::K_DEF;
use crate::grid::{GridAxis, GridMode, grid_parameter_set};
use crate::hypothesis::{Connectivity, DiseaseHypothesis, HypothesisGroup};
use crate::params::{CouplingSpec, HealthyJitterSpec, PseParameterSet, PseParamsBuilder};
use crate::pipeline::AnalysisPipeline;
use crate::service::{PseService, ServiceSettings};
use crate::target::SampleState;

/// Grid mode block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// How axes combine.
    #[serde(default)]
    pub mode: GridMode,
    /// Axes, in order (the last varies fastest in a cross product).
    pub axes: Vec<GridAxis>,
}

/// Settings of one PSE run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseRunConfig {
    /// Samples per entry (ignored in grid mode).
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,

    /// Perturbation half range around the hypothesis values.
    #[serde(default = "default_half_range")]
    pub half_range: f64,

    /// Base seed; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Worker threads (0 = rayon default).
    #[serde(default)]
    pub workers: usize,

    /// Per-sample time limit in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Grid values instead of random draws.
    #[serde(default)]
    pub grid: Option<GridConfig>,

    /// Treatment of fields missing from some samples.
    #[serde(default)]
    pub aggregation: AggregationPolicy,

    /// Fail instead of padding or dropping mismatched fields.
    #[serde(default)]
    pub strict_aggregation: bool,

    /// Coupling entries.
    #[serde(default)]
    pub global_coupling: Vec<CouplingSpec>,

    /// Healthy-region jitter entries.
    #[serde(default)]
    pub healthy_regions: Vec<HealthyJitterSpec>,

    /// Preferred sampling backend.
    #[serde(default = "default_backend")]
    pub sampling_backend: SamplingBackend,
}

fn default_n_samples() -> usize {
    100
}

fn default_half_range() -> f64 {
    0.1
}

fn default_backend() -> SamplingBackend {
    SamplingBackend::Statistical
}

impl Default for PseRunConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            half_range: default_half_range(),
            seed: None,
            workers: 0,
            timeout_ms: None,
            grid: None,
            aggregation: AggregationPolicy::default(),
            strict_aggregation: false,
            global_coupling: Vec::new(),
            healthy_regions: Vec::new(),
            sampling_backend: default_backend(),
        }
    }
}

impl PseRunConfig {
    /// Per-sample time limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.service_settings().timeout()
    }

    /// Worker, timeout and aggregation settings for [`PseService`].
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            workers: self.workers,
            timeout_ms: self.timeout_ms,
            aggregation: self.aggregation,
            strict_aggregation: self.strict_aggregation,
        }
    }

    /// Apply this configuration's execution settings to `service`.
    pub fn configure<P>(&self, service: PseService<P>) -> PseService<P>
    where
        P: AnalysisPipeline + 'static,
    {
        service.with_settings(self.service_settings())
    }

    /// A configured exploration of `pipeline` around the given base state.
    pub fn service<P>(
        &self,
        name: impl Into<String>,
        hypothesis: DiseaseHypothesis,
        connectivity: Connectivity,
        model_service: ModelConfigurationService,
        pipeline: P,
    ) -> Result<PseService<P>>
    where
        P: AnalysisPipeline + 'static,
    {
        let params = self.build_parameter_set(&hypothesis, &connectivity, &model_service)?;
        let base = SampleState::new(hypothesis, model_service)?;
        Ok(self.configure(PseService::new(name, base, connectivity, params, pipeline)))
    }

    /// Parameter set: grid rows when `grid` is set, random draws otherwise.
    pub fn build_parameter_set(
        &self,
        hypothesis: &DiseaseHypothesis,
        connectivity: &Connectivity,
        service: &ModelConfigurationService,
    ) -> Result<PseParameterSet> {
        if let Some(grid) = &self.grid {
            let base = SampleState::new(hypothesis.clone(), service.clone())?;
            return grid_parameter_set(&grid.axes, grid.mode, &base);
        }
        PseParamsBuilder::new(hypothesis, connectivity, service, self.n_samples)
            .half_range(self.half_range)
            .seed(self.seed)
            .backend(self.sampling_backend)
            .global_coupling(self.global_coupling.clone())
            .healthy_regions(self.healthy_regions.clone())
            .build()
    }
}

fn read_structured<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let value = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    Ok(value)
}

/// Read a [`PseRunConfig`] (`.json` → JSON, anything else → YAML).
pub fn read_run_config(path: &Path) -> Result<PseRunConfig> {
    read_structured(path)
}

/// A hypothesis together with its connectivity, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisSpec {
    /// Hypothesis name (derived from its kind when empty).
    #[serde(default)]
    pub name: String,
    /// Square connectivity weights, row-major.
    pub weights: Vec<Vec<f64>>,
    /// Region labels (indices when empty).
    #[serde(default)]
    pub region_labels: Vec<String>,
    /// Excitability groups.
    #[serde(default)]
    pub excitability: Vec<HypothesisGroup>,
    /// Epileptogenicity groups.
    #[serde(default)]
    pub epileptogenicity: Vec<HypothesisGroup>,
    /// Connectivity groups (row-major linear indices).
    #[serde(default)]
    pub connectivity: Vec<HypothesisGroup>,
    /// Propagation indices.
    #[serde(default)]
    pub propagation_indices: Vec<usize>,
    /// Propagation strengths.
    #[serde(default)]
    pub propagation_strengths: Vec<f64>,
    /// Unscaled global coupling of the model-configuration service.
    #[serde(default = "default_k")]
    pub k_unscaled: f64,
}

fn default_k() -> f64 {
    K_DEF
}

impl HypothesisSpec {
    /// Validated connectivity, hypothesis and configuration service.
    pub fn build(&self) -> Result<(Connectivity, DiseaseHypothesis, ModelConfigurationService)> {
        let connectivity = Connectivity::from_rows(&self.weights, self.region_labels.clone())?;
        let n = connectivity.number_of_regions();
        if !self.k_unscaled.is_finite() {
            return Err(Error::Validation(format!(
                "k_unscaled must be finite, got {}",
                self.k_unscaled
            )));
        }
        let hypothesis = DiseaseHypothesis::builder(n)
            .name(self.name.clone())
            .groups(&self.excitability, &self.epileptogenicity, &self.connectivity)
            .propagation(self.propagation_indices.clone(), self.propagation_strengths.clone())
            .build()?;
        let service = ModelConfigurationService::new(n)?.with_k(self.k_unscaled);
        Ok((connectivity, hypothesis, service))
    }
}

/// Read a [`HypothesisSpec`] (`.json` → JSON, anything else → YAML).
pub fn read_hypothesis(path: &Path) -> Result<HypothesisSpec> {
    read_structured(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PseSamples;
    use crate::pipeline::{FnPipeline, OutputRecord, OutputValue};
    use crate::record::FailureReason;

    fn two_region_spec() -> HypothesisSpec {
        HypothesisSpec {
            name: String::new(),
            weights: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            region_labels: vec![],
            excitability: vec![HypothesisGroup::new(vec![0], vec![0.6])],
            epileptogenicity: vec![],
            connectivity: vec![],
            propagation_indices: vec![],
            propagation_strengths: vec![],
            k_unscaled: K_DEF,
        }
    }

    #[test]
    fn test_yaml_defaults() {
        let cfg: PseRunConfig =
            serde_yaml_ng::from_str("seed: 7\nglobal_coupling:\n  - {}\n").unwrap();
        assert_eq!(cfg.n_samples, 100);
        assert_eq!(cfg.half_range, 0.1);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.sampling_backend, SamplingBackend::Statistical);
        assert_eq!(cfg.global_coupling, vec![CouplingSpec::default()]);
        assert!(cfg.timeout().is_none());
    }

    #[test]
    fn test_grid_config_json() {
        let json = r#"{
            "grid": {
                "mode": "one_at_a_time",
                "axes": [
                    {"name": "x0", "path": "x0_values", "indices": [0],
                     "low": 0.0, "high": 1.0, "n_points": 5}
                ]
            },
            "aggregation": "intersection",
            "timeout_ms": 250
        }"#;
        let cfg: PseRunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.aggregation, AggregationPolicy::Intersection);
        assert_eq!(cfg.timeout(), Some(Duration::from_millis(250)));

        let (c, h, s) = two_region_spec().build().unwrap();
        let set = cfg.build_parameter_set(&h, &c, &s).unwrap();
        assert_eq!(set.n_samples(), 5);
        assert_eq!(
            set.entries()[0].samples,
            PseSamples::PerIndex(vec![vec![0.0], vec![0.25], vec![0.5], vec![0.75], vec![1.0]])
        );
    }

    #[test]
    fn test_configured_timeout_fires() {
        let yaml = "\
timeout_ms: 40
workers: 2
aggregation: intersection
grid:
  axes:
    - {name: x0, path: x0_values, indices: [0], low: 0.0, high: 1.0, n_points: 3}
";
        let cfg: PseRunConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let (c, h, s) = two_region_spec().build().unwrap();
        let pipeline = FnPipeline::new(
            |state: &SampleState, _c: &Connectivity| Ok(state.hypothesis.x0_values()[0]),
            |x0: f64| {
                if x0 > 0.9 {
                    std::thread::sleep(Duration::from_millis(400));
                }
                Ok(OutputRecord::from([("x0".to_string(), OutputValue::from(x0))]))
            },
        );
        let svc = cfg.service("grid", h, c, s, pipeline).unwrap();
        assert_eq!(
            svc.settings(),
            ServiceSettings {
                workers: 2,
                timeout_ms: Some(40),
                aggregation: AggregationPolicy::Intersection,
                strict_aggregation: false,
            }
        );

        let (agg, status) = svc.run().unwrap();
        assert_eq!(status.n_success, 2);
        assert_eq!(status.failures, vec![(2, FailureReason::Timeout { limit_ms: 40 })]);
        assert_eq!(agg.scalars("x0").unwrap(), vec![0.0, 0.5]);
    }

    #[test]
    fn test_hypothesis_spec_yaml() {
        let yaml = "\
weights: [[0, 1, 1], [1, 0, 1], [1, 1, 0]]
region_labels: [a, b, c]
excitability:
  - {indices: [0, 2], values: [0.9]}
connectivity:
  - {indices: [1], values: [0.5]}
k_unscaled: 3.0
";
        let spec: HypothesisSpec = serde_yaml_ng::from_str(yaml).unwrap();
        let (c, h, s) = spec.build().unwrap();
        assert_eq!(c.number_of_regions(), 3);
        assert_eq!(h.x0_values(), &[0.9, 0.9]);
        assert_eq!(h.name(), "Excitability_Connectivity_Hypothesis");
        assert_eq!(s.k_unscaled, vec![3.0; 3]);
    }

    #[test]
    fn test_read_missing_file_is_io() {
        let err = read_run_config(Path::new("/nonexistent/run.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
