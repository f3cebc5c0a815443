//! PSE parameter sets: named targets with one value (or one value per index) per sample.

use es_core::{Error, Result, Shape};
use es_prob::{Distribution, SamplingBackend, SamplingService, StochasticParameter, TruncLimits};
use serde::{Deserialize, Serialize};

use crate::configuration::ModelConfigurationService;
use crate::constants::MAX_DISEASE_VALUE;
use crate::hypothesis::{Connectivity, DiseaseHypothesis};
use crate::record::AppliedValue;
use crate::target::{FieldIndex, HypothesisField, PseTarget, SampleState, ServiceField};

/// Sample values of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PseSamples {
    /// `samples[i]`, written to every index of the entry.
    Scalar(Vec<f64>),
    /// `samples[i][j]`, written to index `j`.
    PerIndex(Vec<Vec<f64>>),
}

impl PseSamples {
    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::PerIndex(v) => v.len(),
        }
    }

    fn values_at(&self, i: usize, n_indices: usize) -> Option<Vec<f64>> {
        match self {
            Self::Scalar(v) => v.get(i).map(|x| vec![*x; n_indices]),
            Self::PerIndex(v) => v.get(i).cloned(),
        }
    }
}

/// One PSE entry: where to write, under which name, and what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseParameter {
    /// Display name.
    pub name: String,
    /// Field written.
    #[serde(rename = "path")]
    pub target: PseTarget,
    /// Elements written.
    pub indices: Vec<FieldIndex>,
    /// Values per sample.
    pub samples: PseSamples,
}

impl PseParameter {
    /// Validated entry.
    pub fn new(
        name: impl Into<String>,
        target: PseTarget,
        indices: Vec<FieldIndex>,
        samples: PseSamples,
    ) -> Result<Self> {
        let p = Self { name: name.into(), target, indices, samples };
        p.validate()?;
        Ok(p)
    }

    fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            return Err(Error::Validation(format!("PSE entry `{}` has no indices", self.name)));
        }
        if let PseSamples::PerIndex(rows) = &self.samples
            && let Some(i) = rows.iter().position(|r| r.len() != self.indices.len())
        {
            return Err(Error::Validation(format!(
                "PSE entry `{}`: sample {} has {} values for {} indices",
                self.name,
                i,
                rows[i].len(),
                self.indices.len()
            )));
        }
        Ok(())
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.samples.n_samples()
    }

    /// Values written for sample `i`, one per index.
    pub fn values_at(&self, i: usize) -> Option<Vec<f64>> {
        self.samples.values_at(i, self.indices.len())
    }
}

/// Entries sharing one sample count.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PseParameterSet {
    entries: Vec<PseParameter>,
    n_samples: usize,
}

impl PseParameterSet {
    /// Validated set; every entry must carry the same number of samples.
    pub fn new(entries: Vec<PseParameter>) -> Result<Self> {
        let mut set = Self::default();
        for e in entries {
            set.push(e)?;
        }
        Ok(set)
    }

    /// Append an entry.
    pub fn push(&mut self, entry: PseParameter) -> Result<()> {
        entry.validate()?;
        if entry.n_samples() == 0 {
            return Err(Error::Validation(format!("PSE entry `{}` has no samples", entry.name)));
        }
        if !self.entries.is_empty() && entry.n_samples() != self.n_samples {
            return Err(Error::Validation(format!(
                "PSE entry `{}` has {} samples, the set has {}",
                entry.name,
                entry.n_samples(),
                self.n_samples
            )));
        }
        self.n_samples = entry.n_samples();
        self.entries.push(entry);
        Ok(())
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[PseParameter] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Samples per entry.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Entry names.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Write sample `i` of every entry into `state`.
    pub fn apply(&self, i: usize, state: &mut SampleState) -> Result<Vec<AppliedValue>> {
        let mut applied = Vec::with_capacity(self.entries.len());
        for e in &self.entries {
            let values = e.values_at(i).ok_or_else(|| {
                Error::Validation(format!("sample {} out of range for `{}`", i, e.name))
            })?;
            state.apply(e.target, &e.indices, &values)?;
            applied.push(AppliedValue { name: e.name.clone(), values });
        }
        Ok(applied)
    }
}

/// Global (or afferent) coupling perturbation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CouplingSpec {
    /// Regions whose coupling is perturbed; all regions when absent.
    #[serde(default)]
    pub indices: Option<Vec<usize>>,
}

/// Uniform jitter of a configuration-service field over (by default) the healthy regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthyJitterSpec {
    /// Service field to jitter.
    #[serde(default = "default_jitter_field")]
    pub name: String,
    /// Regions; the hypothesis's healthy regions when absent.
    #[serde(default)]
    pub indices: Option<Vec<usize>>,
    /// Lower end of the uniform.
    #[serde(default)]
    pub loc: f64,
    /// Width of the uniform (default `2 * half_range`).
    #[serde(default)]
    pub scale: Option<f64>,
}

fn default_jitter_field() -> String {
    "x0_values".to_string()
}

impl Default for HealthyJitterSpec {
    fn default() -> Self {
        Self { name: default_jitter_field(), indices: None, loc: 0.0, scale: None }
    }
}

/// Builds randomly sampled entries from a hypothesis.
///
/// - excitability/epileptogenicity values: `uniform(v - h, v + h)` truncated above at
///   [`MAX_DISEASE_VALUE`]
/// - connectivity values: `normal(v, h)` truncated above at [`MAX_DISEASE_VALUE`]
/// - coupling: `normal(K_unscaled[0], 30 h)` truncated below at 0
/// - healthy jitter: `uniform(loc, loc + scale)` truncated below at 0, one entry per region
///
/// Entry `k` draws with seed `seed + k`.
#[derive(Debug, Clone)]
pub struct PseParamsBuilder<'a> {
    hypothesis: &'a DiseaseHypothesis,
    connectivity: &'a Connectivity,
    service: &'a ModelConfigurationService,
    n_samples: usize,
    half_range: f64,
    seed: Option<u64>,
    backend: SamplingBackend,
    global_coupling: Vec<CouplingSpec>,
    healthy_regions: Vec<HealthyJitterSpec>,
}

impl<'a> PseParamsBuilder<'a> {
    /// Builder with `half_range = 0.1`, no coupling or jitter entries.
    pub fn new(
        hypothesis: &'a DiseaseHypothesis,
        connectivity: &'a Connectivity,
        service: &'a ModelConfigurationService,
        n_samples: usize,
    ) -> Self {
        Self {
            hypothesis,
            connectivity,
            service,
            n_samples,
            half_range: 0.1,
            seed: None,
            backend: SamplingBackend::Statistical,
            global_coupling: Vec::new(),
            healthy_regions: Vec::new(),
        }
    }

    /// Perturbation half range `h`.
    pub fn half_range(mut self, half_range: f64) -> Self {
        self.half_range = half_range;
        self
    }

    /// Base seed.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Preferred sampling backend (default: statistical, since every draw is truncated).
    pub fn backend(mut self, backend: SamplingBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Coupling entries.
    pub fn global_coupling(mut self, specs: Vec<CouplingSpec>) -> Self {
        self.global_coupling = specs;
        self
    }

    /// Healthy-region jitter entries.
    pub fn healthy_regions(mut self, specs: Vec<HealthyJitterSpec>) -> Self {
        self.healthy_regions = specs;
        self
    }

    fn sampler(&self, k: usize, limits: TruncLimits) -> SamplingService {
        SamplingService::new(self.n_samples)
            .with_seed_opt(self.seed.map(|s| s.wrapping_add(k as u64)))
            .with_backend(self.backend)
            .with_trunc_limits(limits)
    }

    fn draw(
        &self,
        k: usize,
        name: &str,
        dist: Distribution,
        limits: TruncLimits,
    ) -> Result<Vec<f64>> {
        let (low, high) = dist.support();
        let p = StochasticParameter::new(name, low, high, Shape::scalar(), dist)?;
        self.sampler(k, limits).generate(&p)?.into_values()
    }

    fn label(&self, region: usize) -> String {
        self.connectivity.region_label(region).map_or_else(|| region.to_string(), str::to_string)
    }

    /// Draw all entries.
    pub fn build(&self) -> Result<PseParameterSet> {
        if !(self.half_range.is_finite() && self.half_range > 0.0) {
            return Err(Error::Validation(format!(
                "half_range must be finite and > 0, got {}",
                self.half_range
            )));
        }
        let h = self.hypothesis;
        let n = h.number_of_regions();
        if self.connectivity.number_of_regions() != n || self.service.number_of_regions() != n {
            return Err(Error::Validation(format!(
                "hypothesis ({}), connectivity ({}) and service ({}) disagree on region count",
                n,
                self.connectivity.number_of_regions(),
                self.service.number_of_regions()
            )));
        }
        let hr = self.half_range;
        let mut set = PseParameterSet::default();

        let region_groups = [
            (HypothesisField::X0Values, h.x0_indices(), h.x0_values(), "Excitability"),
            (HypothesisField::EValues, h.e_indices(), h.e_values(), "Epileptogenicity"),
        ];
        for (field, indices, values, what) in region_groups {
            for (ii, (&region, &v)) in indices.iter().zip(values).enumerate() {
                let name = format!("{} {}", self.label(region), what);
                let dist = Distribution::uniform(v - hr, v + hr)?;
                let limits = TruncLimits::high(MAX_DISEASE_VALUE);
                let samples = self.draw(set.len(), &name, dist, limits)?;
                set.push(PseParameter::new(
                    name,
                    PseTarget::Hypothesis(field),
                    vec![FieldIndex::Position(ii)],
                    PseSamples::Scalar(samples),
                )?)?;
            }
        }

        for (ii, (&linear, &v)) in h.w_indices().iter().zip(h.w_values()).enumerate() {
            let (a, b) = h.w_coordinate(linear);
            let name = format!("{}-{} Connectivity", self.label(a), self.label(b));
            let dist = Distribution::normal(v, hr)?;
            let samples = self.draw(set.len(), &name, dist, TruncLimits::high(MAX_DISEASE_VALUE))?;
            set.push(PseParameter::new(
                name,
                PseTarget::Hypothesis(HypothesisField::WValues),
                vec![FieldIndex::Position(ii)],
                PseSamples::Scalar(samples),
            )?)?;
        }

        for spec in &self.global_coupling {
            let k_loc = self.service.k_unscaled.first().copied().ok_or_else(|| {
                Error::Validation("coupling entries need a non-empty K_unscaled".to_string())
            })?;
            let regions = spec.indices.clone().unwrap_or_else(|| (0..n).collect());
            let name = if regions.len() == n && regions.iter().enumerate().all(|(i, &r)| i == r) {
                "Global coupling".to_string()
            } else {
                format!("Afferent coupling{:?}", regions)
            };
            let dist = Distribution::normal(k_loc, 30.0 * hr)?;
            let samples = self.draw(set.len(), &name, dist, TruncLimits::low(0.0))?;
            set.push(PseParameter::new(
                name,
                PseTarget::Service(ServiceField::KUnscaled),
                regions.into_iter().map(|r| FieldIndex::Coordinate(vec![r])).collect(),
                PseSamples::Scalar(samples),
            )?)?;
        }

        for spec in &self.healthy_regions {
            let target = PseTarget::parse(&format!("model_configuration_service.{}", spec.name))?;
            let regions = spec.indices.clone().unwrap_or_else(|| h.healthy_indices());
            if regions.is_empty() {
                log::debug!("healthy-region jitter on `{}` has no regions; skipped", spec.name);
                continue;
            }
            let scale = spec.scale.unwrap_or(2.0 * hr);
            let dist = Distribution::uniform(spec.loc, spec.loc + scale)?;
            let shape = Shape::vector(regions.len())?;
            let p = StochasticParameter::new(&spec.name, spec.loc, spec.loc + scale, shape, dist)?;
            let draws = self.sampler(set.len(), TruncLimits::low(0.0)).generate(&p)?;
            for (j, &region) in regions.iter().enumerate() {
                let samples = draws.output(j).map(<[f64]>::to_vec).unwrap_or_default();
                set.push(PseParameter::new(
                    format!("{} {}", self.label(region), spec.name),
                    target,
                    vec![FieldIndex::Coordinate(vec![region])],
                    PseSamples::Scalar(samples),
                )?)?;
            }
        }

        log::debug!(
            "built {} PSE entries x {} samples for hypothesis `{}`",
            set.len(),
            set.n_samples(),
            h.name()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (DiseaseHypothesis, Connectivity, ModelConfigurationService) {
        let h = DiseaseHypothesis::builder(4)
            .excitability(vec![1], vec![0.95])
            .epileptogenicity(vec![2], vec![0.5])
            .connectivity_pairs(&[(0, 3)], vec![0.8])
            .build()
            .unwrap();
        let labels = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let c = Connectivity::from_rows(&vec![vec![1.0; 4]; 4], labels).unwrap();
        let s = ModelConfigurationService::new(4).unwrap().with_k(3.0);
        (h, c, s)
    }

    #[test]
    fn test_builder_entries_and_truncation() {
        let (h, c, s) = fixture();
        let set = PseParamsBuilder::new(&h, &c, &s, 200)
            .seed(Some(10))
            .global_coupling(vec![CouplingSpec::default()])
            .healthy_regions(vec![HealthyJitterSpec::default()])
            .build()
            .unwrap();
        assert_eq!(
            set.names(),
            vec![
                "b Excitability",
                "c Epileptogenicity",
                "a-d Connectivity",
                "Global coupling",
                "a x0_values",
                "d x0_values",
            ]
        );
        assert_eq!(set.n_samples(), 200);
        let PseSamples::Scalar(x0) = &set.entries()[0].samples else { panic!("scalar") };
        assert!(x0.iter().all(|v| *v >= 0.85 && *v <= MAX_DISEASE_VALUE));
        let PseSamples::Scalar(k) = &set.entries()[3].samples else { panic!("scalar") };
        assert!(k.iter().all(|v| *v >= 0.0));
        assert_eq!(set.entries()[3].indices.len(), 4);
        let PseSamples::Scalar(jitter) = &set.entries()[4].samples else { panic!("scalar") };
        assert!(jitter.iter().all(|v| (0.0..=0.2).contains(v)));
    }

    #[test]
    fn test_builder_reproducible() {
        let (h, c, s) = fixture();
        let a = PseParamsBuilder::new(&h, &c, &s, 20).seed(Some(1)).build().unwrap();
        let b = PseParamsBuilder::new(&h, &c, &s, 20).seed(Some(1)).build().unwrap();
        assert_eq!(a, b);
        assert_ne!(a.entries()[0].samples, a.entries()[1].samples);
    }

    #[test]
    fn test_afferent_coupling_name() {
        let (h, c, s) = fixture();
        let set = PseParamsBuilder::new(&h, &c, &s, 5)
            .global_coupling(vec![CouplingSpec { indices: Some(vec![1, 2]) }])
            .build()
            .unwrap();
        assert_eq!(set.names().last().copied(), Some("Afferent coupling[1, 2]"));
    }

    #[test]
    fn test_empty_coupling_vector() {
        let (h, c, mut s) = fixture();
        s.k_unscaled.clear();
        let without_coupling = PseParamsBuilder::new(&h, &c, &s, 5).build().unwrap();
        assert_eq!(without_coupling.len(), 3);

        let err = PseParamsBuilder::new(&h, &c, &s, 5)
            .global_coupling(vec![CouplingSpec::default()])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(m) if m.contains("K_unscaled")));
    }

    #[test]
    fn test_set_rejects_mismatched_sample_counts() {
        let t = PseTarget::parse("x0_values").unwrap();
        let a =
            PseParameter::new("a", t, vec![FieldIndex::Position(0)], PseSamples::Scalar(vec![0.1]))
                .unwrap();
        let b = PseParameter::new(
            "b",
            t,
            vec![FieldIndex::Position(0)],
            PseSamples::Scalar(vec![0.1, 0.2]),
        )
        .unwrap();
        assert!(PseParameterSet::new(vec![a, b]).is_err());
        assert!(
            PseParameter::new(
                "c",
                t,
                vec![FieldIndex::Position(0)],
                PseSamples::PerIndex(vec![vec![0.1, 0.2]])
            )
            .is_err()
        );
    }

    #[test]
    fn test_apply_per_index() {
        let (h, _, s) = fixture();
        let mut state = SampleState::new(h, s).unwrap();
        let k = PseParameter::new(
            "K",
            PseTarget::Service(ServiceField::KUnscaled),
            vec![FieldIndex::Coordinate(vec![0]), FieldIndex::Coordinate(vec![2])],
            PseSamples::PerIndex(vec![vec![1.0, 2.0], vec![5.0, 6.0]]),
        )
        .unwrap();
        let set = PseParameterSet::new(vec![k]).unwrap();
        let applied = set.apply(1, &mut state).unwrap();
        assert_eq!(applied[0].values, vec![5.0, 6.0]);
        assert_eq!(state.service.k_unscaled, vec![5.0, 3.0, 6.0, 3.0]);
    }
}
