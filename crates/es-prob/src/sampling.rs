//! Seeded (optionally truncated) sampling of stochastic parameters.
//!
//! Two backends draw variates:
//! - [`SamplingBackend::Native`]: `rand_distr` variate generators, every variant,
//!   no truncation.
//! - [`SamplingBackend::Statistical`]: inverse-CDF sampling through `statrs`, continuous
//!   variants only, analytic truncation (`u ~ U(F(low), F(high))`, `x = F⁻¹(u)`).
//!
//! A request the selected backend cannot realise falls back to the other one (logged)
//! unless the service is `strict`. Truncated draws are therefore always analytic, and
//! output `j` of a call is always seeded with `seed + j`.

use std::fmt;
use std::str::FromStr;

use es_core::{Error, Result, Shape};
use rand::distr::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::distribution::{Distribution, DistributionKind};
use crate::stochastic::StochasticParameter;

/// Variate-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingBackend {
    /// `rand_distr` generators.
    #[default]
    Native,
    /// `statrs` inverse CDF.
    Statistical,
}

impl SamplingBackend {
    /// Backend name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Statistical => "statistical",
        }
    }

    /// The other backend.
    pub fn alternate(self) -> Self {
        match self {
            Self::Native => Self::Statistical,
            Self::Statistical => Self::Native,
        }
    }

    /// Why this backend cannot realise `kind` (with or without truncation), if it cannot.
    pub fn limitation(self, kind: DistributionKind, truncated: bool) -> Option<&'static str> {
        match self {
            Self::Native if truncated => Some("native variate generators cannot truncate"),
            Self::Statistical if kind.is_discrete() => {
                Some("inverse-CDF sampling covers continuous variants only")
            }
            _ => None,
        }
    }
}

impl fmt::Display for SamplingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SamplingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "rand" => Ok(Self::Native),
            "statistical" | "statrs" => Ok(Self::Statistical),
            other => Err(Error::Validation(format!("unknown sampling backend `{}`", other))),
        }
    }
}

/// Optional truncation limits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TruncLimits {
    /// Lower truncation limit.
    #[serde(default)]
    pub low: Option<f64>,
    /// Upper truncation limit.
    #[serde(default)]
    pub high: Option<f64>,
}

impl TruncLimits {
    /// No truncation.
    pub fn none() -> Self {
        Self::default()
    }

    /// Both limits.
    pub fn new(low: f64, high: f64) -> Self {
        Self { low: Some(low), high: Some(high) }
    }

    /// Lower limit only.
    pub fn low(low: f64) -> Self {
        Self { low: Some(low), high: None }
    }

    /// Upper limit only.
    pub fn high(high: f64) -> Self {
        Self { low: None, high: Some(high) }
    }

    /// Whether no limit is set.
    pub fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    /// Effective interval: limits intersected with `[low, high]`.
    fn interval(&self, low: f64, high: f64) -> Result<(f64, f64)> {
        let lo = self.low.map_or(low, |l| l.max(low));
        let hi = self.high.map_or(high, |h| h.min(high));
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(Error::Validation(format!(
                "empty truncation interval [{}, {}] (limits {:?}/{:?}, bounds [{}, {}])",
                lo, hi, self.low, self.high, low, high
            )));
        }
        Ok((lo, hi))
    }
}

/// Summary statistics of one output sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    /// Sample mean.
    pub mean: f64,
    /// Sample median.
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// Maximum.
    pub max: f64,
}

impl SampleStats {
    /// Statistics of a non-empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median =
            if sorted.len() % 2 == 0 { 0.5 * (sorted[mid - 1] + sorted[mid]) } else { sorted[mid] };
        Some(Self { mean, median, std: var.sqrt(), min: sorted[0], max: sorted[sorted.len() - 1] })
    }
}

/// Draws of one sampling call.
///
/// `outputs[j]` is the sequence of `n_samples` draws for flattened index `j` of the
/// parameter's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    /// Backend that produced the draws.
    pub backend: SamplingBackend,
    /// Shape of one sample.
    pub shape: Shape,
    /// Draws per output.
    pub n_samples: usize,
    /// Effective truncation interval, if any.
    pub truncation: Option<(f64, f64)>,
    /// One sequence per flattened index.
    pub outputs: Vec<Vec<f64>>,
}

impl SampleSet {
    /// Number of outputs (`shape.size()`).
    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Draws for flattened index `j`.
    pub fn output(&self, j: usize) -> Option<&[f64]> {
        self.outputs.get(j).map(Vec::as_slice)
    }

    /// Draws for a coordinate of the shape.
    pub fn output_at(&self, coord: &[usize]) -> Result<&[f64]> {
        let j = self.shape.ravel(coord)?;
        Ok(&self.outputs[j])
    }

    /// The single sequence of a one-output call.
    pub fn into_values(self) -> Result<Vec<f64>> {
        if self.outputs.len() != 1 {
            return Err(Error::Validation(format!(
                "sample set has {} outputs, expected exactly one",
                self.outputs.len()
            )));
        }
        Ok(self.outputs.into_iter().next().unwrap_or_default())
    }

    /// Sample `i` as a flattened (row-major) tensor.
    pub fn sample(&self, i: usize) -> Option<Vec<f64>> {
        if i >= self.n_samples {
            return None;
        }
        Some(self.outputs.iter().map(|o| o[i]).collect())
    }

    /// All draws, sample-major: `n_samples × shape.size()` values.
    pub fn flatten(&self) -> Vec<f64> {
        (0..self.n_samples).flat_map(|i| self.outputs.iter().map(move |o| o[i])).collect()
    }

    /// Per-output statistics.
    pub fn stats(&self) -> Vec<SampleStats> {
        self.outputs.iter().filter_map(|o| SampleStats::from_values(o)).collect()
    }
}

/// Native variate generator for one distribution.
enum NativeSampler {
    Uniform(rand_distr::Uniform<f64>),
    Normal(rand_distr::Normal<f64>),
    LogNormal(rand_distr::LogNormal<f64>),
    Gamma(rand_distr::Gamma<f64>),
    Exponential(rand_distr::Exp<f64>),
    Beta(rand_distr::Beta<f64>),
    StudentT { t: rand_distr::StudentT<f64>, mu: f64, sigma: f64 },
    ChiSquare(rand_distr::ChiSquared<f64>),
    Poisson(rand_distr::Poisson<f64>),
    Bernoulli(rand_distr::Bernoulli),
    Binomial(rand_distr::Binomial),
}

fn rand_err(dist: &Distribution, e: impl fmt::Display) -> Error {
    Error::Computation(format!("cannot build native sampler for {}: {}", dist, e))
}

impl NativeSampler {
    fn new(dist: &Distribution) -> Result<Self> {
        let err = |e: &dyn fmt::Display| rand_err(dist, e);
        Ok(match *dist {
            Distribution::Uniform { a, b } => {
                Self::Uniform(rand_distr::Uniform::new_inclusive(a, b).map_err(|e| err(&e))?)
            }
            Distribution::Normal { mu, sigma } => {
                Self::Normal(rand_distr::Normal::new(mu, sigma).map_err(|e| err(&e))?)
            }
            Distribution::LogNormal { mu, sigma } => {
                Self::LogNormal(rand_distr::LogNormal::new(mu, sigma).map_err(|e| err(&e))?)
            }
            Distribution::Gamma { shape, rate } => {
                Self::Gamma(rand_distr::Gamma::new(shape, 1.0 / rate).map_err(|e| err(&e))?)
            }
            Distribution::Exponential { rate } => {
                Self::Exponential(rand_distr::Exp::new(rate).map_err(|e| err(&e))?)
            }
            Distribution::Beta { alpha, beta } => {
                Self::Beta(rand_distr::Beta::new(alpha, beta).map_err(|e| err(&e))?)
            }
            Distribution::StudentT { df, mu, sigma } => Self::StudentT {
                t: rand_distr::StudentT::new(df).map_err(|e| err(&e))?,
                mu,
                sigma,
            },
            Distribution::ChiSquare { k } => {
                Self::ChiSquare(rand_distr::ChiSquared::new(k).map_err(|e| err(&e))?)
            }
            Distribution::Poisson { lambda } => {
                Self::Poisson(rand_distr::Poisson::new(lambda).map_err(|e| err(&e))?)
            }
            Distribution::Bernoulli { p } => {
                Self::Bernoulli(rand_distr::Bernoulli::new(p).map_err(|e| err(&e))?)
            }
            Distribution::Binomial { n, p } => {
                Self::Binomial(rand_distr::Binomial::new(n, p).map_err(|e| err(&e))?)
            }
        })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        use rand_distr::Distribution as _;
        match self {
            Self::Uniform(d) => d.sample(rng),
            Self::Normal(d) => d.sample(rng),
            Self::LogNormal(d) => d.sample(rng),
            Self::Gamma(d) => d.sample(rng),
            Self::Exponential(d) => d.sample(rng),
            Self::Beta(d) => d.sample(rng),
            Self::StudentT { t, mu, sigma } => mu + sigma * t.sample(rng),
            Self::ChiSquare(d) => d.sample(rng),
            Self::Poisson(d) => d.sample(rng),
            Self::Bernoulli(d) => {
                if d.sample(rng) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Binomial(d) => d.sample(rng) as f64,
        }
    }
}

/// Seeded sampler for stochastic parameters.
///
/// ```
/// use es_core::Shape;
/// use es_prob::{Distribution, SamplingService, StochasticParameter, TruncLimits};
///
/// let dist = Distribution::normal(0.0, 1.0).unwrap();
/// let p = StochasticParameter::new("x", f64::NEG_INFINITY, f64::INFINITY, Shape::scalar(), dist)
///     .unwrap();
/// let set = SamplingService::new(100)
///     .with_seed(42)
///     .with_trunc_limits(TruncLimits::new(-1.0, 1.0))
///     .generate(&p)
///     .unwrap();
/// assert!(set.outputs[0].iter().all(|v| (-1.0..=1.0).contains(v)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingService {
    n_samples: usize,
    seed: Option<u64>,
    backend: SamplingBackend,
    trunc_limits: TruncLimits,
    strict: bool,
}

impl SamplingService {
    /// Service drawing `n_samples` per output with the native backend and no truncation.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            seed: None,
            backend: SamplingBackend::default(),
            trunc_limits: TruncLimits::none(),
            strict: false,
        }
    }

    /// Fix the random stream.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Optional seed.
    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Preferred backend.
    pub fn with_backend(mut self, backend: SamplingBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Truncation limits.
    pub fn with_trunc_limits(mut self, limits: TruncLimits) -> Self {
        self.trunc_limits = limits;
        self
    }

    /// Fail instead of falling back to the alternate backend.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Draws per output.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Seed, if fixed.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Preferred backend.
    pub fn backend(&self) -> SamplingBackend {
        self.backend
    }

    /// Truncation limits.
    pub fn trunc_limits(&self) -> TruncLimits {
        self.trunc_limits
    }

    /// Draw `n_samples` values for every flattened index of the parameter's shape.
    ///
    /// Truncation limits are intersected with the parameter bounds.
    pub fn generate(&self, parameter: &StochasticParameter) -> Result<SampleSet> {
        self.draw(parameter.element_distributions(), parameter.shape(), parameter.bounds())
    }

    /// Draw from a bare distribution (bounds = its support).
    pub fn generate_from_distribution(
        &self,
        distribution: &Distribution,
        shape: &Shape,
    ) -> Result<SampleSet> {
        self.draw(std::slice::from_ref(distribution), shape, distribution.support())
    }

    /// Resolve the backend that will realise the request.
    pub fn resolve_backend(
        &self,
        kind: DistributionKind,
        truncated: bool,
    ) -> Result<SamplingBackend> {
        let Some(reason) = self.backend.limitation(kind, truncated) else {
            return Ok(self.backend);
        };
        let alternate = self.backend.alternate();
        if self.strict {
            return Err(Error::SamplingBackendUnavailable {
                backend: self.backend.name(),
                variant: kind.name().to_string(),
                reason: format!("{} (strict mode, no fallback)", reason),
            });
        }
        match alternate.limitation(kind, truncated) {
            None => {
                log::warn!(
                    "sampling backend `{}` cannot realise {} ({}); falling back to `{}`",
                    self.backend,
                    kind,
                    reason,
                    alternate
                );
                Ok(alternate)
            }
            Some(alt_reason) => Err(Error::SamplingBackendUnavailable {
                backend: self.backend.name(),
                variant: kind.name().to_string(),
                reason: format!("{}; {} backend: {}", reason, alternate, alt_reason),
            }),
        }
    }

    /// `dists` holds one shared distribution or one per flattened output.
    fn draw(&self, dists: &[Distribution], shape: &Shape, bounds: (f64, f64)) -> Result<SampleSet> {
        if self.n_samples == 0 {
            return Err(Error::Validation("n_samples must be positive".to_string()));
        }
        let n_outputs = shape.size();
        let first = match dists {
            [first] => first,
            [first, ..] if dists.len() == n_outputs => first,
            _ => {
                return Err(Error::Validation(format!(
                    "{} distributions for shape {}",
                    dists.len(),
                    shape
                )));
            }
        };
        let truncated = !self.trunc_limits.is_empty();
        let backend = self.resolve_backend(first.kind(), truncated)?;
        let truncation =
            if truncated { Some(self.trunc_limits.interval(bounds.0, bounds.1)?) } else { None };

        log::debug!(
            "sampling {} x {} from {}{} via {} (truncation {:?}, seed {:?})",
            n_outputs,
            self.n_samples,
            first,
            if dists.len() > 1 { " (element-wise)" } else { "" },
            backend,
            truncation,
            self.seed
        );

        let mut outputs = Vec::with_capacity(n_outputs);
        for j in 0..n_outputs {
            let dist = if dists.len() == 1 { first } else { &dists[j] };
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(j as u64)),
                None => StdRng::from_os_rng(),
            };
            let values = match backend {
                SamplingBackend::Native => {
                    let sampler = NativeSampler::new(dist)?;
                    (0..self.n_samples).map(|_| sampler.draw(&mut rng)).collect()
                }
                SamplingBackend::Statistical => {
                    inverse_cdf_draws(dist, truncation, self.n_samples, &mut rng)?
                }
            };
            outputs.push(values);
        }

        Ok(SampleSet {
            backend,
            shape: shape.clone(),
            n_samples: self.n_samples,
            truncation,
            outputs,
        })
    }
}

/// Inverse-CDF draws, truncated analytically to `[lo, hi]` when given.
fn inverse_cdf_draws(
    dist: &Distribution,
    truncation: Option<(f64, f64)>,
    n: usize,
    rng: &mut StdRng,
) -> Result<Vec<f64>> {
    if let Some((lo, hi)) = truncation
        && lo == hi
    {
        return Ok(vec![lo; n]);
    }
    let (lo, hi) = truncation.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
    // Above the median the CDF saturates at 1, so draw in survival space instead.
    let upper_tail = truncation.is_some() && dist.cdf(lo)? > 0.5;
    let (u_lo, u_hi) = match truncation {
        None => (0.0, 1.0),
        Some(_) if upper_tail => (dist.sf(hi)?, dist.sf(lo)?),
        Some(_) => (dist.cdf(lo)?, dist.cdf(hi)?),
    };
    if u_hi <= u_lo {
        return Err(Error::Computation(format!(
            "truncation interval {:?} carries no probability mass under {}",
            truncation, dist
        )));
    }

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let r: f64 = rng.sample(Open01);
        let u = u_lo + r * (u_hi - u_lo);
        let x = if upper_tail { dist.inverse_sf(u)? } else { dist.quantile(u)? };
        if !x.is_finite() {
            return Err(Error::Computation(format!(
                "non-finite draw at level {} from {} truncated to {:?}",
                u, dist, truncation
            )));
        }
        out.push(x.clamp(lo, hi));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    use crate::moments::MomentTarget;

    fn param(dist: Distribution, shape: Shape) -> StochasticParameter {
        StochasticParameter::new("p", f64::NEG_INFINITY, f64::INFINITY, shape, dist).unwrap()
    }

    fn continuous() -> Vec<Distribution> {
        vec![
            Distribution::uniform(-2.0, 3.0).unwrap(),
            Distribution::normal(0.5, 2.0).unwrap(),
            Distribution::lognormal(0.0, 1.0).unwrap(),
            Distribution::gamma(2.0, 1.5).unwrap(),
            Distribution::exponential(0.7).unwrap(),
            Distribution::beta(2.0, 3.0).unwrap(),
            Distribution::student_t(4.0, 0.0, 1.5).unwrap(),
            Distribution::chisquare(3.0).unwrap(),
        ]
    }

    #[test]
    fn test_same_seed_same_draws() {
        for backend in [SamplingBackend::Native, SamplingBackend::Statistical] {
            let svc = SamplingService::new(50).with_seed(42).with_backend(backend);
            let p = param(Distribution::gamma(3.0, 2.0).unwrap(), Shape::vector(3).unwrap());
            let a = svc.generate(&p).unwrap();
            let b = svc.generate(&p).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.n_outputs(), 3);
            assert_ne!(a.outputs[0], a.outputs[1]);
        }
    }

    #[test]
    fn test_truncation_respected_for_every_continuous_variant() {
        for dist in continuous() {
            let p = param(dist, Shape::scalar());
            let mean = dist.median().unwrap();
            let (lo, hi) = (mean - 0.3, mean + 0.4);
            let set = SamplingService::new(500)
                .with_seed(7)
                .with_trunc_limits(TruncLimits::new(lo, hi))
                .generate(&p)
                .unwrap();
            assert_eq!(set.backend, SamplingBackend::Statistical);
            let (elo, ehi) = set.truncation.unwrap();
            assert!(set.outputs[0].iter().all(|v| *v >= elo && *v <= ehi), "{}", dist);
            assert!(elo >= lo && ehi <= hi);
        }
    }

    #[test]
    fn test_upper_tail_truncation_mirrors_lower_tail() {
        let p = param(Distribution::normal(0.0, 1.0).unwrap(), Shape::scalar());
        for cut in [8.0, 9.0, 12.0] {
            let upper = SamplingService::new(200)
                .with_seed(1)
                .with_trunc_limits(TruncLimits::low(cut))
                .generate(&p)
                .unwrap();
            let lower = SamplingService::new(200)
                .with_seed(1)
                .with_trunc_limits(TruncLimits::high(-cut))
                .generate(&p)
                .unwrap();
            let up = &upper.outputs[0];
            assert!(up.iter().all(|v| v.is_finite() && *v >= cut), "low={}", cut);
            assert!(lower.outputs[0].iter().all(|v| v.is_finite() && *v <= -cut));
            let mean_up = up.iter().sum::<f64>() / up.len() as f64;
            assert!(mean_up < cut + 0.5, "tail mass should hug the cut, mean {}", mean_up);
        }

        let g = param(Distribution::gamma(2.0, 1.0).unwrap(), Shape::scalar());
        let set = SamplingService::new(100)
            .with_seed(3)
            .with_trunc_limits(TruncLimits::low(60.0))
            .generate(&g)
            .unwrap();
        assert!(set.outputs[0].iter().all(|v| v.is_finite() && *v >= 60.0));
    }

    #[test]
    fn test_trunc_limits_intersect_parameter_bounds() {
        let dist = Distribution::normal(0.0, 1.0).unwrap();
        let p = StochasticParameter::new("x", -0.5, 0.5, Shape::scalar(), dist).unwrap();
        let set = SamplingService::new(200)
            .with_seed(1)
            .with_trunc_limits(TruncLimits::high(2.0))
            .generate(&p)
            .unwrap();
        assert_eq!(set.truncation, Some((-0.5, 0.5)));
        assert!(set.outputs[0].iter().all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn test_strict_native_truncation_fails() {
        let p = param(Distribution::normal(0.0, 1.0).unwrap(), Shape::scalar());
        let err = SamplingService::new(10)
            .with_trunc_limits(TruncLimits::low(0.0))
            .strict(true)
            .generate(&p)
            .unwrap_err();
        assert!(matches!(err, Error::SamplingBackendUnavailable { backend: "native", .. }));
    }

    #[test]
    fn test_truncated_discrete_has_no_backend() {
        let p = param(Distribution::poisson(3.0).unwrap(), Shape::scalar());
        let err = SamplingService::new(10)
            .with_trunc_limits(TruncLimits::high(2.0))
            .generate(&p)
            .unwrap_err();
        assert!(matches!(err, Error::SamplingBackendUnavailable { .. }));
    }

    #[test]
    fn test_discrete_falls_back_to_native() {
        let p = param(Distribution::binomial(10, 0.3).unwrap(), Shape::scalar());
        let set = SamplingService::new(100)
            .with_seed(3)
            .with_backend(SamplingBackend::Statistical)
            .generate(&p)
            .unwrap();
        assert_eq!(set.backend, SamplingBackend::Native);
        assert!(set.outputs[0].iter().all(|v| v.fract() == 0.0 && (0.0..=10.0).contains(v)));
    }

    #[test]
    fn test_sample_means_close_to_distribution_mean() {
        let dist = Distribution::gamma(4.0, 2.0).unwrap();
        for backend in [SamplingBackend::Native, SamplingBackend::Statistical] {
            let set = SamplingService::new(20_000)
                .with_seed(11)
                .with_backend(backend)
                .generate_from_distribution(&dist, &Shape::scalar())
                .unwrap();
            let stats = set.stats()[0];
            assert_abs_diff_eq!(stats.mean, 2.0, epsilon = 0.05);
            assert_abs_diff_eq!(stats.std, 1.0, epsilon = 0.05);
        }
    }

    #[test]
    fn test_flatten_and_coordinates() {
        let p = param(Distribution::normal(0.0, 1.0).unwrap(), Shape::square(2).unwrap());
        let set = SamplingService::new(3).with_seed(5).generate(&p).unwrap();
        let flat = set.flatten();
        assert_eq!(flat.len(), 12);
        assert_eq!(set.output_at(&[1, 0]).unwrap(), set.output(2).unwrap());
        assert_eq!(set.sample(1).unwrap(), flat[4..8].to_vec());
        assert!(set.clone().into_values().is_err());
    }

    #[test]
    fn test_elementwise_outputs_follow_their_own_distribution() {
        let modes = [0.5, 4.0, 20.0];
        let elements: Vec<Distribution> = modes
            .iter()
            .map(|&m| {
                let target = MomentTarget::mode_std(m, 0.1 * m);
                Distribution::from_moments(DistributionKind::Gamma, &target)
            })
            .collect::<Result<_>>()
            .unwrap();
        let p = StochasticParameter::elementwise(
            "EC",
            0.0,
            100.0,
            Shape::vector(3).unwrap(),
            elements.clone(),
        )
        .unwrap();
        for backend in [SamplingBackend::Native, SamplingBackend::Statistical] {
            let svc = SamplingService::new(4000).with_seed(3).with_backend(backend);
            let set = svc.generate(&p).unwrap();
            for (stats, d) in set.stats().iter().zip(&elements) {
                let mean = d.mean().unwrap();
                assert!((stats.mean - mean).abs() < 0.05 * mean, "{}: {}", backend, stats.mean);
            }
        }

        let truncated = SamplingService::new(500)
            .with_seed(3)
            .with_trunc_limits(TruncLimits::high(21.0))
            .generate(&p)
            .unwrap();
        assert_eq!(truncated.backend, SamplingBackend::Statistical);
        assert!(truncated.outputs[2].iter().all(|&x| x <= 21.0));
        assert!(truncated.stats()[2].mean < 20.0);

        let mismatch = [elements[0], elements[1]];
        let svc = SamplingService::new(10);
        assert!(svc.draw(&mismatch, &Shape::vector(3).unwrap(), (0.0, 100.0)).is_err());
    }

    #[test]
    fn test_zero_samples_rejected() {
        let p = param(Distribution::normal(0.0, 1.0).unwrap(), Shape::scalar());
        assert!(SamplingService::new(0).generate(&p).is_err());
    }

    #[test]
    fn test_sample_stats() {
        let s = SampleStats::from_values(&[3.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.median, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_abs_diff_eq!(s.std, 1.25f64.sqrt());
        assert!(SampleStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("statrs".parse::<SamplingBackend>().unwrap(), SamplingBackend::Statistical);
        assert!("torch".parse::<SamplingBackend>().is_err());
    }
}
