//! The closed set of probability distributions used by stochastic parameters.
//!
//! Variant selection by name goes through [`DistributionKind::from_name`], a static
//! lookup table (with the legacy statistical-library aliases such as `norm` or
//! `expon`). Moments are always recomputed from the current parameters.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use es_core::{Error, Result};
use serde::Serialize;
use statrs::distribution::{
    Bernoulli as SBernoulli, Beta as SBeta, Binomial as SBinomial, ChiSquared, ContinuousCDF,
    DiscreteCDF, Exp, Gamma as SGamma, LogNormal as SLogNormal, Normal as SNormal,
    Poisson as SPoisson, StudentsT, Uniform as SUniform,
};

use crate::math::bisect;
use crate::moments::{ClosedForm, MomentSummary, MomentTarget, Moments, non_matchable};
use crate::{
    bernoulli, beta, binomial, chisquare, exponential, gamma, lognormal, normal, poisson,
    student_t, uniform,
};

/// Distribution family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// `uniform(a, b)`
    Uniform,
    /// `normal(mu, sigma)`
    Normal,
    /// `lognormal(mu, sigma)`
    LogNormal,
    /// `gamma(shape, rate)`
    Gamma,
    /// `exponential(rate)`
    Exponential,
    /// `beta(alpha, beta)`
    Beta,
    /// `student_t(df, mu, sigma)`
    StudentT,
    /// `chisquare(k)`
    ChiSquare,
    /// `poisson(lambda)`
    Poisson,
    /// `bernoulli(p)`
    Bernoulli,
    /// `binomial(n, p)`
    Binomial,
}

/// Survival level below which `quantile(1 - p)` loses too much precision.
const TAIL_LEVEL: f64 = 1e-3;

/// Name lookup table: (alias, kind). Canonical names come first.
const REGISTRY: &[(&str, DistributionKind)] = &[
    ("uniform", DistributionKind::Uniform),
    ("normal", DistributionKind::Normal),
    ("lognormal", DistributionKind::LogNormal),
    ("gamma", DistributionKind::Gamma),
    ("exponential", DistributionKind::Exponential),
    ("beta", DistributionKind::Beta),
    ("student_t", DistributionKind::StudentT),
    ("chisquare", DistributionKind::ChiSquare),
    ("poisson", DistributionKind::Poisson),
    ("bernoulli", DistributionKind::Bernoulli),
    ("binomial", DistributionKind::Binomial),
    ("norm", DistributionKind::Normal),
    ("gaussian", DistributionKind::Normal),
    ("lognorm", DistributionKind::LogNormal),
    ("expon", DistributionKind::Exponential),
    ("exp", DistributionKind::Exponential),
    ("t", DistributionKind::StudentT),
    ("studentt", DistributionKind::StudentT),
    ("chi2", DistributionKind::ChiSquare),
    ("chisquared", DistributionKind::ChiSquare),
    ("binom", DistributionKind::Binomial),
];

impl DistributionKind {
    /// Every registered variant.
    pub const ALL: [DistributionKind; 11] = [
        Self::Uniform,
        Self::Normal,
        Self::LogNormal,
        Self::Gamma,
        Self::Exponential,
        Self::Beta,
        Self::StudentT,
        Self::ChiSquare,
        Self::Poisson,
        Self::Bernoulli,
        Self::Binomial,
    ];

    /// Look up a variant by (case-insensitive) name or alias.
    pub fn from_name(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_lowercase().replace('-', "_");
        REGISTRY
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| Error::UnknownVariant(name.to_string()))
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Normal => "normal",
            Self::LogNormal => "lognormal",
            Self::Gamma => "gamma",
            Self::Exponential => "exponential",
            Self::Beta => "beta",
            Self::StudentT => "student_t",
            Self::ChiSquare => "chisquare",
            Self::Poisson => "poisson",
            Self::Bernoulli => "bernoulli",
            Self::Binomial => "binomial",
        }
    }

    /// Native parameter names, in order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            Self::Uniform => &["a", "b"],
            Self::Normal | Self::LogNormal => &["mu", "sigma"],
            Self::Gamma => &["shape", "rate"],
            Self::Exponential => &["rate"],
            Self::Beta => &["alpha", "beta"],
            Self::StudentT => &["df", "mu", "sigma"],
            Self::ChiSquare => &["k"],
            Self::Poisson => &["lambda"],
            Self::Bernoulli => &["p"],
            Self::Binomial => &["n", "p"],
        }
    }

    /// Number of native parameters.
    pub fn n_params(self) -> usize {
        self.param_names().len()
    }

    /// Human-readable parameter constraint.
    pub fn constraint(self) -> &'static str {
        match self {
            Self::Uniform => "-inf < a < b < inf",
            Self::Normal | Self::LogNormal => "mu finite, sigma > 0",
            Self::Gamma => "shape > 0, rate > 0",
            Self::Exponential => "rate > 0",
            Self::Beta => "alpha > 0, beta > 0",
            Self::StudentT => "df > 0, mu finite, sigma > 0",
            Self::ChiSquare => "k > 0",
            Self::Poisson => "lambda > 0",
            Self::Bernoulli => "0 < p < 1",
            Self::Binomial => "n >= 1 integer, 0 < p < 1",
        }
    }

    /// Integer-valued support.
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Poisson | Self::Bernoulli | Self::Binomial)
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterised probability distribution.
///
/// Construct through [`Distribution::create`], the typed constructors, or
/// [`Distribution::from_moments`]; all of them validate the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Continuous uniform on `[a, b]`.
    Uniform {
        /// Lower end.
        a: f64,
        /// Upper end.
        b: f64,
    },
    /// Normal `N(mu, sigma)`.
    Normal {
        /// Location.
        mu: f64,
        /// Scale.
        sigma: f64,
    },
    /// Log-normal: `ln X ~ N(mu, sigma)`.
    #[serde(rename = "lognormal")]
    LogNormal {
        /// Log-location.
        mu: f64,
        /// Log-scale.
        sigma: f64,
    },
    /// Gamma with shape and rate.
    Gamma {
        /// Shape `k`.
        shape: f64,
        /// Rate (inverse scale).
        rate: f64,
    },
    /// Exponential with rate.
    Exponential {
        /// Rate.
        rate: f64,
    },
    /// Beta on `[0, 1]`.
    Beta {
        /// First shape.
        alpha: f64,
        /// Second shape.
        beta: f64,
    },
    /// Location-scale Student-t.
    StudentT {
        /// Degrees of freedom.
        df: f64,
        /// Location.
        mu: f64,
        /// Scale.
        sigma: f64,
    },
    /// Chi-square.
    #[serde(rename = "chisquare")]
    ChiSquare {
        /// Degrees of freedom.
        k: f64,
    },
    /// Poisson counts.
    Poisson {
        /// Rate.
        lambda: f64,
    },
    /// Bernoulli trial.
    Bernoulli {
        /// Success probability.
        p: f64,
    },
    /// Binomial counts.
    Binomial {
        /// Trials.
        n: u64,
        /// Success probability.
        p: f64,
    },
}

fn statrs_err(e: impl fmt::Display) -> Error {
    Error::Computation(format!("statrs: {}", e))
}

fn std_normal_quantile(p: f64) -> Result<f64> {
    Ok(SNormal::new(0.0, 1.0).map_err(statrs_err)?.inverse_cdf(p))
}

/// Consumes named parameters, accepting aliases and rejecting leftovers.
struct ParamReader<'a> {
    kind: DistributionKind,
    params: &'a BTreeMap<String, f64>,
    used: BTreeSet<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn new(kind: DistributionKind, params: &'a BTreeMap<String, f64>) -> Self {
        Self { kind, params, used: BTreeSet::new() }
    }

    fn take(&mut self, aliases: &[&str]) -> Option<f64> {
        for (key, value) in self.params.iter() {
            if aliases.contains(&key.as_str()) {
                self.used.insert(key.as_str());
                return Some(*value);
            }
        }
        None
    }

    fn require(&mut self, aliases: &[&str]) -> Result<f64> {
        self.take(aliases).ok_or_else(|| {
            Error::Validation(format!(
                "{} requires parameter `{}` (accepted: {})",
                self.kind,
                aliases[0],
                aliases.join(", ")
            ))
        })
    }

    fn finish(self) -> Result<()> {
        let unused: Vec<&str> = self
            .params
            .keys()
            .map(String::as_str)
            .filter(|k| !self.used.contains(k))
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "unexpected parameters for {}: {}",
                self.kind,
                unused.join(", ")
            )))
        }
    }
}

impl Distribution {
    /// Build a distribution from a variant name and named parameters.
    ///
    /// Besides the native names ([`DistributionKind::param_names`]) the legacy
    /// `loc`/`scale` conventions are accepted: `uniform(loc, scale)` is `[loc, loc + scale]`,
    /// `normal(loc, scale)`, `gamma(shape, scale)`, `exponential(scale)`.
    pub fn create(name: &str, params: &BTreeMap<String, f64>) -> Result<Self> {
        let kind = DistributionKind::from_name(name)?;
        let mut r = ParamReader::new(kind, params);
        let dist = match kind {
            DistributionKind::Uniform => match r.take(&["loc"]) {
                Some(loc) => {
                    let scale = r.require(&["scale"])?;
                    Self::Uniform { a: loc, b: loc + scale }
                }
                None => {
                    Self::Uniform { a: r.require(&["a", "low"])?, b: r.require(&["b", "high"])? }
                }
            },
            DistributionKind::Normal => Self::Normal {
                mu: r.require(&["mu", "loc"])?,
                sigma: r.require(&["sigma", "scale"])?,
            },
            DistributionKind::LogNormal => Self::LogNormal {
                mu: r.require(&["mu"])?,
                sigma: r.require(&["sigma"])?,
            },
            DistributionKind::Gamma => {
                let shape = r.require(&["shape", "alpha", "k"])?;
                let rate = match r.take(&["scale", "theta"]) {
                    Some(scale) => 1.0 / scale,
                    None => r.require(&["rate", "beta"])?,
                };
                Self::Gamma { shape, rate }
            }
            DistributionKind::Exponential => {
                let rate = match r.take(&["scale"]) {
                    Some(scale) => 1.0 / scale,
                    None => r.require(&["rate", "lambda"])?,
                };
                Self::Exponential { rate }
            }
            DistributionKind::Beta => Self::Beta {
                alpha: r.require(&["alpha", "a"])?,
                beta: r.require(&["beta", "b"])?,
            },
            DistributionKind::StudentT => Self::StudentT {
                df: r.require(&["df", "nu"])?,
                mu: r.take(&["mu", "loc"]).unwrap_or(0.0),
                sigma: r.take(&["sigma", "scale"]).unwrap_or(1.0),
            },
            DistributionKind::ChiSquare => Self::ChiSquare { k: r.require(&["k", "df"])? },
            DistributionKind::Poisson => Self::Poisson { lambda: r.require(&["lambda", "mu"])? },
            DistributionKind::Bernoulli => Self::Bernoulli { p: r.require(&["p"])? },
            DistributionKind::Binomial => {
                let n = r.require(&["n"])?;
                if n.fract() != 0.0 || n < 1.0 || n > u64::MAX as f64 {
                    return Err(Error::Validation(format!(
                        "binomial n must be a positive integer, got {}",
                        n
                    )));
                }
                Self::Binomial { n: n as u64, p: r.require(&["p"])? }
            }
        };
        r.finish()?;
        dist.validate()?;
        Ok(dist)
    }

    /// `uniform(a, b)`.
    pub fn uniform(a: f64, b: f64) -> Result<Self> {
        Self::Uniform { a, b }.validated()
    }

    /// `normal(mu, sigma)`.
    pub fn normal(mu: f64, sigma: f64) -> Result<Self> {
        Self::Normal { mu, sigma }.validated()
    }

    /// `lognormal(mu, sigma)`.
    pub fn lognormal(mu: f64, sigma: f64) -> Result<Self> {
        Self::LogNormal { mu, sigma }.validated()
    }

    /// `gamma(shape, rate)`.
    pub fn gamma(shape: f64, rate: f64) -> Result<Self> {
        Self::Gamma { shape, rate }.validated()
    }

    /// `exponential(rate)`.
    pub fn exponential(rate: f64) -> Result<Self> {
        Self::Exponential { rate }.validated()
    }

    /// `beta(alpha, beta)`.
    pub fn beta(alpha: f64, beta: f64) -> Result<Self> {
        Self::Beta { alpha, beta }.validated()
    }

    /// `student_t(df, mu, sigma)`.
    pub fn student_t(df: f64, mu: f64, sigma: f64) -> Result<Self> {
        Self::StudentT { df, mu, sigma }.validated()
    }

    /// `chisquare(k)`.
    pub fn chisquare(k: f64) -> Result<Self> {
        Self::ChiSquare { k }.validated()
    }

    /// `poisson(lambda)`.
    pub fn poisson(lambda: f64) -> Result<Self> {
        Self::Poisson { lambda }.validated()
    }

    /// `bernoulli(p)`.
    pub fn bernoulli(p: f64) -> Result<Self> {
        Self::Bernoulli { p }.validated()
    }

    /// `binomial(n, p)`.
    pub fn binomial(n: u64, p: f64) -> Result<Self> {
        Self::Binomial { n, p }.validated()
    }

    /// Solve a variant's native parameters from a target (mean or mode) and std.
    ///
    /// Fails with [`Error::NonMatchableMoments`] when the target lies outside the
    /// variant's feasible region or the variant cannot be fixed by two moments.
    pub fn from_moments(kind: DistributionKind, target: &MomentTarget) -> Result<Self> {
        target.validate()?;
        let dist = match kind {
            DistributionKind::Uniform => {
                let (a, b) = uniform::match_moments(target)?;
                Self::Uniform { a, b }
            }
            DistributionKind::Normal => {
                let (mu, sigma) = normal::match_moments(target)?;
                Self::Normal { mu, sigma }
            }
            DistributionKind::LogNormal => {
                let (mu, sigma) = lognormal::match_moments(target)?;
                Self::LogNormal { mu, sigma }
            }
            DistributionKind::Gamma => {
                let (shape, rate) = gamma::match_moments(target)?;
                Self::Gamma { shape, rate }
            }
            DistributionKind::Exponential => {
                Self::Exponential { rate: exponential::match_moments(target)? }
            }
            DistributionKind::Beta => {
                let (alpha, beta) = beta::match_moments(target)?;
                Self::Beta { alpha, beta }
            }
            DistributionKind::ChiSquare => Self::ChiSquare { k: chisquare::match_moments(target)? },
            DistributionKind::Poisson => Self::Poisson { lambda: poisson::match_moments(target)? },
            DistributionKind::Bernoulli => Self::Bernoulli { p: bernoulli::match_moments(target)? },
            DistributionKind::StudentT => {
                return Err(non_matchable(
                    kind.name(),
                    "degrees of freedom are not determined by mean and std",
                ));
            }
            DistributionKind::Binomial => {
                return Err(non_matchable(
                    kind.name(),
                    "number of trials is not determined by mean and std",
                ));
            }
        };
        dist.validated().map_err(|e| non_matchable(kind.name(), e.to_string()))
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check the parameter constraint.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Uniform { a, b } => uniform::validate(a, b),
            Self::Normal { mu, sigma } => normal::validate(mu, sigma),
            Self::LogNormal { mu, sigma } => lognormal::validate(mu, sigma),
            Self::Gamma { shape, rate } => gamma::validate(shape, rate),
            Self::Exponential { rate } => exponential::validate(rate),
            Self::Beta { alpha, beta } => beta::validate(alpha, beta),
            Self::StudentT { df, mu, sigma } => student_t::validate(df, mu, sigma),
            Self::ChiSquare { k } => chisquare::validate(k),
            Self::Poisson { lambda } => poisson::validate(lambda),
            Self::Bernoulli { p } => bernoulli::validate(p),
            Self::Binomial { n, p } => binomial::validate(n, p),
        }
    }

    /// Whether the current parameters satisfy [`DistributionKind::constraint`].
    pub fn satisfies_constraint(&self) -> bool {
        self.validate().is_ok()
    }

    /// Variant tag.
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Uniform { .. } => DistributionKind::Uniform,
            Self::Normal { .. } => DistributionKind::Normal,
            Self::LogNormal { .. } => DistributionKind::LogNormal,
            Self::Gamma { .. } => DistributionKind::Gamma,
            Self::Exponential { .. } => DistributionKind::Exponential,
            Self::Beta { .. } => DistributionKind::Beta,
            Self::StudentT { .. } => DistributionKind::StudentT,
            Self::ChiSquare { .. } => DistributionKind::ChiSquare,
            Self::Poisson { .. } => DistributionKind::Poisson,
            Self::Bernoulli { .. } => DistributionKind::Bernoulli,
            Self::Binomial { .. } => DistributionKind::Binomial,
        }
    }

    /// Number of native parameters.
    pub fn n_params(&self) -> usize {
        self.kind().n_params()
    }

    /// Native parameters by name.
    pub fn params(&self) -> BTreeMap<&'static str, f64> {
        let values: Vec<f64> = match *self {
            Self::Uniform { a, b } => vec![a, b],
            Self::Normal { mu, sigma } | Self::LogNormal { mu, sigma } => vec![mu, sigma],
            Self::Gamma { shape, rate } => vec![shape, rate],
            Self::Exponential { rate } => vec![rate],
            Self::Beta { alpha, beta } => vec![alpha, beta],
            Self::StudentT { df, mu, sigma } => vec![df, mu, sigma],
            Self::ChiSquare { k } => vec![k],
            Self::Poisson { lambda } => vec![lambda],
            Self::Bernoulli { p } => vec![p],
            Self::Binomial { n, p } => vec![n as f64, p],
        };
        self.kind().param_names().iter().copied().zip(values).collect()
    }

    /// Closed support `[low, high]` (possibly infinite).
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Self::Uniform { a, b } => (a, b),
            Self::Normal { .. } | Self::StudentT { .. } => (f64::NEG_INFINITY, f64::INFINITY),
            Self::LogNormal { .. }
            | Self::Gamma { .. }
            | Self::Exponential { .. }
            | Self::ChiSquare { .. }
            | Self::Poisson { .. } => (0.0, f64::INFINITY),
            Self::Beta { .. } | Self::Bernoulli { .. } => (0.0, 1.0),
            Self::Binomial { n, .. } => (0.0, n as f64),
        }
    }

    /// Whether `x` lies in the support (integers only for discrete variants).
    pub fn in_support(&self, x: f64) -> bool {
        let (lo, hi) = self.support();
        x >= lo && x <= hi && (!self.kind().is_discrete() || x.fract() == 0.0)
    }

    /// Log density (continuous) or log mass (discrete) at `x`.
    pub fn logpdf(&self, x: f64) -> Result<f64> {
        if self.kind().is_discrete() && !self.in_support(x) {
            return Ok(f64::NEG_INFINITY);
        }
        match *self {
            Self::Uniform { a, b } => uniform::logpdf(x, a, b),
            Self::Normal { mu, sigma } => normal::logpdf(x, mu, sigma),
            Self::LogNormal { mu, sigma } => lognormal::logpdf(x, mu, sigma),
            Self::Gamma { shape, rate } => gamma::logpdf_shape_rate(x, shape, rate),
            Self::Exponential { rate } => exponential::logpdf(x, rate),
            Self::Beta { alpha, beta } => beta::logpdf(x, alpha, beta),
            Self::StudentT { df, mu, sigma } => student_t::logpdf(x, df, mu, sigma),
            Self::ChiSquare { k } => chisquare::logpdf(x, k),
            Self::Poisson { lambda } => poisson::logpmf(x as u64, lambda),
            Self::Bernoulli { p } => bernoulli::logpmf(x as u8, p),
            Self::Binomial { n, p } => binomial::logpmf(x as u64, n, p),
        }
    }

    /// Cumulative distribution function.
    pub fn cdf(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Err(Error::Validation("cdf argument is NaN".to_string()));
        }
        let (lo, hi) = self.support();
        if x < lo {
            return Ok(0.0);
        }
        if x >= hi {
            return Ok(1.0);
        }
        let k = x.floor() as u64;
        Ok(match *self {
            Self::Uniform { a, b } => SUniform::new(a, b).map_err(statrs_err)?.cdf(x),
            Self::Normal { mu, sigma } => SNormal::new(mu, sigma).map_err(statrs_err)?.cdf(x),
            Self::LogNormal { mu, sigma } => {
                SLogNormal::new(mu, sigma).map_err(statrs_err)?.cdf(x)
            }
            Self::Gamma { shape, rate } => SGamma::new(shape, rate).map_err(statrs_err)?.cdf(x),
            Self::Exponential { rate } => Exp::new(rate).map_err(statrs_err)?.cdf(x),
            Self::Beta { alpha, beta } => SBeta::new(alpha, beta).map_err(statrs_err)?.cdf(x),
            Self::StudentT { df, mu, sigma } => {
                StudentsT::new(mu, sigma, df).map_err(statrs_err)?.cdf(x)
            }
            Self::ChiSquare { k: dof } => ChiSquared::new(dof).map_err(statrs_err)?.cdf(x),
            Self::Poisson { lambda } => SPoisson::new(lambda).map_err(statrs_err)?.cdf(k),
            Self::Bernoulli { p } => SBernoulli::new(p).map_err(statrs_err)?.cdf(k),
            Self::Binomial { n, p } => SBinomial::new(p, n).map_err(statrs_err)?.cdf(k),
        })
    }

    /// Quantile (inverse CDF) at probability `q`.
    pub fn quantile(&self, q: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::Validation(format!("quantile level must lie in [0, 1], got {}", q)));
        }
        let (lo, hi) = self.support();
        if q == 0.0 {
            return Ok(lo);
        }
        if q == 1.0 {
            return Ok(hi);
        }
        Ok(match *self {
            Self::Uniform { a, b } => a + q * (b - a),
            Self::Normal { mu, sigma } => {
                SNormal::new(mu, sigma).map_err(statrs_err)?.inverse_cdf(q)
            }
            Self::LogNormal { mu, sigma } => {
                SLogNormal::new(mu, sigma).map_err(statrs_err)?.inverse_cdf(q)
            }
            Self::Gamma { shape, rate } => {
                SGamma::new(shape, rate).map_err(statrs_err)?.inverse_cdf(q)
            }
            Self::Exponential { rate } => -(-q).ln_1p() / rate,
            Self::Beta { alpha, beta } => {
                SBeta::new(alpha, beta).map_err(statrs_err)?.inverse_cdf(q)
            }
            Self::StudentT { df, mu, sigma } => {
                StudentsT::new(mu, sigma, df).map_err(statrs_err)?.inverse_cdf(q)
            }
            Self::ChiSquare { k } => ChiSquared::new(k).map_err(statrs_err)?.inverse_cdf(q),
            Self::Poisson { lambda } => {
                SPoisson::new(lambda).map_err(statrs_err)?.inverse_cdf(q) as f64
            }
            Self::Bernoulli { p } => SBernoulli::new(p).map_err(statrs_err)?.inverse_cdf(q) as f64,
            Self::Binomial { n, p } => {
                SBinomial::new(p, n).map_err(statrs_err)?.inverse_cdf(q) as f64
            }
        })
    }

    /// Survival function `1 - F(x)`, computed without cancellation in the upper tail.
    pub fn sf(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Err(Error::Validation("sf argument is NaN".to_string()));
        }
        let (lo, hi) = self.support();
        if x < lo {
            return Ok(1.0);
        }
        if x >= hi {
            return Ok(0.0);
        }
        let k = x.floor() as u64;
        Ok(match *self {
            Self::Uniform { a, b } => SUniform::new(a, b).map_err(statrs_err)?.sf(x),
            Self::Normal { mu, sigma } => SNormal::new(mu, sigma).map_err(statrs_err)?.sf(x),
            Self::LogNormal { mu, sigma } => {
                SLogNormal::new(mu, sigma).map_err(statrs_err)?.sf(x)
            }
            Self::Gamma { shape, rate } => SGamma::new(shape, rate).map_err(statrs_err)?.sf(x),
            Self::Exponential { rate } => (-rate * x).exp(),
            Self::Beta { alpha, beta } => SBeta::new(alpha, beta).map_err(statrs_err)?.sf(x),
            Self::StudentT { df, mu, sigma } => {
                StudentsT::new(mu, sigma, df).map_err(statrs_err)?.sf(x)
            }
            Self::ChiSquare { k: dof } => ChiSquared::new(dof).map_err(statrs_err)?.sf(x),
            Self::Poisson { lambda } => SPoisson::new(lambda).map_err(statrs_err)?.sf(k),
            Self::Bernoulli { p } => SBernoulli::new(p).map_err(statrs_err)?.sf(k),
            Self::Binomial { n, p } => SBinomial::new(p, n).map_err(statrs_err)?.sf(k),
        })
    }

    /// Inverse survival function: the `x` with `sf(x) = p`.
    ///
    /// Exact through reflection where the family allows it. Otherwise `quantile(1 - p)`
    /// away from the tail and bisection on [`Distribution::sf`] inside it.
    pub fn inverse_sf(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Validation(format!("survival level must lie in [0, 1], got {}", p)));
        }
        let (lo, hi) = self.support();
        if p == 0.0 {
            return Ok(hi);
        }
        if p == 1.0 {
            return Ok(lo);
        }
        match *self {
            Self::Uniform { a, b } => Ok(b - p * (b - a)),
            Self::Normal { mu, sigma } => Ok(mu - sigma * std_normal_quantile(p)?),
            Self::LogNormal { mu, sigma } => Ok((mu - sigma * std_normal_quantile(p)?).exp()),
            Self::Exponential { rate } => Ok(-p.ln() / rate),
            Self::StudentT { df, mu, sigma } => {
                let t = StudentsT::new(0.0, 1.0, df).map_err(statrs_err)?;
                Ok(mu - sigma * t.inverse_cdf(p))
            }
            Self::Gamma { .. } | Self::Beta { .. } | Self::ChiSquare { .. } if p < TAIL_LEVEL => {
                self.tail_inverse_sf(p)
            }
            _ => self.quantile(1.0 - p),
        }
    }

    fn tail_inverse_sf(&self, p: f64) -> Result<f64> {
        let (_, s_hi) = self.support();
        let mut lo = self.median()?;
        let mut hi = if s_hi.is_finite() { s_hi } else { 2.0 * lo.abs().max(1.0) };
        while self.sf(hi)? > p {
            if !hi.is_finite() {
                return Err(Error::Computation(format!(
                    "survival level {} is beyond the representable tail of {}",
                    p, self
                )));
            }
            lo = hi;
            hi *= 2.0;
        }
        let f = |x: f64| self.sf(x).map_or(f64::NAN, |s| s - p);
        bisect(f, lo, hi, 1e-14, 300)
    }

    fn closed_form(&self) -> ClosedForm {
        match *self {
            Self::Uniform { a, b } => uniform::closed_form(a, b),
            Self::Normal { mu, sigma } => normal::closed_form(mu, sigma),
            Self::LogNormal { mu, sigma } => lognormal::closed_form(mu, sigma),
            Self::Gamma { shape, rate } => gamma::closed_form(shape, rate),
            Self::Exponential { rate } => exponential::closed_form(rate),
            Self::Beta { alpha, beta } => beta::closed_form(alpha, beta),
            Self::StudentT { df, mu, sigma } => student_t::closed_form(df, mu, sigma),
            Self::ChiSquare { k } => chisquare::closed_form(k),
            Self::Poisson { lambda } => poisson::closed_form(lambda),
            Self::Bernoulli { p } => bernoulli::closed_form(p),
            Self::Binomial { n, p } => binomial::closed_form(n, p),
        }
    }

    fn defined(&self, value: Option<f64>, moment: &'static str) -> Result<f64> {
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::UndefinedMoment { variant: self.to_string(), moment })
    }

    /// Mean.
    pub fn mean(&self) -> Result<f64> {
        self.defined(self.closed_form().mean, "mean")
    }

    /// Median (inverse CDF at 0.5 where no closed form exists).
    pub fn median(&self) -> Result<f64> {
        match self.closed_form().median {
            Some(m) => Ok(m),
            None => self.quantile(0.5),
        }
    }

    /// Mode.
    pub fn mode(&self) -> Result<f64> {
        self.defined(self.closed_form().mode, "mode")
    }

    /// Variance.
    pub fn var(&self) -> Result<f64> {
        self.defined(self.closed_form().var, "var")
    }

    /// Standard deviation.
    pub fn std(&self) -> Result<f64> {
        self.defined(self.closed_form().var.map(f64::sqrt), "std")
    }

    /// Skewness.
    pub fn skew(&self) -> Result<f64> {
        self.defined(self.closed_form().skew, "skew")
    }

    /// Excess kurtosis.
    pub fn kurt(&self) -> Result<f64> {
        self.defined(self.closed_form().kurt, "kurt")
    }

    /// All moments; fails on the first undefined one.
    pub fn moments(&self) -> Result<Moments> {
        Ok(Moments {
            mean: self.mean()?,
            median: self.median()?,
            mode: self.mode()?,
            var: self.var()?,
            std: self.std()?,
            skew: self.skew()?,
            kurt: self.kurt()?,
        })
    }

    /// All moments, undefined ones as `None`.
    pub fn summary(&self) -> MomentSummary {
        MomentSummary {
            mean: self.mean().ok(),
            median: self.median().ok(),
            mode: self.mode().ok(),
            var: self.var().ok(),
            std: self.std().ok(),
            skew: self.skew().ok(),
            kurt: self.kurt().ok(),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> =
            self.params().iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}({})", self.kind(), params.join(", "))
    }
}
