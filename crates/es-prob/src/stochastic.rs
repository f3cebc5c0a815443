//! Stochastic parameters: bounds + shape + an owned distribution.

use std::collections::BTreeMap;

use es_core::{Error, Result, Shape};
use serde::Serialize;

use crate::distribution::{Distribution, DistributionKind};
use crate::moments::{MomentSummary, MomentTarget, Moments};

/// A named model parameter described by a probability distribution.
///
/// Immutable after construction. Draws are expected to fall in `[low, high]` once
/// truncated by the sampling service; `shape` sets how many independent scalar draws
/// make up one sample. Every element shares `distribution` unless the parameter was
/// built element-wise, in which case each flattened element has its own distribution
/// of the same family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StochasticParameter {
    name: String,
    low: f64,
    high: f64,
    shape: Shape,
    distribution: Distribution,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    elements: Vec<Distribution>,
}

/// Serializable description of a parameter with its moments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescription {
    /// Parameter name.
    pub name: String,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
    /// Display form of the shape.
    pub shape: String,
    /// The distribution with its native parameters (element 0 when element-wise).
    pub distribution: Distribution,
    /// Per-element distributions, row-major; empty when shared.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Distribution>,
    /// Human-readable parameter constraint.
    pub constraint: &'static str,
    /// Moments (undefined ones omitted as `null`).
    pub moments: MomentSummary,
}

impl StochasticParameter {
    /// Wrap an already-built distribution.
    pub fn new(
        name: impl Into<String>,
        low: f64,
        high: f64,
        shape: Shape,
        distribution: Distribution,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("parameter name must not be empty".to_string()));
        }
        if low.is_nan() || high.is_nan() || low > high {
            return Err(Error::Validation(format!(
                "parameter `{}`: bounds must satisfy low <= high, got [{}, {}]",
                name, low, high
            )));
        }
        distribution.validate()?;
        Ok(Self { name, low, high, shape, distribution, elements: Vec::new() })
    }

    /// One distribution per flattened element (row-major), all of one family.
    ///
    /// Identical elements collapse into a shared distribution.
    pub fn elementwise(
        name: impl Into<String>,
        low: f64,
        high: f64,
        shape: Shape,
        elements: Vec<Distribution>,
    ) -> Result<Self> {
        let name = name.into();
        let Some(&first) = elements.first() else {
            return Err(Error::Validation(format!(
                "parameter `{}`: no element distributions",
                name
            )));
        };
        if elements.len() != shape.size() {
            return Err(Error::Validation(format!(
                "parameter `{}`: {} element distributions for shape {}",
                name,
                elements.len(),
                shape
            )));
        }
        if let Some(other) = elements.iter().find(|d| d.kind() != first.kind()) {
            return Err(Error::Validation(format!(
                "parameter `{}`: element distributions mix {} and {}",
                name,
                first.kind(),
                other.kind()
            )));
        }
        for d in &elements {
            d.validate()?;
        }
        let mut p = Self::new(name, low, high, shape, first)?;
        if elements.iter().any(|d| *d != first) {
            p.elements = elements;
        }
        Ok(p)
    }

    /// Element-wise moment matching: `targets[j]` fixes element `j`.
    pub fn from_targets(
        name: impl Into<String>,
        low: f64,
        high: f64,
        shape: Shape,
        kind: DistributionKind,
        targets: &[MomentTarget],
    ) -> Result<Self> {
        let elements = targets
            .iter()
            .map(|t| Distribution::from_moments(kind, t))
            .collect::<Result<Vec<_>>>()?;
        Self::elementwise(name, low, high, shape, elements)
    }

    /// Build a parameter by distribution name.
    ///
    /// With `optimize`, `kwargs` hold a moment target (`std` plus `mean` or `mode`) that
    /// is solved into native parameters; otherwise they are the native parameters.
    pub fn create(
        name: impl Into<String>,
        low: f64,
        high: f64,
        shape: Shape,
        variant: &str,
        optimize: bool,
        kwargs: &BTreeMap<String, f64>,
    ) -> Result<Self> {
        let distribution = if optimize {
            let kind = DistributionKind::from_name(variant)?;
            Distribution::from_moments(kind, &MomentTarget::from_kwargs(kwargs)?)?
        } else {
            Distribution::create(variant, kwargs)?
        };
        Self::new(name, low, high, shape, distribution)
    }

    /// Build a parameter by moment matching.
    pub fn from_target(
        name: impl Into<String>,
        low: f64,
        high: f64,
        shape: Shape,
        kind: DistributionKind,
        target: &MomentTarget,
    ) -> Result<Self> {
        Self::new(name, low, high, shape, Distribution::from_moments(kind, target)?)
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower bound.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper bound.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// `(low, high)`.
    pub fn bounds(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Tensor shape of one sample.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of independent scalar draws per sample.
    pub fn n_outputs(&self) -> usize {
        self.shape.size()
    }

    /// The embedded distribution (that of element 0 when element-wise).
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// Whether elements carry distinct distributions.
    pub fn is_elementwise(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Distributions to draw from: one shared entry, or one per flattened element.
    pub fn element_distributions(&self) -> &[Distribution] {
        if self.elements.is_empty() {
            std::slice::from_ref(&self.distribution)
        } else {
            &self.elements
        }
    }

    /// Distribution of flattened element `j`.
    pub fn element_distribution(&self, j: usize) -> Option<&Distribution> {
        if j >= self.shape.size() {
            return None;
        }
        self.elements.get(j).or(Some(&self.distribution))
    }

    /// Distribution family.
    pub fn kind(&self) -> DistributionKind {
        self.distribution.kind()
    }

    /// Mean of the distribution.
    pub fn mean(&self) -> Result<f64> {
        self.distribution.mean()
    }

    /// Median of the distribution.
    pub fn median(&self) -> Result<f64> {
        self.distribution.median()
    }

    /// Mode of the distribution.
    pub fn mode(&self) -> Result<f64> {
        self.distribution.mode()
    }

    /// Variance of the distribution.
    pub fn var(&self) -> Result<f64> {
        self.distribution.var()
    }

    /// Standard deviation of the distribution.
    pub fn std(&self) -> Result<f64> {
        self.distribution.std()
    }

    /// Skewness of the distribution.
    pub fn skew(&self) -> Result<f64> {
        self.distribution.skew()
    }

    /// Excess kurtosis of the distribution.
    pub fn kurt(&self) -> Result<f64> {
        self.distribution.kurt()
    }

    /// All moments (strict).
    pub fn moments(&self) -> Result<Moments> {
        self.distribution.moments()
    }

    /// Reporting view.
    pub fn describe(&self) -> ParameterDescription {
        ParameterDescription {
            name: self.name.clone(),
            low: self.low,
            high: self.high,
            shape: self.shape.to_string(),
            distribution: self.distribution,
            elements: self.elements.clone(),
            constraint: self.kind().constraint(),
            moments: self.distribution.summary(),
        }
    }
}
