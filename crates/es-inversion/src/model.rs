//! A named set of priors over a region count.

use std::collections::BTreeSet;

use es_core::traits::ParameterSpace;
use es_core::{Error, Result, Shape};
use es_prob::{ParameterDescription, StochasticParameter};
use serde::Serialize;

/// Priors of one Bayesian model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalModel {
    name: String,
    n_regions: usize,
    parameters: Vec<StochasticParameter>,
}

impl StatisticalModel {
    /// Validated model; parameter names must be unique.
    pub fn new(
        name: impl Into<String>,
        n_regions: usize,
        parameters: Vec<StochasticParameter>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("statistical model name must not be empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = parameters.iter().find(|p| !seen.insert(p.name())) {
            return Err(Error::Validation(format!(
                "statistical model `{}`: duplicate parameter `{}`",
                name,
                dup.name()
            )));
        }
        Ok(Self { name, n_regions, parameters })
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of regions.
    pub fn n_regions(&self) -> usize {
        self.n_regions
    }

    /// Priors in declaration order.
    pub fn parameters(&self) -> &[StochasticParameter] {
        &self.parameters
    }

    /// Prior by name.
    pub fn parameter(&self, name: &str) -> Option<&StochasticParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Reporting view of every prior.
    pub fn describe(&self) -> Vec<ParameterDescription> {
        self.parameters.iter().map(StochasticParameter::describe).collect()
    }
}

impl ParameterSpace for StatisticalModel {
    fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name().to_string()).collect()
    }

    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(StochasticParameter::bounds).collect()
    }

    fn parameter_shapes(&self) -> Vec<Shape> {
        self.parameters.iter().map(|p| p.shape().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_prob::Distribution;

    fn prior(name: &str) -> StochasticParameter {
        let beta = Distribution::beta(2.0, 2.0).unwrap();
        StochasticParameter::new(name, 0.0, 1.0, Shape::scalar(), beta).unwrap()
    }

    #[test]
    fn test_parameter_space() {
        let m = StatisticalModel::new("vep", 3, vec![prior("a"), prior("b")]).unwrap();
        assert_eq!(m.n_parameters(), 2);
        assert_eq!(m.parameter_names(), vec!["a", "b"]);
        assert_eq!(m.parameter_bounds(), vec![(0.0, 1.0); 2]);
        assert!(m.parameter("b").is_some());
        assert_eq!(m.describe()[0].constraint, "alpha > 0, beta > 0");
    }

    #[test]
    fn test_duplicate_rejected() {
        assert!(StatisticalModel::new("vep", 3, vec![prior("a"), prior("a")]).is_err());
        assert!(StatisticalModel::new(" ", 3, vec![]).is_err());
    }
}
