//! Mutation targets: which numeric field of a sample's state a PSE entry writes to.
//!
//! Targets are a closed set of field references parsed from dotted paths, plus an
//! index per written element. Nothing is resolved by reflection.

use std::fmt;
use std::str::FromStr;

use es_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::configuration::ModelConfigurationService;
use crate::hypothesis::DiseaseHypothesis;

/// Mutable hypothesis fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HypothesisField {
    /// `x0_values` (indexed by `x0_indices`).
    X0Values,
    /// `e_values` (indexed by `e_indices`).
    EValues,
    /// `w_values` (indexed by `w_indices`).
    WValues,
}

/// Mutable model-configuration-service fields (one entry per region).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceField {
    /// `K_unscaled`.
    KUnscaled,
    /// `x0_values`.
    X0Values,
    /// `e_values`.
    EValues,
}

/// A mutable numeric field of [`SampleState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PseTarget {
    /// Field of the hypothesis.
    Hypothesis(HypothesisField),
    /// Field of the model-configuration service.
    Service(ServiceField),
}

impl PseTarget {
    /// Canonical dotted path.
    pub fn path(self) -> &'static str {
        match self {
            Self::Hypothesis(HypothesisField::X0Values) => "hypothesis.x0_values",
            Self::Hypothesis(HypothesisField::EValues) => "hypothesis.e_values",
            Self::Hypothesis(HypothesisField::WValues) => "hypothesis.w_values",
            Self::Service(ServiceField::KUnscaled) => "model_configuration_service.K_unscaled",
            Self::Service(ServiceField::X0Values) => "model_configuration_service.x0_values",
            Self::Service(ServiceField::EValues) => "model_configuration_service.e_values",
        }
    }

    /// Parse a dotted path. A bare field name refers to the hypothesis.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.trim().split('.').collect();
        let (owner, field) = match segments.as_slice() {
            [field] => ("hypothesis", *field),
            [owner, field] => (*owner, *field),
            // Legacy spelling of the service owner.
            ["model", "configuration", "service", field] => ("model_configuration_service", *field),
            _ => return Err(Error::PathResolution(format!("unsupported target path `{}`", path))),
        };
        let target = match (owner, field) {
            ("hypothesis", "x0_values") => Self::Hypothesis(HypothesisField::X0Values),
            ("hypothesis", "e_values") => Self::Hypothesis(HypothesisField::EValues),
            ("hypothesis", "w_values") => Self::Hypothesis(HypothesisField::WValues),
            ("model_configuration_service", "K_unscaled" | "k_unscaled") => {
                Self::Service(ServiceField::KUnscaled)
            }
            ("model_configuration_service", "x0_values") => Self::Service(ServiceField::X0Values),
            ("model_configuration_service", "e_values") => Self::Service(ServiceField::EValues),
            _ => {
                return Err(Error::PathResolution(format!(
                    "`{}` does not name a mutable field",
                    path
                )));
            }
        };
        Ok(target)
    }
}

impl fmt::Display for PseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for PseTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PseTarget {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<PseTarget> for String {
    fn from(t: PseTarget) -> Self {
        t.path().to_string()
    }
}

/// Element address inside a target field.
///
/// - `Position(i)`: list-style, the `i`-th stored element.
/// - `Coordinate(c)`: array-style, a region `[r]` (or a connectivity pair `[i, j]` for
///   `w_values`), looked up through the owner's index arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldIndex {
    /// List-style position.
    Position(usize),
    /// Array-style coordinate.
    Coordinate(Vec<usize>),
}

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(i) => write!(f, "{}", i),
            Self::Coordinate(c) => write!(f, "{:?}", c),
        }
    }
}

/// The mutable part of one PSE sample: private copies of the hypothesis and the
/// configuration service.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleState {
    /// Hypothesis copy.
    pub hypothesis: DiseaseHypothesis,
    /// Configuration-service copy.
    pub service: ModelConfigurationService,
}

impl SampleState {
    /// Pair a hypothesis with a configuration service over the same regions.
    pub fn new(hypothesis: DiseaseHypothesis, service: ModelConfigurationService) -> Result<Self> {
        if hypothesis.number_of_regions() != service.number_of_regions() {
            return Err(Error::Validation(format!(
                "hypothesis has {} regions, configuration service {}",
                hypothesis.number_of_regions(),
                service.number_of_regions()
            )));
        }
        Ok(Self { hypothesis, service })
    }

    /// Current values of a target field.
    pub fn field(&self, target: PseTarget) -> &[f64] {
        match target {
            PseTarget::Hypothesis(HypothesisField::X0Values) => &self.hypothesis.x0_values,
            PseTarget::Hypothesis(HypothesisField::EValues) => &self.hypothesis.e_values,
            PseTarget::Hypothesis(HypothesisField::WValues) => &self.hypothesis.w_values,
            PseTarget::Service(ServiceField::KUnscaled) => &self.service.k_unscaled,
            PseTarget::Service(ServiceField::X0Values) => &self.service.x0_values,
            PseTarget::Service(ServiceField::EValues) => &self.service.e_values,
        }
    }

    fn field_mut(&mut self, target: PseTarget) -> &mut Vec<f64> {
        match target {
            PseTarget::Hypothesis(HypothesisField::X0Values) => &mut self.hypothesis.x0_values,
            PseTarget::Hypothesis(HypothesisField::EValues) => &mut self.hypothesis.e_values,
            PseTarget::Hypothesis(HypothesisField::WValues) => &mut self.hypothesis.w_values,
            PseTarget::Service(ServiceField::KUnscaled) => &mut self.service.k_unscaled,
            PseTarget::Service(ServiceField::X0Values) => &mut self.service.x0_values,
            PseTarget::Service(ServiceField::EValues) => &mut self.service.e_values,
        }
    }

    /// Position inside the target field addressed by `index`.
    pub fn resolve(&self, target: PseTarget, index: &FieldIndex) -> Result<usize> {
        let len = self.field(target).len();
        let unresolved =
            || Error::PathResolution(format!("{}[{}] does not resolve", target, index));
        let pos = match index {
            FieldIndex::Position(i) => *i,
            FieldIndex::Coordinate(coord) => {
                let h = &self.hypothesis;
                let n = h.number_of_regions();
                match (target, coord.as_slice()) {
                    (PseTarget::Hypothesis(HypothesisField::X0Values), [r]) => {
                        h.x0_indices.binary_search(r).map_err(|_| unresolved())?
                    }
                    (PseTarget::Hypothesis(HypothesisField::EValues), [r]) => {
                        h.e_indices.binary_search(r).map_err(|_| unresolved())?
                    }
                    (PseTarget::Hypothesis(HypothesisField::WValues), [i, j])
                        if *i < n && *j < n =>
                    {
                        h.w_indices
                            .binary_search(&(i * n + j))
                            .or_else(|_| h.w_indices.binary_search(&(j * n + i)))
                            .map_err(|_| unresolved())?
                    }
                    (PseTarget::Service(_), [r]) => *r,
                    _ => return Err(unresolved()),
                }
            }
        };
        if pos >= len {
            return Err(unresolved());
        }
        Ok(pos)
    }

    /// Read one element.
    pub fn read(&self, target: PseTarget, index: &FieldIndex) -> Result<f64> {
        let pos = self.resolve(target, index)?;
        Ok(self.field(target)[pos])
    }

    /// Write `values[k]` to `indices[k]` for every `k`.
    ///
    /// All indices are resolved before anything is written.
    pub fn apply(
        &mut self,
        target: PseTarget,
        indices: &[FieldIndex],
        values: &[f64],
    ) -> Result<()> {
        if indices.len() != values.len() {
            return Err(Error::PathResolution(format!(
                "{}: {} indices but {} values",
                target,
                indices.len(),
                values.len()
            )));
        }
        let positions = indices
            .iter()
            .map(|idx| self.resolve(target, idx))
            .collect::<Result<Vec<usize>>>()?;
        let field = self.field_mut(target);
        for (pos, &v) in positions.into_iter().zip(values) {
            field[pos] = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SampleState {
        let h = DiseaseHypothesis::builder(4)
            .excitability(vec![1, 3], vec![0.5, 0.7])
            .connectivity_pairs(&[(0, 2)], vec![0.2])
            .build()
            .unwrap();
        SampleState::new(h, ModelConfigurationService::new(4).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(
            PseTarget::parse("x0_values").unwrap(),
            PseTarget::Hypothesis(HypothesisField::X0Values)
        );
        assert_eq!(
            PseTarget::parse("model.configuration.service.K_unscaled").unwrap(),
            PseTarget::Service(ServiceField::KUnscaled)
        );
        assert_eq!(
            "model_configuration_service.e_values".parse::<PseTarget>().unwrap().path(),
            "model_configuration_service.e_values"
        );
        assert!(matches!(PseTarget::parse("hypothesis.name"), Err(Error::PathResolution(_))));
        assert!(PseTarget::parse("a.b.c").is_err());
    }

    #[test]
    fn test_resolve_position_and_coordinate() {
        let s = state();
        let x0 = PseTarget::Hypothesis(HypothesisField::X0Values);
        assert_eq!(s.read(x0, &FieldIndex::Position(1)).unwrap(), 0.7);
        assert_eq!(s.read(x0, &FieldIndex::Coordinate(vec![3])).unwrap(), 0.7);
        assert!(s.resolve(x0, &FieldIndex::Coordinate(vec![0])).is_err());
        assert!(s.resolve(x0, &FieldIndex::Position(2)).is_err());

        let w = PseTarget::Hypothesis(HypothesisField::WValues);
        assert_eq!(s.read(w, &FieldIndex::Coordinate(vec![2, 0])).unwrap(), 0.2);

        let k = PseTarget::Service(ServiceField::KUnscaled);
        assert_eq!(s.resolve(k, &FieldIndex::Coordinate(vec![3])).unwrap(), 3);
        assert!(s.resolve(k, &FieldIndex::Coordinate(vec![4])).is_err());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut s = state();
        let x0 = PseTarget::Hypothesis(HypothesisField::X0Values);
        let err = s
            .apply(x0, &[FieldIndex::Position(0), FieldIndex::Position(9)], &[0.1, 0.2])
            .unwrap_err();
        assert!(matches!(err, Error::PathResolution(_)));
        assert_eq!(s.hypothesis.x0_values(), &[0.5, 0.7]);

        s.apply(x0, &[FieldIndex::Position(0)], &[0.1]).unwrap();
        assert_eq!(s.hypothesis.x0_values(), &[0.1, 0.7]);
    }

    #[test]
    fn test_serde_as_path_strings() {
        let t: PseTarget = serde_json::from_str("\"hypothesis.e_values\"").unwrap();
        assert_eq!(t, PseTarget::Hypothesis(HypothesisField::EValues));
        let idx: Vec<FieldIndex> = serde_json::from_str("[0, [1, 2]]").unwrap();
        assert_eq!(idx, vec![FieldIndex::Position(0), FieldIndex::Coordinate(vec![1, 2])]);
    }
}
