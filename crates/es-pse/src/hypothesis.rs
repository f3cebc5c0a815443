//! Structural connectivity and disease hypotheses.

use std::collections::BTreeSet;

use es_core::{Error, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Structural connectivity of `n` brain regions.
#[derive(Debug, Clone, PartialEq)]
pub struct Connectivity {
    weights: DMatrix<f64>,
    region_labels: Vec<String>,
}

impl Connectivity {
    /// Square weight matrix plus one label per region (empty labels → `"0"`, `"1"`, ...).
    pub fn new(weights: DMatrix<f64>, region_labels: Vec<String>) -> Result<Self> {
        if weights.nrows() != weights.ncols() || weights.nrows() == 0 {
            return Err(Error::Validation(format!(
                "connectivity weights must be a non-empty square matrix, got {}x{}",
                weights.nrows(),
                weights.ncols()
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::Validation("connectivity weights must be finite".to_string()));
        }
        let n = weights.nrows();
        let region_labels = if region_labels.is_empty() {
            (0..n).map(|i| i.to_string()).collect()
        } else if region_labels.len() == n {
            region_labels
        } else {
            return Err(Error::Validation(format!(
                "{} region labels for {} regions",
                region_labels.len(),
                n
            )));
        };
        Ok(Self { weights, region_labels })
    }

    /// Build from row vectors.
    pub fn from_rows(rows: &[Vec<f64>], region_labels: Vec<String>) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().position(|r| r.len() != n) {
            return Err(Error::Validation(format!(
                "connectivity row {} has {} entries, expected {}",
                bad,
                rows[bad].len(),
                n
            )));
        }
        let weights = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(weights, region_labels)
    }

    /// Number of regions.
    pub fn number_of_regions(&self) -> usize {
        self.weights.nrows()
    }

    /// Raw weights.
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Region labels.
    pub fn region_labels(&self) -> &[String] {
        &self.region_labels
    }

    /// Label of region `i`.
    pub fn region_label(&self, i: usize) -> Option<&str> {
        self.region_labels.get(i).map(String::as_str)
    }

    /// Weights without self-connections, scaled by their 95th percentile and clipped at 1.
    pub fn normalized_weights(&self) -> DMatrix<f64> {
        let mut w = self.weights.clone();
        w.fill_diagonal(0.0);
        let p95 = percentile(w.as_slice(), 95.0);
        if p95 > 0.0 {
            w.apply(|x| *x = (*x / p95).min(1.0));
        }
        w
    }
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// One group of a hypothesis: indices sharing values (a single value broadcasts).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HypothesisGroup {
    /// Region indices (or linear connectivity indices).
    pub indices: Vec<usize>,
    /// One value per index, or a single value for all.
    pub values: Vec<f64>,
}

impl HypothesisGroup {
    /// Group from indices and values.
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        Self { indices, values }
    }
}

/// Flatten groups to `(indices, values)` sorted by index.
fn sort_disease_indices_values(
    what: &str,
    groups: &[HypothesisGroup],
    limit: usize,
) -> Result<(Vec<usize>, Vec<f64>)> {
    let mut pairs: Vec<(usize, f64)> = Vec::new();
    for g in groups {
        let n = g.indices.len();
        let values: Vec<f64> = if g.values.len() == n {
            g.values.clone()
        } else if g.values.len() == 1 && n > 1 {
            vec![g.values[0]; n]
        } else {
            return Err(Error::Validation(format!(
                "{} hypothesis: length of disease indices {} and values {} do not match",
                what,
                n,
                g.values.len()
            )));
        };
        pairs.extend(g.indices.iter().copied().zip(values));
    }
    pairs.sort_by_key(|(i, _)| *i);
    if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(Error::Validation(format!("{} hypothesis: duplicate index {}", what, w[0].0)));
    }
    if let Some((i, _)) = pairs.iter().find(|(i, _)| *i >= limit) {
        return Err(Error::Validation(format!(
            "{} hypothesis: index {} out of range (< {})",
            what, i, limit
        )));
    }
    if let Some((i, v)) = pairs.iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::Validation(format!(
            "{} hypothesis: non-finite value {} at {}",
            what, v, i
        )));
    }
    Ok(pairs.into_iter().unzip())
}

/// Which brain regions have altered excitability (`x0`), epileptogenicity (`e`) or
/// connectivity (`w`), as index → value maps.
///
/// `w_indices` are row-major linear indices into the `n × n` connectivity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseHypothesis {
    name: String,
    kind: String,
    n_regions: usize,
    pub(crate) x0_indices: Vec<usize>,
    pub(crate) x0_values: Vec<f64>,
    pub(crate) e_indices: Vec<usize>,
    pub(crate) e_values: Vec<f64>,
    pub(crate) w_indices: Vec<usize>,
    pub(crate) w_values: Vec<f64>,
    propagation_indices: Vec<usize>,
    propagation_strengths: Vec<f64>,
}

/// Builder for [`DiseaseHypothesis`].
#[derive(Debug, Clone, Default)]
pub struct HypothesisBuilder {
    n_regions: usize,
    name: Option<String>,
    excitability: Vec<HypothesisGroup>,
    epileptogenicity: Vec<HypothesisGroup>,
    connectivity: Vec<HypothesisGroup>,
    propagation_indices: Vec<usize>,
    propagation_strengths: Vec<f64>,
    invalid_pair: Option<(usize, usize)>,
}

impl HypothesisBuilder {
    /// Explicit name (default `<kind>_Hypothesis`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an excitability group.
    pub fn excitability(mut self, indices: Vec<usize>, values: Vec<f64>) -> Self {
        self.excitability.push(HypothesisGroup::new(indices, values));
        self
    }

    /// Add an epileptogenicity group.
    pub fn epileptogenicity(mut self, indices: Vec<usize>, values: Vec<f64>) -> Self {
        self.epileptogenicity.push(HypothesisGroup::new(indices, values));
        self
    }

    /// Add a connectivity group by linear indices.
    pub fn connectivity(mut self, linear_indices: Vec<usize>, values: Vec<f64>) -> Self {
        self.connectivity.push(HypothesisGroup::new(linear_indices, values));
        self
    }

    /// Add a connectivity group by `(i, j)` region pairs.
    ///
    /// A pair outside the region range is reported by [`HypothesisBuilder::build`].
    pub fn connectivity_pairs(mut self, pairs: &[(usize, usize)], values: Vec<f64>) -> Self {
        let n = self.n_regions;
        if let Some(&pair) = pairs.iter().find(|&&(i, j)| i >= n || j >= n) {
            self.invalid_pair.get_or_insert(pair);
            return self;
        }
        let linear = pairs.iter().map(|&(i, j)| i * n + j).collect();
        self.connectivity(linear, values)
    }

    /// Add whole groups.
    pub fn groups(
        mut self,
        excitability: &[HypothesisGroup],
        epileptogenicity: &[HypothesisGroup],
        connectivity: &[HypothesisGroup],
    ) -> Self {
        self.excitability.extend_from_slice(excitability);
        self.epileptogenicity.extend_from_slice(epileptogenicity);
        self.connectivity.extend_from_slice(connectivity);
        self
    }

    /// Propagation indices and per-region strengths.
    pub fn propagation(mut self, indices: Vec<usize>, strengths: Vec<f64>) -> Self {
        self.propagation_indices = indices;
        self.propagation_strengths = strengths;
        self
    }

    /// Validate and sort.
    pub fn build(self) -> Result<DiseaseHypothesis> {
        let n = self.n_regions;
        if n == 0 {
            return Err(Error::Validation("hypothesis needs at least one region".to_string()));
        }
        if let Some((i, j)) = self.invalid_pair {
            return Err(Error::Validation(format!(
                "connectivity pair ({}, {}) out of range for {} regions",
                i, j, n
            )));
        }
        let (x0_indices, x0_values) =
            sort_disease_indices_values("excitability", &self.excitability, n)?;
        let (e_indices, e_values) =
            sort_disease_indices_values("epileptogenicity", &self.epileptogenicity, n)?;
        let (w_indices, w_values) =
            sort_disease_indices_values("connectivity", &self.connectivity, n * n)?;
        if let Some(i) = self.propagation_indices.iter().find(|&&i| i >= n) {
            return Err(Error::Validation(format!("propagation index {} out of range", i)));
        }

        let mut kinds = Vec::new();
        if !x0_indices.is_empty() {
            kinds.push("Excitability");
        }
        if !e_indices.is_empty() {
            kinds.push("Epileptogenicity");
        }
        if !w_indices.is_empty() {
            kinds.push("Connectivity");
        }
        let kind = kinds.join("_");
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => format!("{}_Hypothesis", kind),
        };

        Ok(DiseaseHypothesis {
            name,
            kind,
            n_regions: n,
            x0_indices,
            x0_values,
            e_indices,
            e_values,
            w_indices,
            w_values,
            propagation_indices: self.propagation_indices,
            propagation_strengths: self.propagation_strengths,
        })
    }
}

impl DiseaseHypothesis {
    /// Start a hypothesis over `n_regions` regions.
    pub fn builder(n_regions: usize) -> HypothesisBuilder {
        HypothesisBuilder { n_regions, ..Default::default() }
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Excitability_Epileptogenicity_Connectivity` subset, `_`-joined.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Number of regions.
    pub fn number_of_regions(&self) -> usize {
        self.n_regions
    }

    /// Regions with an excitability hypothesis (sorted).
    pub fn x0_indices(&self) -> &[usize] {
        &self.x0_indices
    }

    /// Excitability values, aligned with [`Self::x0_indices`].
    pub fn x0_values(&self) -> &[f64] {
        &self.x0_values
    }

    /// Regions with an epileptogenicity hypothesis (sorted).
    pub fn e_indices(&self) -> &[usize] {
        &self.e_indices
    }

    /// Epileptogenicity values.
    pub fn e_values(&self) -> &[f64] {
        &self.e_values
    }

    /// Linear connectivity indices (sorted).
    pub fn w_indices(&self) -> &[usize] {
        &self.w_indices
    }

    /// Connectivity values.
    pub fn w_values(&self) -> &[f64] {
        &self.w_values
    }

    /// `(i, j)` of a linear connectivity index.
    pub fn w_coordinate(&self, linear: usize) -> (usize, usize) {
        (linear / self.n_regions, linear % self.n_regions)
    }

    /// Propagation indices.
    pub fn propagation_indices(&self) -> &[usize] {
        &self.propagation_indices
    }

    /// Propagation strengths.
    pub fn propagation_strengths(&self) -> &[f64] {
        &self.propagation_strengths
    }

    /// Union of excitability and epileptogenicity regions.
    pub fn regions_disease_indices(&self) -> Vec<usize> {
        let set: BTreeSet<usize> =
            self.x0_indices.iter().chain(self.e_indices.iter()).copied().collect();
        set.into_iter().collect()
    }

    /// Regions without an excitability or epileptogenicity hypothesis.
    pub fn healthy_indices(&self) -> Vec<usize> {
        let disease: BTreeSet<usize> = self.regions_disease_indices().into_iter().collect();
        (0..self.n_regions).filter(|i| !disease.contains(i)).collect()
    }

    /// Regions touched by a connectivity hypothesis.
    pub fn connectivity_regions_disease_indices(&self) -> Vec<usize> {
        let set: BTreeSet<usize> = self
            .w_indices
            .iter()
            .flat_map(|&l| {
                let (i, j) = self.w_coordinate(l);
                [i, j]
            })
            .collect();
        set.into_iter().collect()
    }

    /// Per-region disease values (zero where undefined; epileptogenicity wins over excitability).
    pub fn regions_disease(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.n_regions];
        for (&i, &v) in self.x0_indices.iter().zip(&self.x0_values) {
            out[i] = v;
        }
        for (&i, &v) in self.e_indices.iter().zip(&self.e_values) {
            out[i] = v;
        }
        out
    }

    /// Symmetric connectivity scaling (ones where undefined).
    pub fn connectivity_disease(&self) -> DMatrix<f64> {
        let mut m = DMatrix::from_element(self.n_regions, self.n_regions, 1.0);
        for (&l, &v) in self.w_indices.iter().zip(&self.w_values) {
            let (i, j) = self.w_coordinate(l);
            m[(i, j)] = v;
            m[(j, i)] = v;
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hypothesis_sorted_and_named() {
        let h = DiseaseHypothesis::builder(5)
            .excitability(vec![3, 1], vec![0.6, 0.2])
            .epileptogenicity(vec![4], vec![0.9])
            .build()
            .unwrap();
        assert_eq!(h.x0_indices(), &[1, 3]);
        assert_eq!(h.x0_values(), &[0.2, 0.6]);
        assert_eq!(h.kind(), "Excitability_Epileptogenicity");
        assert_eq!(h.name(), "Excitability_Epileptogenicity_Hypothesis");
        assert_eq!(h.regions_disease_indices(), vec![1, 3, 4]);
        assert_eq!(h.healthy_indices(), vec![0, 2]);
        assert_eq!(h.regions_disease(), vec![0.0, 0.2, 0.0, 0.6, 0.9]);
    }

    #[test]
    fn test_single_value_broadcasts() {
        let h = DiseaseHypothesis::builder(4).excitability(vec![0, 2], vec![0.5]).build().unwrap();
        assert_eq!(h.x0_values(), &[0.5, 0.5]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = DiseaseHypothesis::builder(4)
            .excitability(vec![0, 1, 2], vec![0.1, 0.2])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(DiseaseHypothesis::builder(2).excitability(vec![5], vec![0.1]).build().is_err());
        assert!(
            DiseaseHypothesis::builder(3)
                .excitability(vec![1], vec![0.1])
                .excitability(vec![1], vec![0.2])
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_connectivity_pairs_out_of_range() {
        for pair in [(0, 4), (3, 0), (usize::MAX, 1)] {
            let err = DiseaseHypothesis::builder(3)
                .connectivity_pairs(&[(0, 1), pair], vec![0.5])
                .build()
                .unwrap_err();
            assert!(matches!(err, Error::Validation(m) if m.contains("out of range")));
        }
        let h =
            DiseaseHypothesis::builder(3).connectivity_pairs(&[(2, 1)], vec![0.5]).build().unwrap();
        assert_eq!(h.w_indices(), &[7]);
        assert_eq!(h.w_coordinate(7), (2, 1));
    }

    #[test]
    fn test_connectivity_disease_symmetric() {
        let h = DiseaseHypothesis::builder(3)
            .connectivity_pairs(&[(0, 2)], vec![0.3])
            .name("w")
            .build()
            .unwrap();
        assert_eq!(h.w_indices(), &[2]);
        let m = h.connectivity_disease();
        assert_eq!(m[(0, 2)], 0.3);
        assert_eq!(m[(2, 0)], 0.3);
        assert_eq!(m[(1, 1)], 1.0);
        assert_eq!(h.connectivity_regions_disease_indices(), vec![0, 2]);
        assert_eq!(h.name(), "w");
    }

    #[test]
    fn test_normalized_weights() {
        let rows = vec![vec![5.0, 1.0, 2.0], vec![1.0, 5.0, 4.0], vec![2.0, 4.0, 5.0]];
        let c = Connectivity::from_rows(&rows, vec![]).unwrap();
        let w = c.normalized_weights();
        assert_eq!(w[(0, 0)], 0.0);
        // Off-diagonal sorted: 0,0,0,1,1,2,2,4,4 -> p95 at rank 7.6 = 4.
        assert_relative_eq!(w[(0, 1)], 0.25);
        assert_relative_eq!(w[(1, 2)], 1.0);
        assert_eq!(c.region_label(2), Some("2"));
    }

    #[test]
    fn test_connectivity_rejects_non_square() {
        assert!(Connectivity::from_rows(&[vec![1.0, 2.0]], vec![]).is_err());
        assert!(Connectivity::from_rows(&[vec![1.0]], vec!["a".into(), "b".into()]).is_err());
    }
}
