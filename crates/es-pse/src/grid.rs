//! Grid-mode parameter sets: equally spaced values instead of random draws.

use es_core::{Error, Result};
use es_prob::math::linspace;
use serde::{Deserialize, Serialize};

use crate::params::{PseParameter, PseParameterSet, PseSamples};
use crate::target::{FieldIndex, PseTarget, SampleState};

/// Inclusive, equally spaced values over `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// First value.
    pub low: f64,
    /// Last value.
    pub high: f64,
    /// Number of values.
    pub n_points: usize,
}

impl GridSpec {
    /// Validated grid.
    pub fn new(low: f64, high: f64, n_points: usize) -> Result<Self> {
        let g = Self { low, high, n_points };
        g.validate()?;
        Ok(g)
    }

    fn validate(&self) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low > self.high {
            return Err(Error::Validation(format!(
                "grid bounds must be finite with low <= high, got [{}, {}]",
                self.low, self.high
            )));
        }
        if self.n_points == 0 {
            return Err(Error::Validation("grid needs at least one point".to_string()));
        }
        Ok(())
    }

    /// The grid values.
    pub fn points(&self) -> Vec<f64> {
        linspace(self.low, self.high, self.n_points)
    }
}

/// How grid axes combine into sample rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Full cartesian product; the last axis varies fastest.
    #[default]
    CrossProduct,
    /// One axis at a time; the other axes stay at their base values.
    OneAtATime,
}

/// One grid axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    /// Display name.
    pub name: String,
    /// Field written.
    #[serde(rename = "path")]
    pub target: PseTarget,
    /// Elements written (all get the same grid value).
    pub indices: Vec<FieldIndex>,
    /// Values.
    #[serde(flatten)]
    pub grid: GridSpec,
}

/// Enumerate grid rows as a parameter set.
///
/// `base` supplies the values of the axes a `OneAtATime` row does not vary.
pub fn grid_parameter_set(
    axes: &[GridAxis],
    mode: GridMode,
    base: &SampleState,
) -> Result<PseParameterSet> {
    if axes.is_empty() {
        return Err(Error::Validation("grid mode needs at least one axis".to_string()));
    }
    for axis in axes {
        axis.grid.validate()?;
    }
    let points: Vec<Vec<f64>> = axes.iter().map(|a| a.grid.points()).collect();

    let columns: Vec<Vec<Vec<f64>>> = match mode {
        GridMode::CrossProduct => {
            let total = points.iter().try_fold(1usize, |acc, p| acc.checked_mul(p.len()));
            let total = total.ok_or_else(|| {
                Error::Validation("grid cross product overflows the sample count".to_string())
            })?;
            let mut cols: Vec<Vec<Vec<f64>>> =
                axes.iter().map(|_| Vec::with_capacity(total)).collect();
            for row in 0..total {
                let mut rest = row;
                for k in (0..axes.len()).rev() {
                    let n = points[k].len();
                    cols[k].push(vec![points[k][rest % n]; axes[k].indices.len()]);
                    rest /= n;
                }
            }
            cols
        }
        GridMode::OneAtATime => {
            let base_values = axes
                .iter()
                .map(|a| {
                    let values = a.indices.iter().map(|idx| base.read(a.target, idx));
                    values.collect::<Result<Vec<f64>>>()
                })
                .collect::<Result<Vec<Vec<f64>>>>()?;
            let total: usize = points.iter().map(Vec::len).sum();
            let mut cols: Vec<Vec<Vec<f64>>> =
                axes.iter().map(|_| Vec::with_capacity(total)).collect();
            for (varied, pts) in points.iter().enumerate() {
                for &v in pts {
                    for (k, col) in cols.iter_mut().enumerate() {
                        if k == varied {
                            col.push(vec![v; axes[k].indices.len()]);
                        } else {
                            col.push(base_values[k].clone());
                        }
                    }
                }
            }
            cols
        }
    };

    let entries = axes
        .iter()
        .zip(columns)
        .map(|(a, rows)| {
            let samples = PseSamples::PerIndex(rows);
            PseParameter::new(a.name.clone(), a.target, a.indices.clone(), samples)
        })
        .collect::<Result<Vec<_>>>()?;
    let set = PseParameterSet::new(entries)?;
    log::debug!("grid {:?}: {} axes, {} rows", mode, axes.len(), set.n_samples());
    Ok(set)
}
