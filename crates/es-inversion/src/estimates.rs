//! Reassembly of flattened fitting estimates into arrays.
//!
//! Fitting backends report multi-dimensional parameters element by element under
//! dotted names: `p` (scalar), `p.3` (vector), `p.2.3` (matrix), `p.1.2.3`
//! (3-tensor). The index base is explicit; deeper names are rejected.

use std::collections::BTreeMap;

use es_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of index components in a flattened name.
pub const MAX_INDEX_DEPTH: usize = 3;

/// First index of each axis in flattened names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBase {
    /// `p.0` is the first element.
    Zero,
    /// `p.1` is the first element (Stan convention).
    #[default]
    One,
}

/// Flat output of a fitting backend: one entry per named element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatEstimates {
    /// Element names (`p`, `p.i`, `p.i.j`, `p.i.j.k`).
    pub names: Vec<String>,
    /// Point estimate of each element.
    pub values: Vec<f64>,
    /// Draws of each element; empty when the fit produced none.
    #[serde(default)]
    pub draws: Vec<Vec<f64>>,
}

impl FlatEstimates {
    /// Point estimates without draws.
    pub fn points(names: Vec<String>, values: Vec<f64>) -> Self {
        Self { names, values, draws: Vec::new() }
    }
}

/// Row-major array of one reassembled parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate<T> {
    /// Dimensions (`[]` for scalars).
    pub dims: Vec<usize>,
    /// Elements, row-major.
    pub values: Vec<T>,
}

impl<T> Estimate<T> {
    /// Element at a zero-based multi-index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut linear = 0usize;
        for (&i, &d) in index.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            linear = linear * d + i;
        }
        self.values.get(linear)
    }

    /// Scalar value.
    pub fn scalar(&self) -> Option<&T> {
        if self.dims.is_empty() { self.values.first() } else { None }
    }
}

/// Reassembled estimates.
///
/// `point["p"]` holds the point estimate of `p`; `draws["p_s"]` its draws.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Estimates {
    /// Point estimates by parameter name.
    pub point: BTreeMap<String, Estimate<f64>>,
    /// Per-element draws keyed `<name>_s`.
    pub draws: BTreeMap<String, Estimate<Vec<f64>>>,
}

impl Estimates {
    /// Point estimate of `name`.
    pub fn get(&self, name: &str) -> Option<&Estimate<f64>> {
        self.point.get(name)
    }

    /// Draws of `name`.
    pub fn samples(&self, name: &str) -> Option<&Estimate<Vec<f64>>> {
        self.draws.get(&samples_key(name))
    }

    /// Parameter names.
    pub fn names(&self) -> Vec<&str> {
        self.point.keys().map(String::as_str).collect()
    }
}

/// Key of the draws of `name`.
pub fn samples_key(name: &str) -> String {
    format!("{}_s", name)
}

/// Split `p.2.3` into `("p", [1, 2])` under one-based indexing.
pub fn parse_flat_name(name: &str, base: IndexBase) -> Result<(String, Vec<usize>)> {
    let mut parts = name.split('.');
    let head = parts.next().unwrap_or_default();
    if head.is_empty() {
        return Err(Error::Estimates(format!(
            "estimate name `{}` has an empty parameter name",
            name
        )));
    }
    let index = parts
        .map(|part| {
            let i: usize = part.parse().map_err(|_| {
                Error::Estimates(format!("estimate name `{}`: `{}` is not an index", name, part))
            })?;
            match base {
                IndexBase::Zero => Ok(i),
                IndexBase::One => i.checked_sub(1).ok_or_else(|| {
                    Error::Estimates(format!(
                        "estimate name `{}`: index 0 under one-based indexing",
                        name
                    ))
                }),
            }
        })
        .collect::<Result<Vec<usize>>>()?;
    if index.len() > MAX_INDEX_DEPTH {
        return Err(Error::Estimates(format!(
            "estimate name `{}` has {} indices, at most {} are supported",
            name,
            index.len(),
            MAX_INDEX_DEPTH
        )));
    }
    Ok((head.to_string(), index))
}

/// Elements of one parameter: `(multi-index, flat position)`.
type Group = Vec<(Vec<usize>, usize)>;

/// Reassemble flat estimates into per-parameter arrays.
///
/// Every parameter must use one index depth and cover its bounding box exactly:
/// duplicates and holes are errors.
pub fn reassemble(flat: &FlatEstimates, base: IndexBase) -> Result<Estimates> {
    if flat.values.len() != flat.names.len() {
        return Err(Error::Estimates(format!(
            "{} names but {} values",
            flat.names.len(),
            flat.values.len()
        )));
    }
    if !flat.draws.is_empty() && flat.draws.len() != flat.names.len() {
        return Err(Error::Estimates(format!(
            "{} names but {} draw columns",
            flat.names.len(),
            flat.draws.len()
        )));
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for (pos, name) in flat.names.iter().enumerate() {
        let (param, index) = parse_flat_name(name, base)?;
        groups.entry(param).or_default().push((index, pos));
    }

    let mut out = Estimates::default();
    for (param, elems) in groups {
        let (dims, order) = layout(&param, &elems)?;
        let point = order.iter().map(|&pos| flat.values[pos]).collect();
        if !flat.draws.is_empty() {
            let draws = order.iter().map(|&pos| flat.draws[pos].clone()).collect();
            out.draws.insert(samples_key(&param), Estimate { dims: dims.clone(), values: draws });
        }
        out.point.insert(param, Estimate { dims, values: point });
    }
    log::debug!(
        "reassembled {} parameters from {} flat estimates",
        out.point.len(),
        flat.names.len()
    );
    Ok(out)
}

/// Dimensions and the flat position of each row-major element.
fn layout(param: &str, elems: &Group) -> Result<(Vec<usize>, Vec<usize>)> {
    let depth = elems[0].0.len();
    if elems.iter().any(|(idx, _)| idx.len() != depth) {
        return Err(Error::Estimates(format!("parameter `{}` mixes index depths", param)));
    }
    let too_large = || {
        Error::Estimates(format!(
            "parameter `{}`: indices span more positions than its {} elements, leaving holes",
            param,
            elems.len()
        ))
    };
    let dims = (0..depth)
        .map(|axis| {
            let max = elems.iter().map(|(idx, _)| idx[axis]).max().unwrap_or(0);
            max.checked_add(1).ok_or_else(too_large)
        })
        .collect::<Result<Vec<usize>>>()?;
    let size = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)).ok_or_else(too_large)?;
    // A box larger than the element count must contain holes.
    if size > elems.len() {
        return Err(too_large());
    }

    let mut order: Vec<Option<usize>> = vec![None; size];
    for (idx, pos) in elems {
        let linear = idx.iter().zip(&dims).fold(0usize, |acc, (&i, &d)| acc * d + i);
        if order[linear].replace(*pos).is_some() {
            return Err(Error::Estimates(format!(
                "parameter `{}`: duplicate element {:?}",
                param, idx
            )));
        }
    }
    let order = order
        .into_iter()
        .enumerate()
        .map(|(linear, pos)| {
            pos.ok_or_else(|| {
                Error::Estimates(format!(
                    "parameter `{}` of dims {:?} is missing element {} (row-major)",
                    param, dims, linear
                ))
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    Ok((dims, order))
}
