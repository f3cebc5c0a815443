//! Common data types for EpiStat

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tensor shape of a parameter or a mutable field.
///
/// `[]` is a scalar, `[n]` a per-region vector, `[n, n]` a pairwise matrix.
/// Every dimension must be positive. Layout is row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a shape, rejecting zero-length dimensions.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(Error::Validation(format!(
                "shape dimensions must be positive, got {:?} (axis {})",
                dims, pos
            )));
        }
        Ok(Self(dims))
    }

    /// Scalar shape `()`.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    /// Vector shape `(n,)`.
    pub fn vector(n: usize) -> Result<Self> {
        Self::new(vec![n])
    }

    /// Square matrix shape `(n, n)`.
    pub fn square(n: usize) -> Result<Self> {
        Self::new(vec![n, n])
    }

    /// Dimensions.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalars).
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Number of independent scalar elements (1 for scalars).
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Whether this is the scalar shape.
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major linear index of a coordinate.
    pub fn ravel(&self, coord: &[usize]) -> Result<usize> {
        if coord.len() != self.0.len() {
            return Err(Error::Validation(format!(
                "coordinate {:?} has {} axes, shape {:?} has {}",
                coord,
                coord.len(),
                self.0,
                self.0.len()
            )));
        }
        let mut idx = 0usize;
        for (axis, (&c, &d)) in coord.iter().zip(self.0.iter()).enumerate() {
            if c >= d {
                return Err(Error::Validation(format!(
                    "coordinate {:?} out of bounds on axis {} (dim {})",
                    coord, axis, d
                )));
            }
            idx = idx * d + c;
        }
        Ok(idx)
    }

    /// Coordinate of a row-major linear index.
    pub fn unravel(&self, mut linear: usize) -> Result<Vec<usize>> {
        if linear >= self.size() {
            return Err(Error::Validation(format!(
                "linear index {} out of bounds for shape {:?}",
                linear, self.0
            )));
        }
        let mut coord = vec![0usize; self.0.len()];
        for (slot, &d) in coord.iter_mut().zip(self.0.iter()).rev() {
            *slot = linear % d;
            linear /= d;
        }
        Ok(coord)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "()"),
            [n] => write!(f, "({},)", n),
            dims => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}
