//! Core traits for EpiStat
//!
//! The PSE engine and the model-inversion factory both describe "a set of named,
//! bounded parameters". Consumers (persistence, reporting, the CLI) only depend on
//! this trait, not on the concrete collections.

use crate::Shape;

/// A named collection of bounded parameters.
pub trait ParameterSpace: Send + Sync {
    /// Number of parameters.
    fn n_parameters(&self) -> usize;

    /// Parameter names, in declaration order.
    fn parameter_names(&self) -> Vec<String>;

    /// Parameter bounds (low, high). Unbounded sides are `±inf`.
    fn parameter_bounds(&self) -> Vec<(f64, f64)>;

    /// Parameter shapes. Defaults to scalars.
    fn parameter_shapes(&self) -> Vec<Shape> {
        vec![Shape::scalar(); self.n_parameters()]
    }
}
