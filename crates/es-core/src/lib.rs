//! # es-core
//!
//! Shared building blocks for EpiStat:
//! - the [`Error`] type and [`Result`] alias used by every library crate
//! - [`Shape`], the tensor shape of a stochastic parameter or a mutable field
//! - the [`traits::ParameterSpace`] abstraction implemented by parameter sets and priors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::Shape;

/// Workspace version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
