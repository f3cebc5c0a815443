//! Moment containers and moment-matching targets.

use std::collections::BTreeMap;

use es_core::{Error, Result};
use serde::Serialize;

/// Fully defined moments of a distribution.
///
/// `kurt` is the excess kurtosis (0 for a normal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    /// Mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Mode.
    pub mode: f64,
    /// Variance.
    pub var: f64,
    /// Standard deviation.
    pub std: f64,
    /// Skewness.
    pub skew: f64,
    /// Excess kurtosis.
    pub kurt: f64,
}

/// Moments where each entry may be undefined (`None`) for the variant/parameters.
///
/// Used for reporting; [`Moments`] is the strict counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MomentSummary {
    /// Mean.
    pub mean: Option<f64>,
    /// Median.
    pub median: Option<f64>,
    /// Mode.
    pub mode: Option<f64>,
    /// Variance.
    pub var: Option<f64>,
    /// Standard deviation.
    pub std: Option<f64>,
    /// Skewness.
    pub skew: Option<f64>,
    /// Excess kurtosis.
    pub kurt: Option<f64>,
}

/// Closed-form moments as produced by the per-variant modules.
///
/// `median: None` means "no closed form": the caller falls back to the quantile at 0.5.
/// Every other `None` means the moment is undefined.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClosedForm {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<f64>,
    pub var: Option<f64>,
    pub skew: Option<f64>,
    pub kurt: Option<f64>,
}

/// Location anchor of a moment-matching target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Match the mean.
    Mean(f64),
    /// Match the mode.
    Mode(f64),
}

/// Target for moment matching: a location (mean or mode) and a standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomentTarget {
    /// Mean or mode to reproduce.
    pub location: Location,
    /// Standard deviation to reproduce.
    pub std: f64,
}

impl MomentTarget {
    /// Target `(mean, std)`.
    pub fn mean_std(mean: f64, std: f64) -> Self {
        Self { location: Location::Mean(mean), std }
    }

    /// Target `(mode, std)`.
    pub fn mode_std(mode: f64, std: f64) -> Self {
        Self { location: Location::Mode(mode), std }
    }

    /// Read a target from keyword-style parameters: `std` plus exactly one of `mean`/`mode`.
    pub fn from_kwargs(kwargs: &BTreeMap<String, f64>) -> Result<Self> {
        let std = *kwargs
            .get("std")
            .ok_or_else(|| Error::Validation("moment target requires `std`".to_string()))?;
        let location = match (kwargs.get("mean"), kwargs.get("mode")) {
            (Some(&m), None) => Location::Mean(m),
            (None, Some(&m)) => Location::Mode(m),
            (Some(_), Some(_)) => {
                return Err(Error::Validation(
                    "moment target takes either `mean` or `mode`, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(Error::Validation(
                    "moment target requires `mean` or `mode`".to_string(),
                ));
            }
        };
        if let Some(extra) =
            kwargs.keys().find(|k| !matches!(k.as_str(), "std" | "mean" | "mode"))
        {
            return Err(Error::Validation(format!("unexpected moment target key `{}`", extra)));
        }
        let target = Self { location, std };
        target.validate()?;
        Ok(target)
    }

    /// Finite location, finite positive std.
    pub fn validate(&self) -> Result<()> {
        let loc = match self.location {
            Location::Mean(v) | Location::Mode(v) => v,
        };
        if !loc.is_finite() {
            return Err(Error::Validation(format!("target location must be finite, got {}", loc)));
        }
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(Error::Validation(format!(
                "target std must be finite and > 0, got {}",
                self.std
            )));
        }
        Ok(())
    }
}

pub(crate) fn non_matchable(variant: &str, reason: impl Into<String>) -> Error {
    Error::NonMatchableMoments { variant: variant.to_string(), reason: reason.into() }
}

/// One-parameter families are fixed by their location; the std has to agree.
pub(crate) fn check_implied_std(variant: &str, implied: f64, requested: f64) -> Result<()> {
    if crate::math::rel_close(requested, implied, crate::math::STD_CONSISTENCY_RTOL) {
        Ok(())
    } else {
        Err(non_matchable(
            variant,
            format!("location fixes std = {}, requested std = {}", implied, requested),
        ))
    }
}
