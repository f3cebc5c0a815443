//! Uniform distribution utilities.

use es_core::{Error, Result};

use crate::moments::{ClosedForm, Location, MomentTarget, non_matchable};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

pub(crate) fn validate(a: f64, b: f64) -> Result<()> {
    if !a.is_finite() || !b.is_finite() || a >= b {
        return Err(Error::Validation(format!(
            "uniform bounds must be finite with a < b, got a={} b={}",
            a, b
        )));
    }
    Ok(())
}

/// Log-PDF of `Uniform(a, b)` at `x`.
pub fn logpdf(x: f64, a: f64, b: f64) -> Result<f64> {
    validate(a, b)?;
    if x < a || x > b {
        return Ok(f64::NEG_INFINITY);
    }
    Ok(-(b - a).ln())
}

pub(crate) fn closed_form(a: f64, b: f64) -> ClosedForm {
    let mid = 0.5 * (a + b);
    let w = b - a;
    ClosedForm {
        mean: Some(mid),
        median: Some(mid),
        // Every point of the support is a mode.
        mode: None,
        var: Some(w * w / 12.0),
        skew: Some(0.0),
        kurt: Some(-1.2),
    }
}

/// `(a, b)` with the requested mean and std.
pub(crate) fn match_moments(target: &MomentTarget) -> Result<(f64, f64)> {
    match target.location {
        Location::Mean(m) => {
            let half = SQRT_3 * target.std;
            Ok((m - half, m + half))
        }
        Location::Mode(_) => Err(non_matchable("uniform", "the uniform mode is not unique")),
    }
}
