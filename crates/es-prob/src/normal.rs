//! Normal distribution utilities.

use es_core::{Error, Result};

use crate::moments::{ClosedForm, Location, MomentTarget};

/// Natural log of `sqrt(2π)`.
pub(crate) const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

pub(crate) fn validate(mu: f64, sigma: f64) -> Result<()> {
    if !mu.is_finite() {
        return Err(Error::Validation(format!("mu must be finite, got {}", mu)));
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::Validation(format!("sigma must be finite and > 0, got {}", sigma)));
    }
    Ok(())
}

/// Log-PDF of a Normal distribution `N(mu, sigma)` at `x`.
///
/// `log p(x) = -0.5 * ((x-mu)/sigma)^2 - ln(sigma) - ln(sqrt(2π))`
pub fn logpdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    validate(mu, sigma)?;
    let z = (x - mu) / sigma;
    Ok(-0.5 * z * z - sigma.ln() - LN_SQRT_2PI)
}

pub(crate) fn closed_form(mu: f64, sigma: f64) -> ClosedForm {
    ClosedForm {
        mean: Some(mu),
        median: Some(mu),
        mode: Some(mu),
        var: Some(sigma * sigma),
        skew: Some(0.0),
        kurt: Some(0.0),
    }
}

pub(crate) fn match_moments(target: &MomentTarget) -> Result<(f64, f64)> {
    let mu = match target.location {
        Location::Mean(m) | Location::Mode(m) => m,
    };
    Ok((mu, target.std))
}
