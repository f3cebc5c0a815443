//! Log-normal distribution utilities.
//!
//! Defined as: `ln X ~ Normal(mu, sigma)`.

use es_core::{Error, Result};

use crate::math::bisect;
use crate::moments::{ClosedForm, Location, MomentTarget, non_matchable};

pub(crate) fn validate(mu: f64, sigma: f64) -> Result<()> {
    crate::normal::validate(mu, sigma)
}

/// Log-PDF of LogNormal(mu, sigma) at `x`.
pub fn logpdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    validate(mu, sigma)?;
    if !x.is_finite() || x <= 0.0 {
        return Ok(f64::NEG_INFINITY);
    }
    let lx = x.ln();
    let lp = crate::normal::logpdf(lx, mu, sigma)?;
    Ok(lp - lx)
}

pub(crate) fn closed_form(mu: f64, sigma: f64) -> ClosedForm {
    let s2 = sigma * sigma;
    let w = s2.exp();
    ClosedForm {
        mean: Some((mu + 0.5 * s2).exp()),
        median: Some(mu.exp()),
        mode: Some((mu - s2).exp()),
        var: Some((w - 1.0) * (2.0 * mu + s2).exp()),
        skew: Some((w + 2.0) * (w - 1.0).sqrt()),
        kurt: Some(w.powi(4) + 2.0 * w.powi(3) + 3.0 * w.powi(2) - 6.0),
    }
}

/// `(mu, sigma)` reproducing the target.
///
/// From the mode, with `w = exp(sigma^2)`: `mode = exp(mu) / w` and
/// `var = (w - 1) w^3 mode^2`, so `w` solves `(w - 1) w^3 = (std / mode)^2`.
pub(crate) fn match_moments(target: &MomentTarget) -> Result<(f64, f64)> {
    match target.location {
        Location::Mean(m) => {
            if m <= 0.0 {
                return Err(non_matchable("lognormal", format!("mean must be > 0, got {}", m)));
            }
            let s2 = (1.0 + (target.std / m).powi(2)).ln();
            Ok((m.ln() - 0.5 * s2, s2.sqrt()))
        }
        Location::Mode(mode) => {
            if mode <= 0.0 {
                return Err(non_matchable("lognormal", format!("mode must be > 0, got {}", mode)));
            }
            let c = (target.std / mode).powi(2);
            let f = |w: f64| (w - 1.0) * w.powi(3) - c;
            let mut hi = 2.0;
            while f(hi) < 0.0 {
                hi *= 2.0;
                if !hi.is_finite() {
                    return Err(Error::Computation("lognormal mode matching diverged".into()));
                }
            }
            let w = bisect(f, 1.0, hi, 1e-15, 300)?;
            let s2 = w.ln();
            Ok(((mode * w).ln(), s2.sqrt()))
        }
    }
}
