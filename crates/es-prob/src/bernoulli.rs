//! Bernoulli distribution utilities.

use es_core::{Error, Result};

use crate::moments::{ClosedForm, Location, MomentTarget, check_implied_std, non_matchable};

pub(crate) fn validate(p: f64) -> Result<()> {
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return Err(Error::Validation(format!("p must lie in (0, 1), got {}", p)));
    }
    Ok(())
}

/// Log-PMF of Bernoulli(y | p), `y` in {0, 1}.
pub fn logpmf(y: u8, p: f64) -> Result<f64> {
    validate(p)?;
    match y {
        0 => Ok((-p).ln_1p()),
        1 => Ok(p.ln()),
        _ => Err(Error::Validation(format!("y must be 0 or 1, got {}", y))),
    }
}

pub(crate) fn closed_form(p: f64) -> ClosedForm {
    let q = 1.0 - p;
    let pq = p * q;
    let (median, mode) = if p < 0.5 {
        (0.0, Some(0.0))
    } else if p > 0.5 {
        (1.0, Some(1.0))
    } else {
        (0.5, None)
    };
    ClosedForm {
        mean: Some(p),
        median: Some(median),
        mode,
        var: Some(pq),
        skew: Some((q - p) / pq.sqrt()),
        kurt: Some((1.0 - 6.0 * pq) / pq),
    }
}

pub(crate) fn match_moments(target: &MomentTarget) -> Result<f64> {
    match target.location {
        Location::Mean(p) if 0.0 < p && p < 1.0 => {
            check_implied_std("bernoulli", (p * (1.0 - p)).sqrt(), target.std)?;
            Ok(p)
        }
        Location::Mean(p) => {
            Err(non_matchable("bernoulli", format!("mean must lie in (0, 1), got {}", p)))
        }
        Location::Mode(_) => Err(non_matchable("bernoulli", "mode does not fix p")),
    }
}
