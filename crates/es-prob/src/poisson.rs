//! Poisson distribution utilities.

use es_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

use crate::moments::{ClosedForm, Location, MomentTarget, check_implied_std, non_matchable};

pub(crate) fn validate(lambda: f64) -> Result<()> {
    if !lambda.is_finite() || lambda <= 0.0 {
        return Err(Error::Validation(format!("lambda must be finite and > 0, got {}", lambda)));
    }
    Ok(())
}

/// Log-PMF of Poisson(k | lambda).
pub fn logpmf(k: u64, lambda: f64) -> Result<f64> {
    validate(lambda)?;
    let kf = k as f64;
    Ok(kf * lambda.ln() - lambda - ln_gamma(kf + 1.0))
}

pub(crate) fn closed_form(lambda: f64) -> ClosedForm {
    ClosedForm {
        mean: Some(lambda),
        median: None,
        mode: Some(lambda.floor()),
        var: Some(lambda),
        skew: Some(1.0 / lambda.sqrt()),
        kurt: Some(1.0 / lambda),
    }
}

pub(crate) fn match_moments(target: &MomentTarget) -> Result<f64> {
    match target.location {
        Location::Mean(m) if m > 0.0 => {
            check_implied_std("poisson", m.sqrt(), target.std)?;
            Ok(m)
        }
        Location::Mean(m) => {
            Err(non_matchable("poisson", format!("mean must be > 0, got {}", m)))
        }
        Location::Mode(_) => Err(non_matchable("poisson", "integer mode does not fix lambda")),
    }
}
