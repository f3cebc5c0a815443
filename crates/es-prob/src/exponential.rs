//! Exponential distribution utilities.

use es_core::{Error, Result};

use crate::moments::{ClosedForm, Location, MomentTarget, check_implied_std, non_matchable};

pub(crate) fn validate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::Validation(format!("rate must be finite and > 0, got {}", rate)));
    }
    Ok(())
}

/// Log-PDF of an Exponential distribution at `x` with rate `rate`.
///
/// Support: `x >= 0`.
pub fn logpdf(x: f64, rate: f64) -> Result<f64> {
    validate(rate)?;
    if x < 0.0 {
        return Ok(f64::NEG_INFINITY);
    }
    Ok(rate.ln() - rate * x)
}

pub(crate) fn closed_form(rate: f64) -> ClosedForm {
    ClosedForm {
        mean: Some(1.0 / rate),
        median: Some(std::f64::consts::LN_2 / rate),
        mode: Some(0.0),
        var: Some(1.0 / (rate * rate)),
        skew: Some(2.0),
        kurt: Some(6.0),
    }
}

pub(crate) fn match_moments(target: &MomentTarget) -> Result<f64> {
    match target.location {
        Location::Mean(m) => {
            if m <= 0.0 {
                return Err(non_matchable("exponential", format!("mean must be > 0, got {}", m)));
            }
            check_implied_std("exponential", m, target.std)?;
            Ok(1.0 / m)
        }
        Location::Mode(mode) if mode == 0.0 => Ok(1.0 / target.std),
        Location::Mode(mode) => {
            Err(non_matchable("exponential", format!("mode is always 0, requested {}", mode)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_value() {
        let lp = logpdf(0.5, 2.0).unwrap();
        assert!((lp - (2.0f64.ln() - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_support() {
        let lp = logpdf(-0.1, 2.0).unwrap();
        assert!(lp.is_infinite() && lp.is_sign_negative());
    }

    #[test]
    fn test_invalid_rate() {
        assert!(logpdf(0.0, 0.0).is_err());
        assert!(logpdf(0.0, -1.0).is_err());
    }

    #[test]
    fn test_match_requires_consistent_std() {
        assert_eq!(match_moments(&MomentTarget::mean_std(0.5, 0.5)).unwrap(), 2.0);
        assert!(match_moments(&MomentTarget::mean_std(0.5, 0.7)).is_err());
        assert_eq!(match_moments(&MomentTarget::mode_std(0.0, 0.25)).unwrap(), 4.0);
    }
}
