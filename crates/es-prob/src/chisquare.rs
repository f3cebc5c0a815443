//! Chi-square distribution utilities.

use es_core::{Error, Result};

use crate::moments::{ClosedForm, Location, MomentTarget, check_implied_std, non_matchable};

pub(crate) fn validate(k: f64) -> Result<()> {
    if !k.is_finite() || k <= 0.0 {
        return Err(Error::Validation(format!("k must be finite and > 0, got {}", k)));
    }
    Ok(())
}

/// Log-PDF of a chi-square distribution with `k` degrees of freedom at `x`.
pub fn logpdf(x: f64, k: f64) -> Result<f64> {
    validate(k)?;
    // Chi2(k) = Gamma(k/2, rate 1/2).
    crate::gamma::logpdf_shape_rate(x, 0.5 * k, 0.5)
}

pub(crate) fn closed_form(k: f64) -> ClosedForm {
    ClosedForm {
        mean: Some(k),
        median: None,
        mode: Some((k - 2.0).max(0.0)),
        var: Some(2.0 * k),
        skew: Some((8.0 / k).sqrt()),
        kurt: Some(12.0 / k),
    }
}

pub(crate) fn match_moments(target: &MomentTarget) -> Result<f64> {
    let k = match target.location {
        Location::Mean(m) if m > 0.0 => m,
        Location::Mode(mode) if mode > 0.0 => mode + 2.0,
        Location::Mean(v) | Location::Mode(v) => {
            return Err(non_matchable("chisquare", format!("location must be > 0, got {}", v)));
        }
    };
    check_implied_std("chisquare", (2.0 * k).sqrt(), target.std)?;
    Ok(k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k2_is_exponential_half() {
        let lp = logpdf(1.3, 2.0).unwrap();
        let le = crate::exponential::logpdf(1.3, 0.5).unwrap();
        assert!((lp - le).abs() < 1e-12);
    }

    #[test]
    fn test_match_mean() {
        assert_eq!(match_moments(&MomentTarget::mean_std(8.0, 4.0)).unwrap(), 8.0);
        assert!(match_moments(&MomentTarget::mean_std(8.0, 1.0)).is_err());
    }
}
