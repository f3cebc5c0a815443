//! Gamma distribution utilities.

use es_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

use crate::moments::{ClosedForm, Location, MomentTarget, non_matchable};

pub(crate) fn validate(shape: f64, rate: f64) -> Result<()> {
    if !shape.is_finite() || shape <= 0.0 {
        return Err(Error::Validation(format!("shape must be finite and > 0, got {}", shape)));
    }
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::Validation(format!("rate must be finite and > 0, got {}", rate)));
    }
    Ok(())
}

/// Log-PDF of a Gamma distribution with `shape` and `rate` at `x`.
///
/// Parameterization:
/// - `shape > 0`
/// - `rate > 0` (inverse scale)
/// Support: `x >= 0`.
pub fn logpdf_shape_rate(x: f64, shape: f64, rate: f64) -> Result<f64> {
    validate(shape, rate)?;
    if x < 0.0 {
        return Ok(f64::NEG_INFINITY);
    }
    if x == 0.0 {
        if shape < 1.0 {
            return Ok(f64::INFINITY);
        }
        if shape > 1.0 {
            return Ok(f64::NEG_INFINITY);
        }
        // shape == 1 => exponential
        return Ok(rate.ln());
    }

    let ln_norm = shape * rate.ln() - ln_gamma(shape);
    Ok(ln_norm + (shape - 1.0) * x.ln() - rate * x)
}

pub(crate) fn closed_form(shape: f64, rate: f64) -> ClosedForm {
    ClosedForm {
        mean: Some(shape / rate),
        median: None,
        mode: Some(if shape >= 1.0 { (shape - 1.0) / rate } else { 0.0 }),
        var: Some(shape / (rate * rate)),
        skew: Some(2.0 / shape.sqrt()),
        kurt: Some(6.0 / shape),
    }
}

/// `(shape, rate)` reproducing the target.
///
/// From the mode (`shape > 1` branch) with `c = (std/mode)^2`: `shape / (shape-1)^2 = c`,
/// i.e. `c k^2 - (2c + 1) k + c = 0`, taking the root above 1.
pub(crate) fn match_moments(target: &MomentTarget) -> Result<(f64, f64)> {
    let s2 = target.std * target.std;
    match target.location {
        Location::Mean(m) => {
            if m <= 0.0 {
                return Err(non_matchable("gamma", format!("mean must be > 0, got {}", m)));
            }
            Ok((m * m / s2, m / s2))
        }
        Location::Mode(mode) => {
            if mode <= 0.0 {
                return Err(non_matchable(
                    "gamma",
                    format!("mode must be > 0 to fix the shape, got {}", mode),
                ));
            }
            let c = s2 / (mode * mode);
            let k = ((2.0 * c + 1.0) + (4.0 * c + 1.0).sqrt()) / (2.0 * c);
            Ok((k, (k - 1.0) / mode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_one_matches_exponential() {
        let x = 0.7;
        let rate = 2.3;
        let lp_g = logpdf_shape_rate(x, 1.0, rate).unwrap();
        let lp_e = crate::exponential::logpdf(x, rate).unwrap();
        assert!((lp_g - lp_e).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_support() {
        let lp = logpdf_shape_rate(-0.1, 2.0, 1.0).unwrap();
        assert!(lp.is_infinite() && lp.is_sign_negative());
    }

    #[test]
    fn test_invalid_params() {
        assert!(logpdf_shape_rate(1.0, 0.0, 1.0).is_err());
        assert!(logpdf_shape_rate(1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_match_mode_std() {
        let (k, r) = match_moments(&MomentTarget::mode_std(1.0, 1.0)).unwrap();
        let cf = closed_form(k, r);
        assert_relative_eq!(cf.mode.unwrap(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(cf.var.unwrap().sqrt(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_negative_mean_not_matchable() {
        let err = match_moments(&MomentTarget::mean_std(-2.0, 1.0)).unwrap_err();
        assert!(matches!(err, Error::NonMatchableMoments { .. }));
    }
}
