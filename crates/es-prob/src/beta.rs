//! Beta distribution utilities.

use es_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

use crate::math::bisect;
use crate::moments::{ClosedForm, Location, MomentTarget, non_matchable};

#[inline]
fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

pub(crate) fn validate(a: f64, b: f64) -> Result<()> {
    if !a.is_finite() || a <= 0.0 {
        return Err(Error::Validation(format!("alpha must be finite and > 0, got {}", a)));
    }
    if !b.is_finite() || b <= 0.0 {
        return Err(Error::Validation(format!("beta must be finite and > 0, got {}", b)));
    }
    Ok(())
}

/// Log-PDF of a Beta(`a`, `b`) distribution at `x`.
///
/// Support: `0 <= x <= 1`.
pub fn logpdf(x: f64, a: f64, b: f64) -> Result<f64> {
    validate(a, b)?;
    if !(0.0..=1.0).contains(&x) {
        return Ok(f64::NEG_INFINITY);
    }

    let ln_norm = -ln_beta(a, b);
    if x == 0.0 {
        if a < 1.0 {
            return Ok(f64::INFINITY);
        }
        if a > 1.0 {
            return Ok(f64::NEG_INFINITY);
        }
        // a == 1: x term is 0.
        return Ok(ln_norm);
    }
    if x == 1.0 {
        if b < 1.0 {
            return Ok(f64::INFINITY);
        }
        if b > 1.0 {
            return Ok(f64::NEG_INFINITY);
        }
        return Ok(ln_norm);
    }

    Ok(ln_norm + (a - 1.0) * x.ln() + (b - 1.0) * (1.0 - x).ln())
}

fn variance(a: f64, b: f64) -> f64 {
    let s = a + b;
    a * b / (s * s * (s + 1.0))
}

pub(crate) fn closed_form(a: f64, b: f64) -> ClosedForm {
    let s = a + b;
    let mode = if a > 1.0 && b > 1.0 {
        Some((a - 1.0) / (s - 2.0))
    } else if a <= 1.0 && b > 1.0 {
        Some(0.0)
    } else if a > 1.0 && b <= 1.0 {
        Some(1.0)
    } else {
        // Flat (a = b = 1) or U-shaped: no unique mode.
        None
    };
    let skew = 2.0 * (b - a) * (s + 1.0).sqrt() / ((s + 2.0) * (a * b).sqrt());
    let kurt = 6.0 * ((a - b).powi(2) * (s + 1.0) - a * b * (s + 2.0))
        / (a * b * (s + 2.0) * (s + 3.0));
    ClosedForm {
        mean: Some(a / s),
        median: None,
        mode,
        var: Some(variance(a, b)),
        skew: Some(skew),
        kurt: Some(kurt),
    }
}

/// `(alpha, beta)` reproducing the target.
///
/// From the mode, with concentration `kappa = alpha + beta > 2`:
/// `alpha = mode (kappa - 2) + 1`, `beta = (1 - mode)(kappa - 2) + 1`; the variance
/// decreases from 1/12 (kappa = 2) to 0, so `kappa` is found by bisection.
pub(crate) fn match_moments(target: &MomentTarget) -> Result<(f64, f64)> {
    let v = target.std * target.std;
    match target.location {
        Location::Mean(m) => {
            if !(0.0 < m && m < 1.0) {
                return Err(non_matchable("beta", format!("mean must lie in (0, 1), got {}", m)));
            }
            if v >= m * (1.0 - m) {
                return Err(non_matchable(
                    "beta",
                    format!("variance {} must be < mean (1 - mean) = {}", v, m * (1.0 - m)),
                ));
            }
            let nu = m * (1.0 - m) / v - 1.0;
            Ok((m * nu, (1.0 - m) * nu))
        }
        Location::Mode(mode) => {
            if !(0.0 < mode && mode < 1.0) {
                return Err(non_matchable("beta", format!("mode must lie in (0, 1), got {}", mode)));
            }
            if v >= 1.0 / 12.0 {
                return Err(non_matchable(
                    "beta",
                    format!(
                        "std {} too large for a unimodal beta (max {})",
                        target.std,
                        (1.0f64 / 12.0).sqrt()
                    ),
                ));
            }
            let ab = |kappa: f64| (mode * (kappa - 2.0) + 1.0, (1.0 - mode) * (kappa - 2.0) + 1.0);
            let f = |kappa: f64| {
                let (a, b) = ab(kappa);
                variance(a, b) - v
            };
            let mut hi = 4.0;
            while f(hi) > 0.0 {
                hi *= 2.0;
                if hi > 1e15 {
                    return Err(non_matchable("beta", format!("std {} too small", target.std)));
                }
            }
            let kappa = bisect(f, 2.0, hi, 1e-15, 300)?;
            Ok(ab(kappa))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform() {
        for x in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let lp = logpdf(x, 1.0, 1.0).unwrap();
            assert!((lp - 0.0).abs() < 1e-12, "x={}", x);
        }
    }

    #[test]
    fn test_symmetry_when_a_equals_b() {
        let lp1 = logpdf(0.2, 2.0, 2.0).unwrap();
        let lp2 = logpdf(0.8, 2.0, 2.0).unwrap();
        assert!((lp1 - lp2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params() {
        assert!(logpdf(0.5, 0.0, 1.0).is_err());
        assert!(logpdf(0.5, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_mode_undefined_when_u_shaped() {
        assert!(closed_form(0.5, 0.5).mode.is_none());
        assert_eq!(closed_form(0.5, 2.0).mode, Some(0.0));
    }

    #[test]
    fn test_match_mode_std() {
        let (a, b) = match_moments(&MomentTarget::mode_std(0.3, 0.1)).unwrap();
        let cf = closed_form(a, b);
        assert_relative_eq!(cf.mode.unwrap(), 0.3, max_relative = 1e-9);
        assert_relative_eq!(cf.var.unwrap().sqrt(), 0.1, max_relative = 1e-9);
    }

    #[test]
    fn test_match_mean_outside_unit_interval() {
        assert!(match_moments(&MomentTarget::mean_std(1.5, 0.1)).is_err());
    }
}
