//! Student-t distribution utilities.

use es_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

use crate::moments::ClosedForm;

/// Natural log of π.
const LN_PI: f64 = 1.144_729_885_849_400_2;

pub(crate) fn validate(df: f64, mu: f64, sigma: f64) -> Result<()> {
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::Validation(format!("df must be finite and > 0, got {}", df)));
    }
    crate::normal::validate(mu, sigma)
}

/// Log-PDF of a Student-t distribution at `x` with dof `df`, location `mu`, scale `sigma`.
pub fn logpdf(x: f64, df: f64, mu: f64, sigma: f64) -> Result<f64> {
    validate(df, mu, sigma)?;
    let z = (x - mu) / sigma;
    let a = ln_gamma(0.5 * (df + 1.0)) - ln_gamma(0.5 * df);
    let b = -0.5 * (df.ln() + LN_PI);
    let c = -sigma.ln();
    let d = -0.5 * (df + 1.0) * (z * z / df).ln_1p();
    Ok(a + b + c + d)
}

/// Heavy tails: mean needs `df > 1`, variance `df > 2`, skewness `df > 3`, kurtosis `df > 4`.
pub(crate) fn closed_form(df: f64, mu: f64, sigma: f64) -> ClosedForm {
    ClosedForm {
        mean: (df > 1.0).then_some(mu),
        median: Some(mu),
        mode: Some(mu),
        var: (df > 2.0).then(|| sigma * sigma * df / (df - 2.0)),
        skew: (df > 3.0).then_some(0.0),
        kurt: (df > 4.0).then(|| 6.0 / (df - 4.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cauchy_at_zero() {
        // df=1 => Cauchy(0,1): pdf(0) = 1/pi
        let lp = logpdf(0.0, 1.0, 0.0, 1.0).unwrap();
        assert!((lp + std::f64::consts::PI.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_cauchy_has_no_mean() {
        let cf = closed_form(1.0, 0.0, 1.0);
        assert!(cf.mean.is_none());
        assert!(cf.var.is_none());
        assert_eq!(cf.median, Some(0.0));
    }

    #[test]
    fn test_invalid_params() {
        assert!(logpdf(0.0, 5.0, 0.0, 0.0).is_err());
        assert!(logpdf(0.0, 0.0, 0.0, 1.0).is_err());
    }
}
