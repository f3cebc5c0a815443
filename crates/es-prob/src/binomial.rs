//! Binomial distribution utilities.

use es_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

use crate::moments::ClosedForm;

fn ln_choose(n: u64, k: u64) -> f64 {
    // ln(n choose k) = ln Γ(n+1) - ln Γ(k+1) - ln Γ(n-k+1)
    let n1 = (n as f64) + 1.0;
    let k1 = (k as f64) + 1.0;
    let nk1 = ((n - k) as f64) + 1.0;
    ln_gamma(n1) - ln_gamma(k1) - ln_gamma(nk1)
}

pub(crate) fn validate(n: u64, p: f64) -> Result<()> {
    if n == 0 {
        return Err(Error::Validation("n must be >= 1".to_string()));
    }
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return Err(Error::Validation(format!("p must lie in (0, 1), got {}", p)));
    }
    Ok(())
}

/// Log-PMF of a Binomial distribution `Binom(n, p)` at count `k`.
pub fn logpmf(k: u64, n: u64, p: f64) -> Result<f64> {
    validate(n, p)?;
    if k > n {
        return Ok(f64::NEG_INFINITY);
    }
    let kf = k as f64;
    let nf = n as f64;
    Ok(ln_choose(n, k) + kf * p.ln() + (nf - kf) * (-p).ln_1p())
}

pub(crate) fn closed_form(n: u64, p: f64) -> ClosedForm {
    let nf = n as f64;
    let q = 1.0 - p;
    let npq = nf * p * q;
    ClosedForm {
        mean: Some(nf * p),
        median: None,
        mode: Some(((nf + 1.0) * p).floor().min(nf)),
        var: Some(npq),
        skew: Some((q - p) / npq.sqrt()),
        kurt: Some((1.0 - 6.0 * p * q) / npq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pmf_sums_to_one() {
        let total: f64 = (0..=10).map(|k| logpmf(k, 10, 0.3).unwrap().exp()).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_params() {
        assert!(logpmf(0, 0, 0.5).is_err());
        assert!(logpmf(0, 3, 1.0).is_err());
    }
}
