//! Small numeric utilities shared by the distribution modules and the samplers.

use es_core::{Error, Result};

/// Relative tolerance used when a one-parameter family must also reproduce a target std.
pub(crate) const STD_CONSISTENCY_RTOL: f64 = 1e-6;

/// Find a root of `f` in `[lo, hi]` by bisection.
///
/// Requires a sign change over the bracket. Stops when the bracket is narrower than
/// `xtol * max(1, |mid|)` or after `max_iter` halvings.
pub fn bisect<F>(f: F, mut lo: f64, mut hi: f64, xtol: f64, max_iter: usize) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo.signum() == f_hi.signum() {
        return Err(Error::Computation(format!(
            "bisection bracket [{}, {}] does not straddle a root (f={}, {})",
            lo, hi, f_lo, f_hi
        )));
    }
    for _ in 0..max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || (hi - lo) < xtol * mid.abs().max(1.0) {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// `n` equally spaced points over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| if i == n - 1 { stop } else { start + step * i as f64 }).collect()
        }
    }
}

/// Whether `got` agrees with `expected` to a relative tolerance.
#[inline]
pub(crate) fn rel_close(got: f64, expected: f64, rtol: f64) -> bool {
    (got - expected).abs() <= rtol * expected.abs().max(f64::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bisect_sqrt2() {
        let r = bisect(|x| x * x - 2.0, 0.0, 2.0, 1e-14, 200).unwrap();
        assert!((r - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_bisect_requires_sign_change() {
        assert!(bisect(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 100).is_err());
    }

    #[test]
    fn test_linspace_endpoints() {
        let xs = linspace(0.0, 1.0, 5);
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_rel_close() {
        assert!(rel_close(1.0 + 1e-9, 1.0, 1e-6));
        assert!(!rel_close(1.1, 1.0, 1e-6));
    }
}
