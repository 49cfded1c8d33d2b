//! Standard normal distribution approximations
//!
//! Closed-form, deterministic approximations of `Φ`, `Φ⁻¹` and the derivative
//! of `Φ⁻¹`. These operate on plain `f64`; conversion to and from the 64.64
//! representation happens at the pool boundary.
//!
//! - [`cdf`]: Abramowitz–Stegun 7.1.26 rational approximation of `erf`,
//!   absolute error below 1.5e-7 over the real line
//! - [`inverse_cdf`]: Acklam's rational approximation, split into a central
//!   region and two tails at `p = 0.02425`
//! - [`quantile_density`]: `1 / φ(Φ⁻¹(p))`

use crate::error::{Result, RmmError};
use std::f64::consts::{PI, SQRT_2};

// Abramowitz–Stegun 7.1.26
const ERF_A1: f64 = 0.254829592;
const ERF_A2: f64 = -0.284496736;
const ERF_A3: f64 = 1.421413741;
const ERF_A4: f64 = -1.453152027;
const ERF_A5: f64 = 1.061405429;
const ERF_P: f64 = 0.3275911;

// Acklam's coefficients
const ICDF_A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const ICDF_B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const ICDF_C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const ICDF_D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];

/// Boundary between the central region and the tails
const ICDF_TAIL: f64 = 0.02425;

/// Error function, odd by construction
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;

    // The coefficients sum to 1 + 1e-9, which would make erf slightly
    // negative just above zero
    sign * (1.0 - poly * (-x * x).exp()).max(0.0)
}

/// Standard normal cumulative distribution, `Φ(x) ∈ [0, 1]`
pub fn cdf(x: f64) -> f64 {
    if x == 0.0 {
        return 0.5;
    }
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal probability density
pub fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Inverse of the standard normal CDF for `p ∈ (0, 1)`
///
/// Fails with [`RmmError::Domain`] at or outside the boundaries; callers that
/// can reach `p = 0` or `p = 1` must special-case them.
pub fn inverse_cdf(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(RmmError::Domain {
            function: "inverse_cdf",
            value: p,
        });
    }

    if p < ICDF_TAIL {
        Ok(lower_tail(p))
    } else if p <= 1.0 - ICDF_TAIL {
        let q = p - 0.5;
        let r = q * q;
        let numerator = ((((ICDF_A[0] * r + ICDF_A[1]) * r + ICDF_A[2]) * r + ICDF_A[3]) * r
            + ICDF_A[4])
            * r
            + ICDF_A[5];
        let denominator =
            ((((ICDF_B[0] * r + ICDF_B[1]) * r + ICDF_B[2]) * r + ICDF_B[3]) * r + ICDF_B[4]) * r
                + 1.0;
        Ok(numerator * q / denominator)
    } else {
        Ok(-lower_tail(1.0 - p))
    }
}

/// Derivative of [`inverse_cdf`], same domain
pub fn quantile_density(p: f64) -> Result<f64> {
    let x = inverse_cdf(p)?;
    Ok(1.0 / pdf(x))
}

fn lower_tail(p: f64) -> f64 {
    let q = (-2.0 * p.ln()).sqrt();
    let numerator = ((((ICDF_C[0] * q + ICDF_C[1]) * q + ICDF_C[2]) * q + ICDF_C[3]) * q
        + ICDF_C[4])
        * q
        + ICDF_C[5];
    let denominator = (((ICDF_D[0] * q + ICDF_D[1]) * q + ICDF_D[2]) * q + ICDF_D[3]) * q + 1.0;
    numerator / denominator
}
