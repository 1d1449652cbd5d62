//! Bernstein polynomials on [0,1] with runtime degree.
//!
//! All routines write into caller-provided slices so the hot paths stay
//! allocation free. Degrees are capped by
//! [`MAX_POLYNOMIAL_DEGREE`](crate::util::constants::MAX_POLYNOMIAL_DEGREE).

use crate::util::constants::MAX_POLYNOMIAL_DEGREE;

/// Binomial coefficient as a float, computed multiplicatively.
pub fn binomial(n: usize, k: usize) -> f64 {
    debug_assert!(k <= n);
    let k = k.min(n - k);
    let mut out = 1.0;
    for i in 0..k {
        out = out * (n - i) as f64 / (i + 1) as f64;
    }
    out
}

/// Single Bernstein polynomial B_k of the given degree.
pub fn bernstein(k: usize, degree: usize, x: f64) -> f64 {
    binomial(degree, k) * x.powi(k as i32) * (1.0 - x).powi((degree - k) as i32)
}

/// Writes all `degree + 1` Bernstein values at `x` into `values`.
pub fn eval_basis(degree: usize, values: &mut [f64], x: f64) {
    debug_assert!(degree <= MAX_POLYNOMIAL_DEGREE);
    debug_assert!(values.len() > degree);
    values[0] = 1.0;
    for j in 1..=degree {
        let mut saved = 0.0;
        for value in values.iter_mut().take(j) {
            let term = *value;
            *value = saved + (1.0 - x) * term;
            saved = x * term;
        }
        values[j] = saved;
    }
}

/// Writes all `degree + 1` Bernstein derivatives at `x` into `values`.
pub fn eval_der_basis(degree: usize, values: &mut [f64], x: f64) {
    debug_assert!(degree <= MAX_POLYNOMIAL_DEGREE);
    debug_assert!(values.len() > degree);
    if degree == 0 {
        values[0] = 0.0;
        return;
    }
    let mut lower = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
    eval_basis(degree - 1, &mut lower, x);
    let p = degree as f64;
    values[0] = -p * lower[0];
    for k in 1..degree {
        values[k] = p * (lower[k - 1] - lower[k]);
    }
    values[degree] = p * lower[degree - 1];
}

/// Evaluates a polynomial in Bernstein form from its coefficients.
pub fn eval_coefficients(degree: usize, coefficients: &[f64], x: f64) -> f64 {
    debug_assert!(coefficients.len() > degree);
    let mut basis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
    eval_basis(degree, &mut basis, x);
    coefficients
        .iter()
        .zip(basis.iter())
        .take(degree + 1)
        .map(|(c, b)| c * b)
        .sum()
}

/// Evaluates the derivative of a polynomial in Bernstein form.
pub fn eval_der_coefficients(degree: usize, coefficients: &[f64], x: f64) -> f64 {
    debug_assert!(coefficients.len() > degree);
    if degree == 0 {
        return 0.0;
    }
    let mut basis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
    eval_basis(degree - 1, &mut basis, x);
    let p = degree as f64;
    (0..degree)
        .map(|k| p * (coefficients[k + 1] - coefficients[k]) * basis[k])
        .sum()
}
