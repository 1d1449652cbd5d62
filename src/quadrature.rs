//! Gauss-Legendre quadrature on the unit interval and unit square.
//!
//! Rule `g` integrates polynomials up to degree `2g + 1` exactly with
//! `g + 1` points. All rules up to
//! [`MAXIMUM_QUADRATURE_DEGREE`](crate::util::constants::MAXIMUM_QUADRATURE_DEGREE)
//! are synthesized once and cached for the lifetime of the process.

use std::f64::consts::PI;

use nalgebra::Vector2;
use once_cell::sync::Lazy;

use crate::util::constants::MAXIMUM_QUADRATURE_DEGREE;

/// One dimensional Gauss-Legendre rule on [0,1].
#[derive(Debug, Clone)]
pub struct QuadratureRule {
    pub points: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Tensor product rule on the unit square with `(g + 1)^2` points, the
/// first coordinate varying slowest.
#[derive(Debug, Clone)]
pub struct TensorQuadratureRule {
    pub xi: Vec<Vector2<f64>>,
    pub weights: Vec<f64>,
}

static RULES_1D: Lazy<Vec<QuadratureRule>> = Lazy::new(|| {
    (0..=MAXIMUM_QUADRATURE_DEGREE)
        .map(|degree| gauss_legendre(degree + 1))
        .collect()
});

static TENSOR_RULES: Lazy<Vec<TensorQuadratureRule>> = Lazy::new(|| {
    RULES_1D
        .iter()
        .map(|rule| {
            let n = rule.points.len();
            let mut xi = Vec::with_capacity(n * n);
            let mut weights = Vec::with_capacity(n * n);
            for k in 0..n * n {
                xi.push(Vector2::new(rule.points[k / n], rule.points[k % n]));
                weights.push(rule.weights[k / n] * rule.weights[k % n]);
            }
            TensorQuadratureRule { xi, weights }
        })
        .collect()
});

/// The cached 1D rule of the given degree.
pub fn rule(degree: usize) -> &'static QuadratureRule {
    &RULES_1D[degree]
}

/// The cached tensor product rule of the given degree.
pub fn tensor_rule(degree: usize) -> &'static TensorQuadratureRule {
    &TENSOR_RULES[degree]
}

/// Gauss-Legendre rule with `n` points on [0,1], nodes found by Newton
/// iteration on the Legendre recurrence.
fn gauss_legendre(n: usize) -> QuadratureRule {
    let mut points = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = n.div_ceil(2);
    for i in 0..m {
        // Chebyshev guess for the i-th root, refined by Newton.
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..100 {
            let (mut p0, mut p1) = (1.0, z);
            for k in 2..=n {
                let pk = ((2 * k - 1) as f64 * z * p1 - (k - 1) as f64 * p0) / k as f64;
                p0 = p1;
                p1 = pk;
            }
            dp = n as f64 * (z * p1 - p0) / (z * z - 1.0);
            let dz = p1 / dp;
            z -= dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }
        // Map the symmetric pair from [-1,1] to [0,1].
        let w = 2.0 / ((1.0 - z * z) * dp * dp);
        points[i] = 0.5 * (1.0 - z);
        points[n - 1 - i] = 0.5 * (1.0 + z);
        weights[i] = 0.5 * w;
        weights[n - 1 - i] = 0.5 * w;
    }
    QuadratureRule { points, weights }
}
