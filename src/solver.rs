//! Conjugate gradient solver on abstract operators.
//!
//! The solver only needs the action of the system matrix, so dense,
//! sparse and compressed operators all plug into the same loop.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::csc::CscMatrix;
use serde::Deserialize;

use crate::error::AppError;

/// A symmetric positive definite operator given by its action.
pub trait MatrixOperator {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn matvec(&self, x: &DVector<f64>) -> DVector<f64>;
}

impl MatrixOperator for DMatrix<f64> {
    fn rows(&self) -> usize {
        self.nrows()
    }

    fn cols(&self) -> usize {
        self.ncols()
    }

    fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        self * x
    }
}

impl MatrixOperator for CscMatrix<f64> {
    fn rows(&self) -> usize {
        self.nrows()
    }

    fn cols(&self) -> usize {
        self.ncols()
    }

    fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        self * x
    }
}

/// Convergence report of an iterative solve.
#[derive(Debug, Clone, Copy)]
pub struct CgInfo {
    pub iterations: usize,
    /// Final residual norm relative to the right hand side.
    pub residual: f64,
}

/// Solver parameters, typically layered in from the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverParameters {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// Solves `A x = b` for symmetric positive definite `A` by conjugate
/// gradients, starting from zero.
pub fn conjugate_gradients<A: MatrixOperator>(
    operator: &A,
    rhs: &DVector<f64>,
    parameters: &SolverParameters,
) -> Result<(DVector<f64>, CgInfo), AppError> {
    debug_assert_eq!(operator.rows(), operator.cols());
    debug_assert_eq!(operator.rows(), rhs.len());
    let rhs_norm = rhs.norm();
    if rhs_norm == 0.0 {
        return Ok((
            DVector::zeros(rhs.len()),
            CgInfo {
                iterations: 0,
                residual: 0.0,
            },
        ));
    }
    let threshold = parameters.tolerance * rhs_norm;
    let mut x = DVector::zeros(rhs.len());
    let mut residual = rhs.clone();
    let mut direction = residual.clone();
    let mut rho = residual.norm_squared();
    for iteration in 0..parameters.max_iterations {
        if rho.sqrt() <= threshold {
            let info = CgInfo {
                iterations: iteration,
                residual: rho.sqrt() / rhs_norm,
            };
            tracing::debug!(
                iterations = info.iterations,
                residual = info.residual,
                "Conjugate gradients converged"
            );
            return Ok((x, info));
        }
        let a_direction = operator.matvec(&direction);
        let curvature = direction.dot(&a_direction);
        if curvature <= 0.0 {
            return Err(AppError::Numerical(
                "conjugate gradients hit a non positive curvature direction".into(),
            ));
        }
        let alpha = rho / curvature;
        x.axpy(alpha, &direction, 1.0);
        residual.axpy(-alpha, &a_direction, 1.0);
        let rho_next = residual.norm_squared();
        direction.axpy(1.0, &residual, rho_next / rho);
        rho = rho_next;
    }
    Err(AppError::SolverStagnation {
        iterations: parameters.max_iterations,
        residual: rho.sqrt() / rhs_norm,
    })
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn spd_system(n: usize) -> (DMatrix<f64>, DVector<f64>) {
        // diagonally dominant tridiagonal matrix
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = 4.0;
            if i + 1 < n {
                a[(i, i + 1)] = -1.0;
                a[(i + 1, i)] = -1.0;
            }
        }
        let b = DVector::from_fn(n, |i, _| 1.0 + i as f64);
        (a, b)
    }

    #[test]
    fn test_solves_spd_system() {
        let (a, b) = spd_system(20);
        let (x, info) = conjugate_gradients(&a, &b, &SolverParameters::default()).unwrap();
        assert!(((&a * &x) - &b).norm() < 1e-10 * b.norm());
        assert!(info.iterations <= 20);
        assert!(info.residual <= 1e-12);
    }

    #[test]
    fn test_solves_random_spd_system() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 30;
        let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
        // shifted Gram matrix, positive definite by construction
        let a = m.transpose() * &m + DMatrix::identity(n, n) * n as f64;
        let b = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));
        let (x, info) = conjugate_gradients(&a, &b, &SolverParameters::default()).unwrap();
        assert!(((&a * &x) - &b).norm() < 1e-10 * b.norm());
        assert!(info.iterations <= n);
    }

    #[test]
    fn test_zero_rhs_returns_zero() {
        let (a, _) = spd_system(5);
        let b = DVector::zeros(5);
        let (x, info) = conjugate_gradients(&a, &b, &SolverParameters::default()).unwrap();
        assert_eq!(x, DVector::zeros(5));
        assert_eq!(info.iterations, 0);
    }

    #[test]
    fn test_reports_stagnation() {
        let (a, b) = spd_system(50);
        let parameters = SolverParameters {
            tolerance: 1e-14,
            max_iterations: 2,
        };
        let result = conjugate_gradients(&a, &b, &parameters);
        assert!(matches!(
            result,
            Err(AppError::SolverStagnation { iterations: 2, .. })
        ));
    }
}
