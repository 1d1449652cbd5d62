//! Boundary integral operators and their Galerkin discretization.

pub mod discrete;
pub mod identity;
pub mod laplace;

use nalgebra::DMatrix;

use crate::ansatz::SuperSpace;
use crate::geometry::SurfacePoint;

pub use discrete::{assemble_dense, assemble_local};

/// Inter-element continuity of an ansatz space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferentialForm {
    /// Globally continuous splines, glued across patch boundaries.
    Continuous,
    /// Element-local splines without continuity constraints.
    Discontinuous,
}

/// A boundary integral operator in Galerkin discretization.
///
/// Implementors evaluate the kernel in pairs of quadrature points; the
/// singular quadrature routines and the compression take care of where
/// those points come from.
pub trait LinearOperator {
    /// Sobolev order of the operator, e.g. -1 for the single layer.
    const ORDER: i32;
    /// Continuity the ansatz space must provide.
    const FORM: DifferentialForm;

    /// Adds the integrand at a pair of quadrature points to the local
    /// element interaction matrix. Quadrature weights ride along in the
    /// surface points.
    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p1: &SurfacePoint,
        p2: &SurfacePoint,
        interaction: &mut DMatrix<f64>,
    );

    /// Kernel times surface measures at a pair of interpolation points,
    /// used to sample admissible blocks of the compressed operator.
    fn evaluate_fmm_interpolation(&self, p1: &SurfacePoint, p2: &SurfacePoint) -> f64;

    /// Quadrature degree for well-separated element pairs.
    fn far_field_quadrature_degree(&self, polynomial_degree: usize) -> usize {
        (polynomial_degree as i32 - Self::ORDER + 1).max(0) as usize
    }

    /// Quadrature degree close to the singularity, after Harbrecht and
    /// Schneider, "Wavelet Galerkin schemes for boundary integral
    /// equations - implementation and quadrature".
    fn near_field_quadrature_degree(
        &self,
        polynomial_degree: usize,
        distance: f64,
        level: i32,
    ) -> usize {
        let ln2 = std::f64::consts::LN_2;
        // inside the far-field bound the distance is measured in levels
        let distance_log = if distance * f64::from(1 << level) < 1.0 {
            -(f64::from(level) * ln2)
        } else {
            distance.ln()
        };
        // alpha/2 is the convergence rate of the Galerkin solution, which
        // the potential evaluation is supposed to reach
        let degree = polynomial_degree as i32;
        let alpha = 2 - Self::ORDER + 2 * degree;
        let numerator =
            f64::from(alpha + degree) * f64::from(level) * ln2 - f64::from(2 - degree + Self::ORDER) * distance_log;
        let denominator = f64::from(level + 2) * ln2 + distance_log;
        (0.5 * numerator / denominator).max(0.0) as usize
    }
}

/// An operator whose Galerkin matrix only couples basis functions of the
/// same element, assembled with a plain tensor Gauss rule.
pub trait LocalOperator {
    const FORM: DifferentialForm;

    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p: &SurfacePoint,
        interaction: &mut DMatrix<f64>,
    );
}
