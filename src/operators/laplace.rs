//! Kernels of the Laplace problem.

use std::f64::consts::PI;

use nalgebra::{DMatrix, Vector3};

use crate::ansatz::{FunctionEvaluator, SuperSpace};
use crate::cluster::ElementTreeNode;
use crate::geometry::SurfacePoint;
use crate::potential::PotentialOperator;

use super::{DifferentialForm, LinearOperator};

/// Fundamental solution of the Laplacian.
fn fundamental_solution(x: &Vector3<f64>, y: &Vector3<f64>) -> f64 {
    1.0 / (4.0 * PI * (x - y).norm())
}

/// The weakly singular single layer operator of the Laplacian.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLayerOperator;

impl LinearOperator for SingleLayerOperator {
    const ORDER: i32 = -1;
    const FORM: DifferentialForm = DifferentialForm::Discontinuous;

    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p1: &SurfacePoint,
        p2: &SurfacePoint,
        interaction: &mut DMatrix<f64>,
    ) {
        let integrand = fundamental_solution(&p1.point, &p2.point)
            * p1.integration_element()
            * p2.integration_element()
            * p1.weight
            * p2.weight;
        super_space.add_scaled_basis_interaction(
            interaction,
            integrand,
            &p1.reference,
            &p2.reference,
        );
    }

    fn evaluate_fmm_interpolation(&self, p1: &SurfacePoint, p2: &SurfacePoint) -> f64 {
        fundamental_solution(&p1.point, &p2.point)
            * p1.integration_element()
            * p2.integration_element()
    }
}

/// The single layer potential, mapping a surface density to the harmonic
/// function it represents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLayerPotential;

impl PotentialOperator for SingleLayerPotential {
    fn evaluate_integrand(
        &self,
        evaluator: &FunctionEvaluator,
        element: &ElementTreeNode,
        point: &Vector3<f64>,
        p: &SurfacePoint,
    ) -> f64 {
        let density = evaluator.evaluate(element, p);
        fundamental_solution(point, &p.point) * density * p.integration_element() * p.weight
    }
}
