//! Potential evaluation in the domain.
//!
//! Once the boundary density is known, the representation formula turns
//! it into the solution of the underlying PDE at arbitrary points away
//! from the surface.

use nalgebra::{DVector, Vector3};
use rayon::prelude::*;

use crate::ansatz::{AnsatzSpace, FunctionEvaluator};
use crate::cluster::ElementTreeNode;
use crate::geometry::SurfacePoint;
use crate::quadrature;

/// Kernel of a representation formula.
pub trait PotentialOperator {
    /// Contribution of one surface quadrature point to the potential at
    /// `point`. Both element width factors of the surface measure arrive
    /// through the weight of the surface point.
    fn evaluate_integrand(
        &self,
        evaluator: &FunctionEvaluator,
        element: &ElementTreeNode,
        point: &Vector3<f64>,
        p: &SurfacePoint,
    ) -> f64;
}

/// Evaluates the potential of a discrete boundary density.
pub struct DiscretePotential<P> {
    operator: P,
    space: AnsatzSpace,
    evaluator: FunctionEvaluator,
    quadrature_degree: usize,
}

impl<P: PotentialOperator + Sync> DiscretePotential<P> {
    pub fn new(operator: P, space: &AnsatzSpace, cauchy_data: &DVector<f64>) -> Self {
        Self {
            operator,
            space: space.clone(),
            evaluator: FunctionEvaluator::new(space, cauchy_data),
            quadrature_degree: space.polynomial_degree() + 1,
        }
    }

    pub fn set_cauchy_data(&mut self, coefficients: &DVector<f64>) {
        self.evaluator.set_coefficients(coefficients);
    }

    /// The potential at each evaluation point.
    pub fn evaluate(&self, points: &[Vector3<f64>]) -> DVector<f64> {
        let super_space = self.space.super_space();
        let tree = super_space.mesh().element_tree();
        let rule = quadrature::tensor_rule(self.quadrature_degree);
        let values: Vec<f64> = points
            .par_iter()
            .map(|point| {
                let mut potential = 0.0;
                for element in tree.leafs() {
                    let h = element.h();
                    for (xi, &w) in rule.xi.iter().zip(&rule.weights) {
                        let qp = super_space.map_to_surface(element, xi, h * h * w);
                        potential +=
                            self.operator
                                .evaluate_integrand(&self.evaluator, element, point, &qp);
                    }
                }
                potential
            })
            .collect();
        tracing::debug!(points = points.len(), "Potential evaluated");
        DVector::from_vec(values)
    }
}
