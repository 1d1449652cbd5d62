//! Right hand sides of the Galerkin system.

use nalgebra::{DVector, Vector3};

use crate::ansatz::{AnsatzSpace, SuperSpace};
use crate::geometry::SurfacePoint;
use crate::quadrature;

/// A continuous linear functional on the ansatz space.
pub trait LinearForm {
    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p: &SurfacePoint,
        intval: &mut DVector<f64>,
    );
}

/// Tests a function given on the surface against all basis functions,
/// yielding the right hand side of a Dirichlet problem.
pub struct DirichletTrace<F> {
    function: F,
}

impl<F: Fn(&Vector3<f64>) -> f64> DirichletTrace<F> {
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F: Fn(&Vector3<f64>) -> f64> LinearForm for DirichletTrace<F> {
    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p: &SurfacePoint,
        intval: &mut DVector<f64>,
    ) {
        let scale = p.integration_element() * p.weight * (self.function)(&p.point);
        super_space.add_scaled_basis(intval, scale, &p.reference);
    }
}

/// Assembles the load vector of a linear form in the ansatz space.
pub fn assemble_linear_form<L: LinearForm>(form: &L, space: &AnsatzSpace) -> DVector<f64> {
    let super_space = space.super_space();
    let tree = super_space.mesh().element_tree();
    let q = super_space.polynomial_degree_plus_one_squared();
    let rule = quadrature::tensor_rule(super_space.polynomial_degree() + 1);
    let mut local = DVector::zeros(q * tree.number_of_leafs());
    let mut intval = DVector::zeros(q);
    for (index, element) in tree.leafs().enumerate() {
        intval.fill(0.0);
        let h = element.h();
        for (xi, &w) in rule.xi.iter().zip(&rule.weights) {
            let qp = super_space.map_to_surface(element, xi, h * w);
            form.evaluate_integrand(super_space, &qp, &mut intval);
        }
        local.rows_mut(q * index, q).copy_from(&intval);
    }
    &space.transformation_matrix().transpose() * &local
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix as M;

    use crate::geometry::{Geometry, Patch};
    use crate::operators::DifferentialForm;

    fn screen() -> Geometry {
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(
            &[
                M::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]),
                M::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]),
                M::zeros(2, 2),
                M::repeat(2, 2, 1.0),
            ],
            &knots,
            &knots,
        )
        .unwrap();
        Geometry::from_patches(vec![patch])
    }

    #[test]
    fn test_constant_trace_on_piecewise_constants() {
        // each scaled basis function integrates to h over its element
        let space =
            AnsatzSpace::new(&screen(), 1, 0, 1, DifferentialForm::Discontinuous).unwrap();
        let rhs = assemble_linear_form(&DirichletTrace::new(|_: &Vector3<f64>| 1.0), &space);
        assert_eq!(rhs.len(), 4);
        for i in 0..4 {
            assert!((rhs[i] - 0.5).abs() < 1e-14);
        }
    }

    #[test]
    fn test_trace_pairs_with_constant_to_the_integral() {
        // <rhs, coefficients of 1> = integral of x over the unit screen
        let space = AnsatzSpace::new(&screen(), 1, 1, 1, DifferentialForm::Continuous).unwrap();
        let rhs = assemble_linear_form(&DirichletTrace::new(|x: &Vector3<f64>| x.x), &space);
        let ones = DVector::from_element(space.number_of_dofs(), 0.5);
        assert!((rhs.dot(&ones) - 0.5).abs() < 1e-14);
    }
}
