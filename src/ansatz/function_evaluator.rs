//! Point evaluation of discrete functions given by ansatz space coefficients.

use nalgebra::{DVector, Vector2};

use crate::cluster::ElementTreeNode;
use crate::geometry::SurfacePoint;

use super::space::AnsatzSpace;

/// Evaluates a function of the ansatz space anywhere on the surface.
///
/// Coefficients refer to the h-scaled basis used by the discrete operators,
/// so the stored element-local coefficients are divided by the element width
/// on evaluation.
#[derive(Debug, Clone)]
pub struct FunctionEvaluator {
    space: AnsatzSpace,
    local_coefficients: DVector<f64>,
    reordering: Vec<usize>,
}

impl FunctionEvaluator {
    pub fn new(space: &AnsatzSpace, coefficients: &DVector<f64>) -> Self {
        debug_assert_eq!(coefficients.len(), space.number_of_dofs());
        let local_coefficients = space.transformation_matrix() * coefficients;
        let reordering = space
            .super_space()
            .mesh()
            .element_tree()
            .compute_reordering_vector();
        Self {
            space: space.clone(),
            local_coefficients,
            reordering,
        }
    }

    pub fn set_coefficients(&mut self, coefficients: &DVector<f64>) {
        debug_assert_eq!(coefficients.len(), self.space.number_of_dofs());
        self.local_coefficients = self.space.transformation_matrix() * coefficients;
    }

    /// Evaluates at a quadrature point that lives on the given element.
    pub fn evaluate(&self, element: &ElementTreeNode, point: &SurfacePoint) -> f64 {
        let size = self.space.super_space().polynomial_degree_plus_one_squared();
        let block = self
            .local_coefficients
            .rows(size * element.id as usize, size);
        let basis = self.space.super_space().basis(&point.reference);
        block.dot(&basis) / element.h()
    }

    /// Evaluates at a point given in the reference domain of a patch.
    pub fn evaluate_on_patch(&self, patch: usize, reference_point: &Vector2<f64>) -> f64 {
        let elements_per_direction = 1 << self.space.refinement_level();
        let h = 1.0 / elements_per_direction as f64;
        let x = ((reference_point.x / h) as usize).min(elements_per_direction - 1);
        let y = ((reference_point.y / h) as usize).min(elements_per_direction - 1);
        let tensor_index =
            patch * elements_per_direction * elements_per_direction + y * elements_per_direction + x;
        let tree = self.space.super_space().mesh().element_tree();
        let element = tree.leaf(self.reordering[tensor_index]);
        let xi = element.map_to_reference_element(reference_point);
        let point = self.space.super_space().map_to_surface(element, &xi, 1.0);
        self.evaluate(element, &point)
    }
}
