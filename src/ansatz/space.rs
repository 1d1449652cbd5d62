//! The discrete trial and test space of the Galerkin method.

use std::sync::Arc;

use nalgebra_sparse::csc::CscMatrix;

use crate::error::AppError;
use crate::geometry::Geometry;
use crate::operators::DifferentialForm;

use super::glue::Glue;
use super::projector::Projector;
use super::superspace::SuperSpace;

/// A tensor product B-spline space on the whole surface.
///
/// The transformation matrix maps smooth-space coefficients to coefficients
/// of the element-local Bernstein basis, so discrete operators can be
/// assembled element by element and conjugated afterwards.
#[derive(Debug, Clone)]
pub struct AnsatzSpace {
    super_space: SuperSpace,
    knot_repetition: usize,
    form: DifferentialForm,
    transformation_matrix: Arc<CscMatrix<f64>>,
}

impl AnsatzSpace {
    pub fn new(
        geometry: &Geometry,
        refinement_level: usize,
        polynomial_degree: usize,
        knot_repetition: usize,
        form: DifferentialForm,
    ) -> Result<Self, AppError> {
        let super_space = SuperSpace::new(geometry, refinement_level, polynomial_degree)?;
        let projector = Projector::new(&super_space, knot_repetition, form)?;
        let glue = Glue::new(&super_space, &projector, form);
        let transformation_matrix = projector.projection_matrix() * glue.glue_matrix();
        tracing::debug!(
            dofs = transformation_matrix.ncols(),
            local_dofs = transformation_matrix.nrows(),
            ?form,
            "Ansatz space assembled"
        );
        Ok(Self {
            super_space,
            knot_repetition,
            form,
            transformation_matrix: Arc::new(transformation_matrix),
        })
    }

    pub fn super_space(&self) -> &SuperSpace {
        &self.super_space
    }

    pub fn knot_repetition(&self) -> usize {
        self.knot_repetition
    }

    pub fn form(&self) -> DifferentialForm {
        self.form
    }

    /// Maps smooth coefficients to element-local Bernstein coefficients.
    pub fn transformation_matrix(&self) -> &CscMatrix<f64> {
        &self.transformation_matrix
    }

    /// Dimension of the glued spline space.
    pub fn number_of_dofs(&self) -> usize {
        self.transformation_matrix.ncols()
    }

    pub fn polynomial_degree(&self) -> usize {
        self.super_space.polynomial_degree()
    }

    pub fn refinement_level(&self) -> usize {
        self.super_space.refinement_level()
    }

    pub fn number_of_elements(&self) -> usize {
        self.super_space.number_of_elements()
    }

    pub fn geometry(&self) -> &Geometry {
        self.super_space.geometry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix as M;
    use crate::geometry::Patch;

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
    fn test_discontinuous_space_dimension() {
        // degree 0 with full knot repetition: one dof per element
        let space =
            AnsatzSpace::new(&screen(), 2, 0, 1, DifferentialForm::Discontinuous).unwrap();
        assert_eq!(space.number_of_dofs(), 16);
        assert_eq!(space.number_of_elements(), 16);
    }

    #[test]
    fn test_continuous_space_dimension() {
        // degree 2, single knots: (2 + 1 + 3)^2 smooth splines on one patch
        let space = AnsatzSpace::new(&screen(), 2, 2, 1, DifferentialForm::Continuous).unwrap();
        assert_eq!(space.number_of_dofs(), 36);
        assert_eq!(space.transformation_matrix().nrows(), 9 * 16);
    }

    #[test]
    fn test_transformation_preserves_constants() {
        // the constant one is in the space; its Bernstein coefficients on
        // every element must form a partition of unity
        let space = AnsatzSpace::new(&screen(), 1, 1, 1, DifferentialForm::Continuous).unwrap();
        let ones = nalgebra::DVector::repeat(space.number_of_dofs(), 1.0);
        let local = space.transformation_matrix() * &ones;
        let basis = space.super_space().basis(&nalgebra::Vector2::new(0.3, 0.6));
        for element in 0..space.number_of_elements() {
            let block = local.rows(4 * element, 4);
            assert!((block.dot(&basis) - 1.0).abs() < 1e-12);
        }
    }
}
