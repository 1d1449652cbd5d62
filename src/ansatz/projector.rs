//! Change of basis from patch-global B-splines to element-local Bernstein
//! polynomials.
//!
//! For every B-spline of the continuous space the projector solves one local
//! interpolation problem per element in its support, yielding the Bernstein
//! coefficients that represent the spline there.

use nalgebra::DMatrix;
use nalgebra_sparse::{coo::CooMatrix, csc::CscMatrix};

use crate::error::AppError;
use crate::operators::DifferentialForm;
use crate::spline::deboor::deboor;
use crate::spline::knots::make_uniform_knot_vector;
use crate::spline::localize::{interpolation_matrix, make_interpolation_mask};
use crate::util::constants::PROJECTOR_TOLERANCE;

use super::superspace::SuperSpace;

/// Sparse change of basis. Rows enumerate element-local Bernstein dofs in
/// leaf order, columns the tensor product B-spline dofs of all patches.
#[derive(Debug)]
pub struct Projector {
    knot_repetition: usize,
    dofs_before: usize,
    dofs_after: usize,
    matrix: CscMatrix<f64>,
}

impl Projector {
    pub fn new(
        super_space: &SuperSpace,
        knot_repetition: usize,
        form: DifferentialForm,
    ) -> Result<Self, AppError> {
        if form == DifferentialForm::Continuous {
            if super_space.polynomial_degree() < 1 {
                return Err(AppError::Ansatz(
                    "a globally continuous space needs polynomial degree 1 or larger".into(),
                ));
            }
            if knot_repetition > super_space.polynomial_degree() {
                return Err(AppError::Ansatz(format!(
                    "knot repetition {knot_repetition} breaks continuity at degree {}",
                    super_space.polynomial_degree()
                )));
            }
        }
        let matrix = make_projection_matrix(super_space, knot_repetition)?;
        Ok(Self {
            knot_repetition,
            dofs_before: matrix.nrows(),
            dofs_after: matrix.ncols(),
            matrix,
        })
    }

    pub fn knot_repetition(&self) -> usize {
        self.knot_repetition
    }

    pub fn projection_matrix(&self) -> &CscMatrix<f64> {
        &self.matrix
    }

    pub fn dofs_before(&self) -> usize {
        self.dofs_before
    }

    pub fn dofs_after(&self) -> usize {
        self.dofs_after
    }
}

fn make_projection_matrix(
    super_space: &SuperSpace,
    knot_repetition_in: usize,
) -> Result<CscMatrix<f64>, AppError> {
    let degree = super_space.polynomial_degree();
    let order = degree + 1;
    let n = 1usize << super_space.refinement_level();
    let number_of_patches = super_space.number_of_patches();
    // a repetition of the full order makes the splines discontinuous
    let knot_repetition = knot_repetition_in.min(order);
    let knots = make_uniform_knot_vector(order, n - 1, knot_repetition);
    let c_dim_1d = knots.len() - order;
    let c_dim = c_dim_1d * c_dim_1d;
    let mask = make_interpolation_mask(order);
    // the tensor product interpolation factorizes into one Bernstein
    // collocation inverse per direction
    let inverse = interpolation_matrix(degree, &mask)?;

    let dofs_before = order * order * n * n * number_of_patches;
    let dofs_after = c_dim * number_of_patches;
    let mut triplets = CooMatrix::new(dofs_before, dofs_after);

    for (element_number, element) in super_space.mesh().element_tree().leafs().enumerate() {
        let h = element.h();
        let mid_x = element.llc.x + 0.5 * h;
        let mid_y = element.llc.y + 0.5 * h;

        // splines whose support contains the element midpoint
        let nonzero_dofs_x: Vec<usize> = (0..c_dim_1d)
            .filter(|&dof| knots[dof] <= mid_x && knots[dof + order] >= mid_x)
            .collect();
        let nonzero_dofs_y: Vec<usize> = (0..c_dim_1d)
            .filter(|&dof| knots[dof] <= mid_y && knots[dof + order] >= mid_y)
            .collect();

        let local_mask_x: Vec<f64> = mask.iter().map(|&m| element.llc.x + h * m).collect();
        let local_mask_y: Vec<f64> = mask.iter().map(|&m| element.llc.y + h * m).collect();

        for &dof_y in &nonzero_dofs_y {
            let mut unit_y = DMatrix::zeros(1, c_dim_1d);
            unit_y[(0, dof_y)] = 1.0;
            let values_y = deboor(&unit_y, &knots, &local_mask_y);
            let coefficients_y = &inverse * values_y.transpose();
            for &dof_x in &nonzero_dofs_x {
                let mut unit_x = DMatrix::zeros(1, c_dim_1d);
                unit_x[(0, dof_x)] = 1.0;
                let values_x = deboor(&unit_x, &knots, &local_mask_x);
                let coefficients_x = &inverse * values_x.transpose();

                for iy in 0..order {
                    for ix in 0..order {
                        let coefficient = coefficients_x[(ix, 0)] * coefficients_y[(iy, 0)];
                        if coefficient.abs() > PROJECTOR_TOLERANCE {
                            triplets.push(
                                element_number * order * order + iy * order + ix,
                                element.patch as usize * c_dim + c_dim_1d * dof_y + dof_x,
                                coefficient,
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(CscMatrix::from(&triplets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix as M, Vector2};
    use crate::geometry::{Geometry, Patch};

    fn screen_space(level: usize, degree: usize) -> SuperSpace {
        let x = M::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]);
        let y = M::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let z = M::zeros(2, 2);
        let w = M::repeat(2, 2, 1.0);
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(&[x, y, z, w], &knots, &knots).unwrap();
        SuperSpace::new(&Geometry::from_patches(vec![patch]), level, degree).unwrap()
    }

    #[test]
    fn test_discontinuous_projector_is_square_permutation_free() {
        // full knot repetition: the spline space is the Bernstein space
        let space = screen_space(1, 1);
        let projector =
            Projector::new(&space, 2, DifferentialForm::Discontinuous).unwrap();
        assert_eq!(projector.dofs_before(), 16);
        assert_eq!(projector.dofs_after(), 16);
    }

    #[test]
    fn test_continuous_projector_dof_count() {
        // degree 2, repetition 1, 2 elements per direction: 4 splines per
        // direction on each patch
        let space = screen_space(1, 2);
        let projector = Projector::new(&space, 1, DifferentialForm::Continuous).unwrap();
        assert_eq!(projector.dofs_before(), 36);
        assert_eq!(projector.dofs_after(), 16);
    }

    #[test]
    fn test_projected_splines_partition_unity() {
        // B-splines sum to one, so the projected Bernstein coefficients of
        // the all-ones dof vector must reproduce the constant one
        let space = screen_space(1, 2);
        let projector = Projector::new(&space, 1, DifferentialForm::Continuous).unwrap();
        let ones = nalgebra::DVector::repeat(projector.dofs_after(), 1.0);
        let local = projector.projection_matrix() * &ones;
        let order = 3;
        let s = Vector2::new(0.3, 0.7);
        let basis = space.basis(&s);
        for element_number in 0..space.number_of_elements() {
            let coefficients = local.rows(element_number * order * order, order * order);
            let value = coefficients.dot(&basis);
            assert!((value - 1.0).abs() < 1e-10, "element {element_number}: {value}");
        }
    }

    #[test]
    fn test_continuity_guard() {
        let space = screen_space(1, 1);
        assert!(Projector::new(&space, 2, DifferentialForm::Continuous).is_err());
    }
}
