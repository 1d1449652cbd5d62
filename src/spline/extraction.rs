//! Bezier extraction via the solution of an interpolation problem.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::AppError;
use crate::spline::bernstein;
use crate::spline::deboor::{deboor_tensor_product, unroll};
use crate::spline::localize::{make_interpolation_mask, make_interpolation_points, rescale};

// Entries below this threshold are dropped from the projection. The
// relevant coefficients are >= 0.1, so this is uncritical.
const SPARSE_TOLERANCE: f64 = 0.001;

/// Value of the `pos`-th segmentwise Bernstein function of the given order
/// over a unique knot vector.
fn bezier_basis(unique_knots: &[f64], order: usize, pos: usize, pt: f64) -> f64 {
    let segment = pos / order;
    let local = pos % order;
    if pt > unique_knots[segment + 1] || pt < unique_knots[segment] {
        return 0.0;
    }
    bernstein::bernstein(
        local,
        order - 1,
        rescale(pt, unique_knots[segment], unique_knots[segment + 1]),
    )
}

/// Matrix mapping tensor product B-spline coefficients over the given knot
/// vectors to coefficients in the segmentwise Bernstein basis.
///
/// Rows are indexed by Bernstein functions (`ix * size_phi_y + iy`), columns
/// by B-splines (`i * size_psi_y + j`).
pub fn make_projection(
    knots_x: &[f64],
    knots_y: &[f64],
    unique_knots_x: &[f64],
    unique_knots_y: &[f64],
    order_x: usize,
    order_y: usize,
) -> Result<CscMatrix<f64>, AppError> {
    let size_phi_x = (unique_knots_x.len() - 1) * order_x;
    let size_phi_y = (unique_knots_y.len() - 1) * order_y;
    let size_phi = size_phi_x * size_phi_y;
    let size_psi_x = knots_x.len() - order_x;
    let size_psi_y = knots_y.len() - order_y;
    let size_psi = size_psi_x * size_psi_y;

    let mask_x = make_interpolation_mask(order_x);
    let mask_y = make_interpolation_mask(order_y);
    let points_x = make_interpolation_points(unique_knots_x, &mask_x);
    let points_y = make_interpolation_points(unique_knots_y, &mask_y);
    debug_assert_eq!(points_x.len(), size_phi_x);
    debug_assert_eq!(points_y.len(), size_phi_y);

    // Collocation of the Bernstein basis at the tensor product
    // interpolation points, then inverted once.
    let mut collocation = DMatrix::zeros(size_phi, size_phi);
    for iy in 0..size_phi_y {
        for ix in 0..size_phi_x {
            for y in 0..size_phi_y {
                for x in 0..size_phi_x {
                    collocation[(y * size_phi_x + x, ix * size_phi_y + iy)] =
                        bezier_basis(unique_knots_x, order_x, ix, points_x[x])
                            * bezier_basis(unique_knots_y, order_y, iy, points_y[y]);
                }
            }
        }
    }
    let solve = collocation.try_inverse().ok_or_else(|| {
        AppError::Numerical("singular collocation matrix in Bezier extraction".to_string())
    })?;

    // Interpolate every B-spline in the Bernstein basis.
    let mut projection = CooMatrix::new(size_phi, size_psi);
    let mut unit = DMatrix::zeros(size_psi_y, size_psi_x);
    for i in 0..size_psi_x {
        for j in 0..size_psi_y {
            unit[(j, i)] = 1.0;
            let samples = unroll(&deboor_tensor_product(
                &unit, knots_x, knots_y, &points_x, &points_y,
            ));
            let coefficients = &solve * samples;
            for (row, &value) in coefficients.iter().enumerate() {
                if value.abs() > SPARSE_TOLERANCE {
                    projection.push(row, i * size_psi_y + j, value);
                }
            }
            unit[(j, i)] = 0.0;
        }
    }

    Ok(CscMatrix::from(&projection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::knots::{extract_unique_knots, make_uniform_knot_vector};
    use nalgebra::DVector;

    #[test]
    fn test_projection_preserves_partition_of_unity() {
        // The all-ones spline maps to the all-ones Bernstein coefficients.
        let knots = make_uniform_knot_vector(3, 1, 1);
        let unique = extract_unique_knots(&knots);
        let projection = make_projection(&knots, &knots, &unique, &unique, 3, 3).unwrap();
        let n_splines = (knots.len() - 3) * (knots.len() - 3);
        let ones = DVector::from_element(n_splines, 1.0);
        let coefficients = &projection * &ones;
        for &c in coefficients.iter() {
            assert!((c - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_projection_is_identity_for_bezier_input() {
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        let unique = vec![0.0, 1.0];
        let projection = make_projection(&knots, &knots, &unique, &unique, 2, 2).unwrap();
        let dense = DMatrix::from(&projection);
        assert_eq!(dense.nrows(), 4);
        assert_eq!(dense.ncols(), 4);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dense[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }
}
