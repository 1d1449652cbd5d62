//! Cox-De Boor evaluation of B-spline curves and tensor product surfaces.
//!
//! By the book and not particularly fast. The assembly never calls this in a
//! hot loop, it is only used to set up patches and projection matrices.

use nalgebra::{DMatrix, DVector};

/// Evaluates each row of `control_points` as a B-spline curve over the
/// given knot vector. The result has one column per evaluation point.
pub fn deboor(
    control_points: &DMatrix<f64>,
    knot_vector: &[f64],
    evaluation_points: &[f64],
) -> DMatrix<f64> {
    let cols = control_points.ncols();
    let rows = control_points.nrows();
    let degree = knot_vector.len() - cols - 1;
    let mut out = DMatrix::zeros(rows, evaluation_points.len());
    let mut ws = vec![0.0; degree + 1];
    let mut temp = DMatrix::zeros(rows, degree + 1);
    for (j, &x) in evaluation_points.iter().enumerate() {
        let mut l = 0;
        while knot_vector[l] <= x && l != cols {
            l += 1;
        }
        let l = l - 1;
        temp.copy_from(&control_points.view((0, l - degree), (rows, degree + 1)));
        for k in (1..=degree).rev() {
            for (i, w) in ws.iter_mut().enumerate().take(k) {
                *w = (x - knot_vector[l - k + 1 + i])
                    / (knot_vector[l + 1 + i] - knot_vector[l - k + 1 + i]);
            }
            for i in 0..k {
                let col = temp.column(i + 1) * ws[i] + temp.column(i) * (1.0 - ws[i]);
                temp.set_column(i, &col);
            }
        }
        out.set_column(j, &temp.column(0));
    }
    out
}

/// Tensor product B-spline evaluation. The control net has the y index on
/// the rows and the x index on the columns; the output holds the surface
/// values with x points on the rows and y points on the columns.
pub fn deboor_tensor_product(
    control_points: &DMatrix<f64>,
    knots_x: &[f64],
    knots_y: &[f64],
    evaluation_points_x: &[f64],
    evaluation_points_y: &[f64],
) -> DMatrix<f64> {
    let tmp = deboor(control_points, knots_x, evaluation_points_x).transpose();
    deboor(&tmp, knots_y, evaluation_points_y)
}

/// Unrolls a matrix into a vector, y direction first, so that
/// `out[i * ny + j] = input[(j, i)]`.
pub fn unroll(input: &DMatrix<f64>) -> DVector<f64> {
    // Column-major flatten, which is exactly the storage order.
    DVector::from_column_slice(input.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::knots::{make_bezier_knot_vector, make_uniform_knot_vector};

    #[test]
    fn test_deboor_reproduces_bezier_line() {
        // Degree 2 Bezier coefficients of f(x) = x.
        let control = DMatrix::from_row_slice(1, 3, &[0.0, 0.5, 1.0]);
        let knots = make_bezier_knot_vector(3);
        let pts = vec![0.0, 0.25, 0.5, 0.75, 1.0 - 1e-12];
        let values = deboor(&control, &knots, &pts);
        for (j, &x) in pts.iter().enumerate() {
            assert!((values[(0, j)] - x).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deboor_partition_of_unity() {
        // All-ones coefficients reproduce one for any knot vector.
        let knots = make_uniform_knot_vector(3, 3, 1);
        let n = knots.len() - 3;
        let control = DMatrix::from_element(1, n, 1.0);
        let pts = vec![0.05, 0.3, 0.55, 0.8, 0.99];
        let values = deboor(&control, &knots, &pts);
        for j in 0..pts.len() {
            assert!((values[(0, j)] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tensor_product_bilinear() {
        // Bilinear patch z = x * y.
        let control = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 1.0]);
        let knots = make_bezier_knot_vector(2);
        let px = vec![0.2, 0.7];
        let py = vec![0.1, 0.9];
        let values = deboor_tensor_product(&control, &knots, &knots, &px, &py);
        for (i, &x) in px.iter().enumerate() {
            for (j, &y) in py.iter().enumerate() {
                assert!((values[(i, j)] - x * y).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_unroll_is_y_fastest() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let v = unroll(&m);
        assert_eq!(v.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
