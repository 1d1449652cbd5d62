//! Interpolation based multipole machinery of the compressed matrix.
//!
//! Admissible blocks are replaced by polynomial interpolation of the
//! kernel on tensorized Chebyshev points. Moment matrices map local
//! basis coefficients to interpolation coefficients on the finest
//! cluster level, transfer matrices move them up the tree, so a single
//! kernel interpolation per block is all that remains.

use nalgebra::{DMatrix, DMatrixView, DVector, DVectorView, Dyn, Vector2};

use crate::ansatz::SuperSpace;
use crate::cluster::ElementTreeNode;
use crate::operators::LinearOperator;
use crate::quadrature;
use crate::spline::bernstein;
use crate::util::constants::MAX_POLYNOMIAL_DEGREE;

/// Chebyshev points on the unit interval, in increasing order.
pub fn chebyshev_points(number_of_points: usize) -> DVector<f64> {
    let alpha = std::f64::consts::PI / (2.0 * number_of_points as f64);
    DVector::from_fn(number_of_points, |i, _| {
        0.5 * (alpha * (2.0 * (number_of_points - i) as f64 - 1.0)).cos() + 0.5
    })
}

/// Divided difference coefficients of all Lagrange polynomials on the
/// given points. Column `i` holds the Newton form of the polynomial that
/// is one at point `i` and zero at the others.
pub fn lagrange_polynomials(points: &DVector<f64>) -> DMatrix<f64> {
    let n = points.len();
    let mut table = DMatrix::identity(n, n);
    for i in 0..n {
        for j in 1..n {
            for k in (j..n).rev() {
                table[(k, i)] = (table[(k, i)] - table[(k - 1, i)]) / (points[k] - points[k - j]);
            }
        }
    }
    table
}

/// Evaluates a polynomial in Newton form by the Horner scheme.
pub fn evaluate_polynomial(coefficients: DVectorView<f64>, points: &DVector<f64>, xi: f64) -> f64 {
    let n = coefficients.len();
    let mut value = coefficients[n - 1];
    for i in (0..n - 1).rev() {
        value = value * (xi - points[i]) + coefficients[i];
    }
    value
}

/// Transfer matrices of all four sons, concatenated so that the stacked
/// son moments of one cluster map to the parent moments in a single
/// product. The blocks are permuted to match the z-order of the sons.
pub fn transfer_matrices(number_of_points: usize) -> DMatrix<f64> {
    let n = number_of_points;
    let np2 = n * n;
    let x = chebyshev_points(n);
    let lagrange = lagrange_polynomials(&x);
    // values of all Lagrange polynomials on the points scaled to the
    // lower and upper half of the interval
    let mut e = DMatrix::zeros(n, 2 * n);
    for j in 0..n {
        for i in 0..n {
            e[(i, j)] = evaluate_polynomial(lagrange.column(j), &x, 0.5 * x[i]);
            e[(i, j + n)] = evaluate_polynomial(lagrange.column(j), &x, 0.5 * x[i] + 0.5);
        }
    }
    let permutation = [0, 3, 1, 2];
    let mut transfer = DMatrix::zeros(np2, 4 * np2);
    for (k, &block) in permutation.iter().enumerate() {
        for i in 0..n {
            for ii in 0..n {
                for j in 0..n {
                    for jj in 0..n {
                        transfer[(j * n + jj, i * n + ii + np2 * block)] =
                            e[(i, j + (k / 2) * n)] * e[(ii, jj + (k % 2) * n)];
                    }
                }
            }
        }
    }
    transfer
}

/// One dimensional moments: integrals of every Lagrange polynomial on
/// the cluster against every scaled basis function of every element of
/// the cluster.
fn moment_1d(
    super_space: &SuperSpace,
    cluster_level: usize,
    cluster_refinements: usize,
    number_of_points: usize,
) -> DMatrix<f64> {
    let n = 1usize << cluster_refinements;
    let h = 1.0 / n as f64;
    let cluster_width = 1.0 / f64::from(1 << cluster_level as i32);
    let polynomial_degree = super_space.polynomial_degree();
    let order = polynomial_degree + 1;
    let rule = quadrature::rule(
        (0.5 * (number_of_points + polynomial_degree) as f64 - 1.0).ceil() as usize,
    );
    let x = chebyshev_points(number_of_points);
    let lagrange = lagrange_polynomials(&x);
    let scale = (h * cluster_width).sqrt();
    let mut basis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
    let mut moment = DMatrix::zeros(number_of_points, n * order);
    for i in 0..number_of_points {
        for j in 0..n {
            for (&xi, &w) in rule.points.iter().zip(&rule.weights) {
                let weight = w
                    * scale
                    * evaluate_polynomial(lagrange.column(i), &x, h * (j as f64 + xi));
                bernstein::eval_basis(polynomial_degree, &mut basis, xi);
                for m in 0..order {
                    moment[(i, j * order + m)] += weight * basis[m];
                }
            }
        }
    }
    moment
}

/// Position of every element of a z-ordered cluster on the regular grid,
/// along the first and second parameter direction.
fn zorder_positions(cluster_refinements: usize) -> (Vec<usize>, Vec<usize>) {
    let mut s = vec![0usize; 1 << (2 * cluster_refinements)];
    let mut t = vec![0usize; 1 << (2 * cluster_refinements)];
    for j in 0..cluster_refinements {
        let filled = 1usize << (2 * j);
        for i in (0..filled).rev() {
            let (si, ti) = (s[i], t[i]);
            s[4 * i] = 2 * si;
            s[4 * i + 1] = 2 * si + 1;
            s[4 * i + 2] = 2 * si + 1;
            s[4 * i + 3] = 2 * si;
            t[4 * i] = 2 * ti;
            t[4 * i + 1] = 2 * ti;
            t[4 * i + 2] = 2 * ti + 1;
            t[4 * i + 3] = 2 * ti + 1;
        }
    }
    (s, t)
}

/// Tensor product moments on the unit square. Row `i * n + j` pairs the
/// Lagrange polynomial `i` in the first with polynomial `j` in the
/// second direction; columns run over the cluster elements in z-order
/// and their local shape functions.
pub fn moment_matrix(
    super_space: &SuperSpace,
    cluster_level: usize,
    cluster_refinements: usize,
    number_of_points: usize,
) -> DMatrix<f64> {
    let moment_1d = moment_1d(
        super_space,
        cluster_level,
        cluster_refinements,
        number_of_points,
    );
    let order = super_space.polynomial_degree() + 1;
    let q = order * order;
    let elements = 1usize << (2 * cluster_refinements);
    let (index_s, index_t) = zorder_positions(cluster_refinements);
    let mut moment = DMatrix::zeros(
        number_of_points * number_of_points,
        moment_1d.ncols() * moment_1d.ncols(),
    );
    for i in 0..number_of_points {
        for j in 0..number_of_points {
            for k in 0..elements {
                for m1 in 0..order {
                    for m2 in 0..order {
                        moment[(i * number_of_points + j, q * k + m1 * order + m2)] = moment_1d
                            [(i, index_s[k] * order + m2)]
                            * moment_1d[(j, index_t[k] * order + m1)];
                    }
                }
            }
        }
    }
    moment
}

/// Tensorized interpolation points matching the rows of the moment
/// matrix.
pub fn interpolation_points(number_of_points: usize) -> Vec<Vector2<f64>> {
    let x = chebyshev_points(number_of_points);
    let mut points = Vec::with_capacity(number_of_points * number_of_points);
    for i in 0..number_of_points {
        for j in 0..number_of_points {
            points.push(Vector2::new(x[i], x[j]));
        }
    }
    points
}

/// Interpolates the kernel on the tensorized interpolation points of an
/// admissible cluster pair.
pub fn interpolate_kernel<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    points: &[Vector2<f64>],
    cluster_1: &ElementTreeNode,
    cluster_2: &ElementTreeNode,
) -> DMatrix<f64> {
    let n = points.len();
    let mut interpolant = DMatrix::zeros(n, n);
    for (i, xi) in points.iter().enumerate() {
        let qp1 = super_space.map_to_surface(cluster_1, xi, 1.0);
        for (j, eta) in points.iter().enumerate() {
            let qp2 = super_space.map_to_surface(cluster_2, eta, 1.0);
            interpolant[(i, j)] = operator.evaluate_fmm_interpolation(&qp1, &qp2);
        }
    }
    interpolant
}

/// Moments of every cluster on every level, from the finest cluster
/// level up to the patches. Level `i` holds one column per cluster, in
/// id order.
pub fn forward_transformation(
    moments: &DMatrix<f64>,
    transfers: &DMatrix<f64>,
    steps: usize,
    long_rhs_matrix: &DMatrix<f64>,
) -> Vec<DMatrix<f64>> {
    let mut levels = Vec::with_capacity(steps + 1);
    levels.push(moments * long_rhs_matrix);
    for i in 0..steps {
        let rows = levels[i].nrows();
        let cols = levels[i].ncols();
        // four z-order consecutive columns are the sons of one cluster
        let stacked = DMatrixView::from_slice(levels[i].as_slice(), 4 * rows, cols / 4);
        levels.push(transfers * stacked);
    }
    levels
}

/// Adjoint of the forward transformation. Consumes the per level blocks
/// accumulated by the admissible matrix blocks and returns their total
/// contribution on the finest level.
pub fn backward_transformation(
    moments: &DMatrix<f64>,
    transfers: &DMatrix<f64>,
    steps: usize,
    mut long_dst_backward: Vec<DMatrix<f64>>,
) -> DVector<f64> {
    for i in (1..=steps).rev() {
        let spread = transfers.transpose() * &long_dst_backward[i];
        let rows = long_dst_backward[i - 1].nrows();
        let cols = long_dst_backward[i - 1].ncols();
        long_dst_backward[i - 1] += spread.reshape_generic(Dyn(rows), Dyn(cols));
    }
    let long_dst_matrix = moments.transpose() * &long_dst_backward[0];
    DVector::from_column_slice(long_dst_matrix.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix as M;

    use crate::geometry::{Geometry, Patch};

    #[test]
    fn test_chebyshev_points_are_symmetric() {
        let x = chebyshev_points(9);
        assert_eq!(x.len(), 9);
        for i in 0..9 {
            assert!(x[i] > 0.0 && x[i] < 1.0);
            assert!((x[i] + x[8 - i] - 1.0).abs() < 1e-14);
            if i > 0 {
                assert!(x[i] > x[i - 1]);
            }
        }
    }

    #[test]
    fn test_lagrange_polynomials_are_cardinal() {
        let x = chebyshev_points(7);
        let lagrange = lagrange_polynomials(&x);
        for i in 0..7 {
            for j in 0..7 {
                let value = evaluate_polynomial(lagrange.column(i), &x, x[j]);
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_transfer_reproduces_polynomials() {
        // interpolating a polynomial of matching degree on a half
        // interval is exact, so transferring the son values of a tensor
        // polynomial must reproduce its parent values
        let n = 5;
        let np2 = n * n;
        let x = chebyshev_points(n);
        let transfers = transfer_matrices(n);
        let f = |s: f64, t: f64| (s * s * s - 0.5 * s) * (t * t + 2.0 * t - 1.0);
        let parent = DVector::from_fn(np2, |r, _| f(x[r / n], x[r % n]));
        // son order from the z-curve with block order [0 2 3 1]
        let corners = [(0.0, 0.0), (0.5, 0.0), (0.5, 0.5), (0.0, 0.5)];
        let mut sons = DVector::zeros(4 * np2);
        for (k, &(s0, t0)) in corners.iter().enumerate() {
            for r in 0..np2 {
                sons[k * np2 + r] = f(s0 + 0.5 * x[r / n], t0 + 0.5 * x[r % n]);
            }
        }
        // reorder sons into the permuted block layout, then transfer;
        // expansion coefficients of interpolation are the point values
        let permutation = [0usize, 3, 1, 2];
        let mut stacked = DVector::zeros(4 * np2);
        for (k, &block) in permutation.iter().enumerate() {
            stacked
                .rows_mut(block * np2, np2)
                .copy_from(&sons.rows(k * np2, np2));
        }
        let transferred = &transfers * stacked;
        assert!((transferred - parent).norm() < 1e-12);
    }

    #[test]
    fn test_zorder_positions() {
        let (s, t) = zorder_positions(1);
        assert_eq!(s, vec![0, 1, 1, 0]);
        assert_eq!(t, vec![0, 0, 1, 1]);
        let (s, t) = zorder_positions(2);
        // element 5 is son 1 of parent 1, which sits at (1, 0)
        assert_eq!((s[5], t[5]), (3, 0));
        // element 14 is son 2 of parent 3, which sits at (0, 1)
        assert_eq!((s[14], t[14]), (1, 3));
    }

    fn screen_space(level: usize, degree: usize) -> SuperSpace {
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
        SuperSpace::new(&Geometry::from_patches(vec![patch]), level, degree).unwrap()
    }

    #[test]
    fn test_forward_transformation_matches_direct_moments() {
        // transferring the level 1 cluster moments up to the patch must
        // agree with moments computed directly on the whole patch
        let space = screen_space(2, 1);
        let number_of_points = 5;
        let fine = moment_matrix(&space, 1, 1, number_of_points);
        let direct = moment_matrix(&space, 0, 2, number_of_points);
        let transfers = transfer_matrices(number_of_points);
        let long_rhs = DVector::from_fn(direct.ncols(), |i, _| (0.37 * i as f64).sin());
        let rhs_fine = M::from_column_slice(fine.ncols(), 4, long_rhs.as_slice());
        let rhs_direct = M::from_column_slice(direct.ncols(), 1, long_rhs.as_slice());
        let forward = forward_transformation(&fine, &transfers, 1, &rhs_fine);
        assert_eq!(forward.len(), 2);
        assert!((&forward[1] - &direct * rhs_direct).norm() < 1e-12);
    }

    #[test]
    fn test_backward_is_adjoint_of_forward() {
        let space = screen_space(2, 0);
        let number_of_points = 4;
        let moments = moment_matrix(&space, 1, 1, number_of_points);
        let transfers = transfer_matrices(number_of_points);
        let long_rhs = DVector::from_fn(4 * moments.ncols(), |i, _| (0.11 * i as f64).cos());
        let rhs_matrix = M::from_column_slice(moments.ncols(), 4, long_rhs.as_slice());
        let forward = forward_transformation(&moments, &transfers, 1, &rhs_matrix);
        let downward: Vec<M<f64>> = forward
            .iter()
            .enumerate()
            .map(|(k, m)| M::from_fn(m.nrows(), m.ncols(), |i, j| ((i + 2 * j + k) as f64).sin()))
            .collect();
        let pairing: f64 = forward
            .iter()
            .zip(&downward)
            .map(|(f, d)| f.dot(d))
            .sum();
        let pulled = backward_transformation(&moments, &transfers, 1, downward);
        assert!((pulled.dot(&long_rhs) - pairing).abs() < 1e-12 * pairing.abs().max(1.0));
    }
}
