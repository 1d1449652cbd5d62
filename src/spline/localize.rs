//! Interpolation helpers used to localize splines in the Bernstein basis.

use nalgebra::DMatrix;

use crate::error::AppError;
use crate::spline::bernstein;
use crate::util::constants::MAX_POLYNOMIAL_DEGREE;

/// Maps `x` from [a,b] to [0,1]. The identity case is by far the most
/// common one and skips the division.
pub fn rescale(x: f64, a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 1.0 {
        x
    } else {
        (x - a) / (b - a)
    }
}

/// Equidistant interpolation points in the open unit interval. Not optimal,
/// but sufficient for the interpolation problems that come up here.
pub fn make_interpolation_mask(order: usize) -> Vec<f64> {
    let h = 1.0 / (order + 1) as f64;
    (0..order).map(|i| (i + 1) as f64 * h).collect()
}

/// Interpolation points for a unique knot vector, the mask repeated per
/// knot span.
pub fn make_interpolation_points(unique_knots: &[f64], mask: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity((unique_knots.len() - 1) * mask.len());
    for window in unique_knots.windows(2) {
        for &m in mask {
            out.push(window[0] + m * (window[1] - window[0]));
        }
    }
    out
}

/// Inverse of the Bernstein collocation matrix at the mask points. Applying
/// it to point values yields coefficients in the Bernstein basis on [0,1].
pub fn interpolation_matrix(degree: usize, mask: &[f64]) -> Result<DMatrix<f64>, AppError> {
    debug_assert_eq!(mask.len(), degree + 1);
    let mut values = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
    let mut collocation = DMatrix::zeros(degree + 1, degree + 1);
    for (j, &x) in mask.iter().enumerate() {
        bernstein::eval_basis(degree, &mut values, x);
        for i in 0..=degree {
            collocation[(j, i)] = values[i];
        }
    }
    collocation
        .try_inverse()
        .ok_or_else(|| AppError::Numerical("singular Bernstein collocation matrix".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(0.3, 0.0, 1.0), 0.3);
        assert_eq!(rescale(0.5, 0.0, 2.0), 0.25);
        assert_eq!(rescale(1.5, 1.0, 2.0), 0.5);
    }

    #[test]
    fn test_interpolation_mask() {
        let mask = make_interpolation_mask(3);
        assert_eq!(mask, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_interpolation_points() {
        let unique = vec![0.0, 0.5, 1.0];
        let mask = vec![0.5];
        assert_eq!(make_interpolation_points(&unique, &mask), vec![0.25, 0.75]);
    }

    #[test]
    fn test_interpolation_recovers_coefficients() {
        // Sample a Bernstein polynomial at the mask and solve back.
        let degree = 4;
        let mask = make_interpolation_mask(degree + 1);
        let inverse = interpolation_matrix(degree, &mask).unwrap();
        let coefficients = [0.3, -1.2, 0.0, 2.5, 0.7];
        let samples = DVector::from_iterator(
            degree + 1,
            mask.iter()
                .map(|&x| bernstein::eval_coefficients(degree, &coefficients, x)),
        );
        let solved = &inverse * samples;
        for i in 0..=degree {
            assert!((solved[i] - coefficients[i]).abs() < 1e-10);
        }
    }
}
