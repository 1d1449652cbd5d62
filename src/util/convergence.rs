//! Error measures and rate estimates for convergence studies.

use nalgebra::{DVector, Vector3};

use crate::ansatz::{AnsatzSpace, FunctionEvaluator};
use crate::quadrature;

/// Largest pointwise deviation of an evaluated potential from a
/// reference solution on a grid.
pub fn max_pointwise_error<F>(
    potential: &DVector<f64>,
    grid: &[Vector3<f64>],
    reference: F,
) -> f64
where
    F: Fn(&Vector3<f64>) -> f64,
{
    potential
        .iter()
        .zip(grid)
        .map(|(&value, point)| (value - reference(point)).abs())
        .fold(0.0, f64::max)
}

/// L2 distance on the surface between a discrete function and a
/// reference.
pub fn surface_l2_error<F>(
    space: &AnsatzSpace,
    coefficients: &DVector<f64>,
    reference: F,
    quadrature_degree: usize,
) -> f64
where
    F: Fn(&Vector3<f64>) -> f64,
{
    let super_space = space.super_space();
    let tree = super_space.mesh().element_tree();
    let evaluator = FunctionEvaluator::new(space, coefficients);
    let rule = quadrature::tensor_rule(quadrature_degree);
    let mut total = 0.0;
    for element in tree.leafs() {
        let h = element.h();
        for (xi, &w) in rule.xi.iter().zip(&rule.weights) {
            let qp = super_space.map_to_surface(element, xi, w);
            let difference = reference(&qp.point) - evaluator.evaluate(element, &qp);
            total += qp.integration_element() * w * h * h * difference * difference;
        }
    }
    total.sqrt()
}

/// Least squares estimate of the convergence rate from errors on
/// consecutive uniform refinements. Needs at least two levels.
pub fn estimate_rate_of_convergence(errors: &[f64]) -> f64 {
    debug_assert!(errors.len() >= 2);
    let n = errors.len() as f64;
    let mean_level = (errors.len() - 1) as f64 / 2.0;
    let mean_log = errors.iter().map(|e| e.abs().log2()).sum::<f64>() / n;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, error) in errors.iter().enumerate() {
        let dx = i as f64 - mean_level;
        numerator += dx * (error.abs().log2() - mean_log);
        denominator += dx * dx;
    }
    -numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    use crate::geometry::{Geometry, Patch};
    use crate::operators::DifferentialForm;

    #[test]
    fn test_rate_of_exactly_quartering_errors() {
        let errors = [1.0, 0.25, 0.0625, 0.015625];
        assert!((estimate_rate_of_convergence(&errors) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rate_averages_noisy_errors() {
        // one level stalls, the fit still sees the overall trend
        let errors = [1.0, 0.5, 0.5, 0.125];
        let rate = estimate_rate_of_convergence(&errors);
        assert!(rate > 0.9 && rate < 1.1);
    }

    #[test]
    fn test_max_pointwise_error() {
        let grid = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ];
        let potential = DVector::from_row_slice(&[0.1, 1.0, 1.5]);
        let error = max_pointwise_error(&potential, &grid, |p| p.x + p.y);
        assert!((error - 0.5).abs() < 1e-14);
    }

    fn screen_space(level: usize, degree: usize) -> AnsatzSpace {
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(
            &[
                DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]),
                DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]),
                DMatrix::zeros(2, 2),
                DMatrix::repeat(2, 2, 1.0),
            ],
            &knots,
            &knots,
        )
        .unwrap();
        AnsatzSpace::new(
            &Geometry::from_patches(vec![patch]),
            level,
            degree,
            1,
            DifferentialForm::Discontinuous,
        )
        .unwrap()
    }

    #[test]
    fn test_surface_l2_error_of_representable_function() {
        let space = screen_space(2, 1);
        let h = 0.25;
        // the scaled constant one is in every discrete space
        let coefficients = DVector::repeat(space.number_of_dofs(), h);
        let error = surface_l2_error(&space, &coefficients, |_| 1.0, 4);
        assert!(error < 1e-12);
        // against zero the error is the L2 norm of one, the screen area
        let norm = surface_l2_error(&space, &coefficients, |_| 0.0, 4);
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
