//! Construction and processing of knot vectors.

use crate::error::AppError;
use crate::util::constants::GENERIC_TOLERANCE;

/// Clamped knot vector of a Bezier segment: `order` zeros and `order` ones.
pub fn make_bezier_knot_vector(order: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * order);
    out.extend(std::iter::repeat(0.0).take(order));
    out.extend(std::iter::repeat(1.0).take(order));
    out
}

/// Uniform clamped knot vector on [0,1] with `interior` interior knots,
/// each repeated `repetition` times.
pub fn make_uniform_knot_vector(order: usize, interior: usize, repetition: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * order + interior * repetition);
    let h = 1.0 / (interior + 1) as f64;
    out.extend(std::iter::repeat(0.0).take(order));
    for i in 1..=interior {
        out.extend(std::iter::repeat(i as f64 * h).take(repetition));
    }
    out.extend(std::iter::repeat(1.0).take(order));
    out
}

/// Polynomial order (degree + 1) of a clamped knot vector, read off as the
/// number of leading zeros.
pub fn polynomial_order_from_knots(knot_vector: &[f64]) -> usize {
    const TOL: f64 = 1e-7;
    for (i, &knot) in knot_vector.iter().enumerate().skip(1) {
        if knot > TOL {
            return i;
        }
    }
    0
}

/// Collapses repeated knots, up to [`GENERIC_TOLERANCE`].
pub fn extract_unique_knots(knot_vector: &[f64]) -> Vec<f64> {
    let mut out = vec![knot_vector[0]];
    for &knot in &knot_vector[1..] {
        if knot > out[out.len() - 1] + GENERIC_TOLERANCE {
            out.push(knot);
        }
    }
    out
}

/// Checks that a knot vector is finite, monotone and spans at least one
/// knot interval. Everything downstream assumes these properties.
pub fn validate_knot_vector(knot_vector: &[f64]) -> Result<(), AppError> {
    if knot_vector.iter().any(|knot| !knot.is_finite()) {
        return Err(AppError::KnotVector("knots must be finite".into()));
    }
    for window in knot_vector.windows(2) {
        if window[1] < window[0] {
            return Err(AppError::KnotVector(format!(
                "knots must not decrease, got {} after {}",
                window[1], window[0]
            )));
        }
    }
    if extract_unique_knots(knot_vector).len() < 2 {
        return Err(AppError::KnotVector(
            "a knot vector needs at least two distinct knots".into(),
        ));
    }
    Ok(())
}

/// Interval index of `x` in a unique knot vector, up to tolerance.
pub fn find_location_in_knot_vector(x: f64, unique_knots: &[f64]) -> usize {
    let size = unique_knots.len();
    if x.abs() < GENERIC_TOLERANCE {
        return 0;
    }
    for i in 0..size - 1 {
        if unique_knots[i] <= x && unique_knots[i + 1] > x {
            return i;
        }
    }
    size - 2
}
