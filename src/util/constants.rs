//! Numeric tolerances and limits shared across the solver.

/// Tolerance for generic floating point comparisons, e.g. collapsing
/// repeated knots into a unique knot vector.
pub const GENERIC_TOLERANCE: f64 = 1e-6;

/// Largest supported polynomial degree of the tensor product basis.
pub const MAX_POLYNOMIAL_DEGREE: usize = 20;

/// Largest tensor product Gauss rule kept in the quadrature cache.
pub const MAXIMUM_QUADRATURE_DEGREE: usize = 50;

/// Tolerance for identifying mesh vertices across elements and patches.
pub const POINT_COMPARISON_TOLERANCE: f64 = 1e-9;

/// Entries of the projector below this threshold are dropped from the
/// sparse transformation matrix.
pub const PROJECTOR_TOLERANCE: f64 = 1e-4;

/// Corners of the reference element, counterclockwise starting at the
/// origin. Row 0 holds the x coordinates, row 1 the y coordinates.
pub const REFERENCE_CORNERS: [[f64; 4]; 2] = [[0., 1., 1., 0.], [0., 0., 1., 1.]];

/// Lower left corners of the four sons in the reference element.
pub const SON_LLCS: [[f64; 4]; 2] = [[0., 0.5, 0.5, 0.], [0., 0., 0.5, 0.5]];

/// Edge midpoints of the reference element, index 4 is the center.
pub const EDGE_MIDPOINTS: [[f64; 5]; 2] = [[0.5, 1., 0.5, 0., 0.5], [0., 0.5, 1., 0.5, 0.5]];

/// Comparison against zero up to [`GENERIC_TOLERANCE`].
pub fn is_almost_zero(x: f64) -> bool {
    x.abs() < GENERIC_TOLERANCE
}
