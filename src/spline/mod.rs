//! Spline backend: Bernstein polynomials, De Boor evaluation, knot vectors
//! and localization helpers.

pub mod bernstein;
pub mod deboor;
pub mod extraction;
pub mod knots;
pub mod localize;
