//! Singular quadrature for element pairs after Sauter and Schwab.
//!
//! Galerkin entries of boundary integral operators contain fourfold
//! integrals whose kernel is singular whenever the two elements touch.
//! Depending on whether the elements coincide, share an edge or share a
//! vertex, a Duffy-type coordinate transform removes the singularity and
//! a tensor Gauss rule of distance-dependent degree does the rest.

use nalgebra::{DMatrix, Vector2};

use crate::ansatz::SuperSpace;
use crate::cluster::ElementTreeNode;
use crate::error::AppError;
use crate::geometry::SurfacePoint;
use crate::operators::LinearOperator;
use crate::quadrature::{self, TensorQuadratureRule};
use crate::util::constants::MAXIMUM_QUADRATURE_DEGREE;

/// Relative position of two elements of the same refinement level, with
/// the rotations that move the shared feature to the reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementProximity {
    Separated,
    Identical,
    SharedEdge { rotation_1: usize, rotation_2: usize },
    SharedVertex { rotation_1: usize, rotation_2: usize },
}

/// Classifies an element pair and computes the distance of their
/// enclosing balls. On a regular mesh two distinct non-separated elements
/// share exactly one edge or one vertex.
pub fn compare_elements(e1: &ElementTreeNode, e2: &ElementTreeNode) -> (ElementProximity, f64) {
    if std::ptr::eq(e1, e2) {
        return (ElementProximity::Identical, 0.0);
    }
    let distance = ((e1.midpoint - e2.midpoint).norm() - e1.radius - e2.radius).max(0.0);
    if distance > 0.5 / f64::from(1 << e1.level) {
        return (ElementProximity::Separated, distance);
    }
    for rotation_1 in 0..4 {
        for rotation_2 in 0..4 {
            if e1.vertices[rotation_1] != e2.vertices[rotation_2] {
                continue;
            }
            // the first matching vertex either extends to a shared edge
            // ending at it or starting from it, or stays a lone vertex
            if e1.vertices[3] == e2.vertices[(rotation_2 + 1) % 4] {
                return (
                    ElementProximity::SharedEdge {
                        rotation_1: 3,
                        rotation_2,
                    },
                    distance,
                );
            }
            if e1.vertices[(rotation_1 + 1) % 4] == e2.vertices[(rotation_2 + 3) % 4] {
                return (
                    ElementProximity::SharedEdge {
                        rotation_1,
                        rotation_2: (rotation_2 + 3) % 4,
                    },
                    distance,
                );
            }
            return (
                ElementProximity::SharedVertex {
                    rotation_1,
                    rotation_2,
                },
                distance,
            );
        }
    }
    (ElementProximity::Separated, distance)
}

/// Rotates reference coordinates so that the shared feature sits at the
/// first vertex or edge.
fn tau(x: f64, y: f64, rotation: usize) -> Vector2<f64> {
    match rotation {
        1 => Vector2::new(1.0 - y, x),
        2 => Vector2::new(1.0 - x, 1.0 - y),
        3 => Vector2::new(y, 1.0 - x),
        _ => Vector2::new(x, y),
    }
}

/// Quadrature nodes of the far-field rule evaluated on every element,
/// indexed by element id. The weight carries one factor of the mesh
/// width, matching the scaling of the basis functions.
pub fn compute_ffield_qnodes(
    super_space: &SuperSpace,
    rule: &TensorQuadratureRule,
) -> Vec<Vec<SurfacePoint>> {
    let tree = super_space.mesh().element_tree();
    let h = tree.leaf(0).h();
    tree.leafs()
        .map(|element| {
            rule.xi
                .iter()
                .zip(&rule.weights)
                .map(|(xi, &w)| super_space.map_to_surface(element, xi, h * w))
                .collect()
        })
        .collect()
}

/// Evaluates all Galerkin integrals for one element pair, choosing the
/// regularization by the pair's proximity and the quadrature degree by
/// its distance.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_bilinear_form<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    e1: &ElementTreeNode,
    e2: &ElementTreeNode,
    ffield_qnodes_1: &[SurfacePoint],
    ffield_qnodes_2: &[SurfacePoint],
    interaction: &mut DMatrix<f64>,
) -> Result<(), AppError> {
    let polynomial_degree = super_space.polynomial_degree();
    let ffield_deg = operator.far_field_quadrature_degree(polynomial_degree);
    let (proximity, distance) = compare_elements(e1, e2);
    let nfield_deg = operator
        .near_field_quadrature_degree(polynomial_degree, distance, e1.level)
        .max(ffield_deg);
    if nfield_deg > MAXIMUM_QUADRATURE_DEGREE {
        return Err(AppError::Numerical(format!(
            "near field quadrature degree {nfield_deg} exceeds the synthesized rules"
        )));
    }
    let rule = quadrature::tensor_rule(nfield_deg);
    match proximity {
        ElementProximity::Separated => {
            if nfield_deg == ffield_deg {
                integrate0(operator, super_space, ffield_qnodes_1, ffield_qnodes_2, interaction);
            } else {
                integrate1(operator, super_space, e1, e2, rule, interaction);
            }
        }
        ElementProximity::Identical => integrate2(operator, super_space, e1, rule, interaction),
        ElementProximity::SharedEdge {
            rotation_1,
            rotation_2,
        } => integrate3(
            operator,
            super_space,
            e1,
            rotation_1,
            e2,
            rotation_2,
            rule,
            interaction,
        ),
        ElementProximity::SharedVertex {
            rotation_1,
            rotation_2,
        } => integrate4(
            operator,
            super_space,
            e1,
            rotation_1,
            e2,
            rotation_2,
            rule,
            interaction,
        ),
    }
    Ok(())
}

/// Far-field quadrature on precomputed nodes.
pub fn integrate0<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    qnodes_1: &[SurfacePoint],
    qnodes_2: &[SurfacePoint],
    interaction: &mut DMatrix<f64>,
) {
    interaction.fill(0.0);
    for qp1 in qnodes_1 {
        for qp2 in qnodes_2 {
            operator.evaluate_integrand(super_space, qp1, qp2, interaction);
        }
    }
}

/// Tensor product quadrature for separated elements that still need a
/// degree above the far-field rule.
pub fn integrate1<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    e1: &ElementTreeNode,
    e2: &ElementTreeNode,
    rule: &TensorQuadratureRule,
    interaction: &mut DMatrix<f64>,
) {
    interaction.fill(0.0);
    let h = e1.h();
    for (xi, &w1) in rule.xi.iter().zip(&rule.weights) {
        let qp1 = super_space.map_to_surface(e1, xi, h * w1);
        for (eta, &w2) in rule.xi.iter().zip(&rule.weights) {
            let qp2 = super_space.map_to_surface(e2, eta, h * w2);
            operator.evaluate_integrand(super_space, &qp1, &qp2, interaction);
        }
    }
}

/// Regularized quadrature for a coinciding element pair.
pub fn integrate2<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    element: &ElementTreeNode,
    rule: &TensorQuadratureRule,
    interaction: &mut DMatrix<f64>,
) {
    interaction.fill(0.0);
    let h = element.h();
    for (xi, &w1) in rule.xi.iter().zip(&rule.weights) {
        let w = h * h * w1 * xi.x * (1.0 - xi.x) * (1.0 - xi.x * xi.y);
        for (eta, &w2) in rule.xi.iter().zip(&rule.weights) {
            let t1 = eta.x * (1.0 - xi.x);
            let t2 = eta.y * (1.0 - xi.x * xi.y);
            let t3 = t1 + xi.x;
            let t4 = t2 + xi.x * xi.y;
            let pairs = [
                (Vector2::new(t1, t2), Vector2::new(t3, t4)),
                (Vector2::new(t1, t4), Vector2::new(t3, t2)),
                (Vector2::new(t2, t1), Vector2::new(t4, t3)),
                (Vector2::new(t2, t3), Vector2::new(t4, t1)),
            ];
            for (a, b) in &pairs {
                let qp1 = super_space.map_to_surface(element, a, w);
                let qp2 = super_space.map_to_surface(element, b, w2);
                operator.evaluate_integrand(super_space, &qp1, &qp2, interaction);
                operator.evaluate_integrand(super_space, &qp2, &qp1, interaction);
            }
        }
    }
}

/// Regularized quadrature for elements sharing an edge.
#[allow(clippy::too_many_arguments)]
pub fn integrate3<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    e1: &ElementTreeNode,
    rotation_1: usize,
    e2: &ElementTreeNode,
    rotation_2: usize,
    rule: &TensorQuadratureRule,
    interaction: &mut DMatrix<f64>,
) {
    interaction.fill(0.0);
    let h = e1.h();
    for (xi, &w1) in rule.xi.iter().zip(&rule.weights) {
        let w = h * h * w1 * xi.y * xi.y;
        let t1 = xi.x * (1.0 - xi.y);
        let t2 = (1.0 - xi.x) * (1.0 - xi.y);
        for (point, &w2) in rule.xi.iter().zip(&rule.weights) {
            let eta = point * xi.y;
            let t3 = xi.x * (1.0 - eta.x);
            let t4 = (1.0 - xi.x) * (1.0 - eta.x);
            let w_edge = w2 * (1.0 - xi.y);
            let w_vertex = w2 * (1.0 - eta.x);
            let calls = [
                ((t1, eta.x), (t2, eta.y), w_edge),
                ((1.0 - t1, eta.x), (1.0 - t2, eta.y), w_edge),
                ((t3, xi.y), (t4, eta.y), w_vertex),
                ((1.0 - t3, xi.y), (1.0 - t4, eta.y), w_vertex),
                ((t4, eta.y), (t3, xi.y), w_vertex),
                ((1.0 - t4, eta.y), (1.0 - t3, xi.y), w_vertex),
            ];
            for ((x1, y1), (x2, y2), weight_2) in calls {
                let qp1 = super_space.map_to_surface(e1, &tau(x1, y1, rotation_1), w);
                let qp2 = super_space.map_to_surface(e2, &tau(x2, y2, rotation_2), weight_2);
                operator.evaluate_integrand(super_space, &qp1, &qp2, interaction);
            }
        }
    }
}

/// Regularized quadrature for elements sharing a vertex.
#[allow(clippy::too_many_arguments)]
pub fn integrate4<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    e1: &ElementTreeNode,
    rotation_1: usize,
    e2: &ElementTreeNode,
    rotation_2: usize,
    rule: &TensorQuadratureRule,
    interaction: &mut DMatrix<f64>,
) {
    interaction.fill(0.0);
    let h = e1.h();
    for (point, &w1) in rule.xi.iter().zip(&rule.weights) {
        let xi = Vector2::new(point.x, point.x * point.y);
        let w = h * h * w1 * point.x.powi(3);
        let qp1 = super_space.map_to_surface(e1, &tau(xi.x, xi.y, rotation_1), w);
        let qp2 = super_space.map_to_surface(e1, &tau(xi.y, xi.x, rotation_1), w);
        let qp3 = super_space.map_to_surface(e2, &tau(xi.x, xi.y, rotation_2), w);
        let qp4 = super_space.map_to_surface(e2, &tau(xi.y, xi.x, rotation_2), w);
        for (inner, &w2) in rule.xi.iter().zip(&rule.weights) {
            let eta = inner * xi.x;
            let qp5 = super_space.map_to_surface(e2, &tau(eta.x, eta.y, rotation_2), w2);
            let qp6 = super_space.map_to_surface(e1, &tau(eta.x, eta.y, rotation_1), w2);
            operator.evaluate_integrand(super_space, &qp1, &qp5, interaction);
            operator.evaluate_integrand(super_space, &qp2, &qp5, interaction);
            operator.evaluate_integrand(super_space, &qp6, &qp3, interaction);
            operator.evaluate_integrand(super_space, &qp6, &qp4, interaction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    use nalgebra::DMatrix as M;

    use crate::geometry::{Geometry, Patch};
    use crate::operators::DifferentialForm;

    const QUADRATURE_DEGREE: usize = 16;
    const SIGMA: f64 = 1e-3;

    /// Evaluates an arbitrary two-point function on the reference domain,
    /// weighted like the real operators weight their kernels.
    struct ProbeOperator<F>(F);

    impl<F: Fn(&Vector2<f64>, &Vector2<f64>) -> f64> LinearOperator for ProbeOperator<F> {
        const ORDER: i32 = 0;
        const FORM: DifferentialForm = DifferentialForm::Discontinuous;

        fn evaluate_integrand(
            &self,
            _super_space: &SuperSpace,
            p1: &SurfacePoint,
            p2: &SurfacePoint,
            interaction: &mut DMatrix<f64>,
        ) {
            interaction[(0, 0)] += (self.0)(&p1.point.xy(), &p2.point.xy()) * p1.weight * p2.weight;
        }

        fn evaluate_fmm_interpolation(&self, _p1: &SurfacePoint, _p2: &SurfacePoint) -> f64 {
            0.0
        }
    }

    fn screen_space(level: usize) -> SuperSpace {
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
        SuperSpace::new(&Geometry::from_patches(vec![patch]), level, 0).unwrap()
    }

    fn smooth_function(x: &Vector2<f64>, y: &Vector2<f64>) -> f64 {
        (PI * x.x).sin() * (2.0 * PI * y.x).sin() * (-x.y).exp() * y.y.exp()
    }

    /// Separable antiderivative of the smooth test function over the box
    /// `e1 x e2`, both given by their lower left corner and width.
    fn smooth_integral(llc_1: &Vector2<f64>, llc_2: &Vector2<f64>, h: f64) -> f64 {
        ((PI * llc_1.x).cos() - (PI * (llc_1.x + h)).cos()) / PI
            * 0.5
            * ((2.0 * PI * llc_2.x).cos() - (2.0 * PI * (llc_2.x + h)).cos())
            / PI
            * ((-llc_1.y).exp() - (-(llc_1.y + h)).exp())
            * ((llc_2.y + h).exp() - llc_2.y.exp())
    }

    /// Nearly singular along x.y == y.x, with a closed-form antiderivative.
    fn coupled_function(x: &Vector2<f64>, y: &Vector2<f64>) -> f64 {
        (-x.x - 2.0 * y.y).exp() / (SIGMA + (x.y - y.x) * (x.y - y.x))
    }

    fn coupled_antiderivative(u: f64, v: f64) -> f64 {
        0.5 * (SIGMA + (u - v) * (u - v)).ln()
            + (v - u) / SIGMA.sqrt() * ((u - v) / SIGMA.sqrt()).atan()
    }

    fn coupled_integral(llc_1: &Vector2<f64>, llc_2: &Vector2<f64>, h: f64) -> f64 {
        let (u_lo, u_hi) = (llc_1.y, llc_1.y + h);
        let (v_lo, v_hi) = (llc_2.x, llc_2.x + h);
        let inner = coupled_antiderivative(u_hi, v_hi) - coupled_antiderivative(u_hi, v_lo)
            - coupled_antiderivative(u_lo, v_hi)
            + coupled_antiderivative(u_lo, v_lo);
        ((-llc_1.x).exp() - (-(llc_1.x + h)).exp())
            * inner
            * 0.5
            * ((-2.0 * llc_2.y).exp() - (-2.0 * (llc_2.y + h)).exp())
    }

    #[test]
    fn test_integrate1_matches_analytic_integral() {
        let space = screen_space(2);
        let tree = space.mesh().element_tree();
        let operator = ProbeOperator(smooth_function);
        let rule = quadrature::tensor_rule(QUADRATURE_DEGREE);
        let h = tree.leaf(0).h();
        let mut interaction = DMatrix::zeros(1, 1);
        let mut max_error: f64 = 0.0;
        for e1 in tree.leafs() {
            for e2 in tree.leafs() {
                integrate1(&operator, &space, e1, e2, rule, &mut interaction);
                let exact = smooth_integral(&e1.llc, &e2.llc, h) / (h * h);
                max_error = max_error.max((interaction[(0, 0)] - exact).abs() / exact.abs());
            }
        }
        assert!(max_error < 1e-12, "max relative error {max_error}");
    }

    #[test]
    fn test_integrate2_on_coinciding_elements() {
        let space = screen_space(2);
        let tree = space.mesh().element_tree();
        let operator = ProbeOperator(coupled_function);
        let rule = quadrature::tensor_rule(QUADRATURE_DEGREE);
        let h = tree.leaf(0).h();
        let mut interaction = DMatrix::zeros(1, 1);
        let mut max_error: f64 = 0.0;
        for element in tree.leafs() {
            integrate2(&operator, &space, element, rule, &mut interaction);
            let exact = coupled_integral(&element.llc, &element.llc, h) / (h * h);
            max_error = max_error.max((interaction[(0, 0)] - exact).abs() / exact.abs());
        }
        assert!(max_error < 1e-6, "max relative error {max_error}");
    }

    #[test]
    fn test_integrate3_on_edge_adjacent_elements() {
        let space = screen_space(2);
        let tree = space.mesh().element_tree();
        let operator = ProbeOperator(coupled_function);
        let rule = quadrature::tensor_rule(QUADRATURE_DEGREE);
        let h = tree.leaf(0).h();
        let mut interaction = DMatrix::zeros(1, 1);
        let mut max_error: f64 = 0.0;
        let mut pairs = 0;
        for e1 in tree.leafs() {
            for e2 in tree.leafs() {
                let (proximity, _) = compare_elements(e1, e2);
                if let ElementProximity::SharedEdge {
                    rotation_1,
                    rotation_2,
                } = proximity
                {
                    integrate3(
                        &operator,
                        &space,
                        e1,
                        rotation_1,
                        e2,
                        rotation_2,
                        rule,
                        &mut interaction,
                    );
                    let exact = coupled_integral(&e1.llc, &e2.llc, h) / (h * h);
                    max_error = max_error.max((interaction[(0, 0)] - exact).abs() / exact.abs());
                    pairs += 1;
                }
            }
        }
        // 4x4 grid: 2 * 2 * 4 * 3 shared edges counted in both directions
        assert_eq!(pairs, 48);
        assert!(max_error < 1e-4, "max relative error {max_error}");
    }

    #[test]
    fn test_integrate4_on_vertex_adjacent_elements() {
        let space = screen_space(2);
        let tree = space.mesh().element_tree();
        let operator = ProbeOperator(coupled_function);
        let rule = quadrature::tensor_rule(QUADRATURE_DEGREE);
        let h = tree.leaf(0).h();
        let mut interaction = DMatrix::zeros(1, 1);
        let mut max_error: f64 = 0.0;
        let mut pairs = 0;
        for e1 in tree.leafs() {
            for e2 in tree.leafs() {
                let (proximity, _) = compare_elements(e1, e2);
                if let ElementProximity::SharedVertex {
                    rotation_1,
                    rotation_2,
                } = proximity
                {
                    integrate4(
                        &operator,
                        &space,
                        e1,
                        rotation_1,
                        e2,
                        rotation_2,
                        rule,
                        &mut interaction,
                    );
                    let exact = coupled_integral(&e1.llc, &e2.llc, h) / (h * h);
                    max_error = max_error.max((interaction[(0, 0)] - exact).abs() / exact.abs());
                    pairs += 1;
                }
            }
        }
        // interior vertices of the 4x4 grid, two diagonals each, both directions
        assert_eq!(pairs, 36);
        assert!(max_error < 1e-4, "max relative error {max_error}");
    }

    #[test]
    fn test_compare_elements_classification() {
        let space = screen_space(2);
        let tree = space.mesh().element_tree();
        let reordering = tree.compute_reordering_vector();
        let at = |x: usize, y: usize| tree.leaf(reordering[4 * y + x]);

        let (proximity, distance) = compare_elements(at(0, 0), at(0, 0));
        assert_eq!(proximity, ElementProximity::Identical);
        assert_eq!(distance, 0.0);

        let (proximity, _) = compare_elements(at(0, 0), at(1, 0));
        assert!(matches!(proximity, ElementProximity::SharedEdge { .. }));

        let (proximity, _) = compare_elements(at(0, 0), at(1, 1));
        assert!(matches!(proximity, ElementProximity::SharedVertex { .. }));

        let (proximity, distance) = compare_elements(at(0, 0), at(3, 3));
        assert_eq!(proximity, ElementProximity::Separated);
        assert!(distance > 0.5);
    }

    #[test]
    fn test_dispatcher_integrates_constants_exactly() {
        // the integral of 1 over any element pair is h^4; the h-scaled
        // basis convention divides two powers of h out
        let space = screen_space(1);
        let tree = space.mesh().element_tree();
        let operator = ProbeOperator(|_: &Vector2<f64>, _: &Vector2<f64>| 1.0);
        let ffield_deg = operator.far_field_quadrature_degree(0);
        let qnodes = compute_ffield_qnodes(&space, quadrature::tensor_rule(ffield_deg));
        let h = tree.leaf(0).h();
        let mut interaction = DMatrix::zeros(1, 1);
        for e1 in tree.leafs() {
            for e2 in tree.leafs() {
                evaluate_bilinear_form(
                    &operator,
                    &space,
                    e1,
                    e2,
                    &qnodes[e1.id as usize],
                    &qnodes[e2.id as usize],
                    &mut interaction,
                )
                .unwrap();
                assert!(
                    (interaction[(0, 0)] - h * h).abs() < 1e-12,
                    "pair ({}, {})",
                    e1.id,
                    e2.id
                );
            }
        }
    }

    #[test]
    fn test_tau_rotations() {
        assert_eq!(tau(0.2, 0.7, 0), Vector2::new(0.2, 0.7));
        assert_eq!(tau(0.2, 0.7, 1), Vector2::new(0.3, 0.2));
        assert_eq!(tau(0.2, 0.7, 2), Vector2::new(0.8, 0.3));
        assert_eq!(tau(0.2, 0.7, 3), Vector2::new(0.7, 0.8));
    }
}
