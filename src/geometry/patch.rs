//! A single NURBS patch in Bezier extracted format.

use nalgebra::{DMatrix, Matrix3x2, Vector2, Vector3};

use crate::error::AppError;
use crate::geometry::SurfacePoint;
use crate::spline::bernstein;
use crate::spline::deboor::unroll;
use crate::spline::extraction::make_projection;
use crate::spline::knots::{
    extract_unique_knots, find_location_in_knot_vector, validate_knot_vector,
};
use crate::spline::localize::rescale;
use crate::util::constants::MAX_POLYNOMIAL_DEGREE;

/// Rational tensor product patch. The control points are stored in Bezier
/// extracted format, interleaved as x, y, z, w per coefficient, with the y
/// function index running fastest.
#[derive(Debug, Clone)]
pub struct Patch {
    pub data: Vec<f64>,
    /// Number of basis functions per segment in x direction (degree + 1).
    pub polynomial_order_x: usize,
    /// Number of basis functions per segment in y direction (degree + 1).
    pub polynomial_order_y: usize,
    pub unique_knots_x: Vec<f64>,
    pub unique_knots_y: Vec<f64>,
}

impl Patch {
    /// Builds a patch from homogeneous control points `[x, y, z, w]` and
    /// clamped knot vectors. The control matrices carry the y index on the
    /// rows and the x index on the columns.
    ///
    /// Control nets that are not yet in Bezier form are projected onto the
    /// segmentwise Bernstein basis.
    pub fn new(
        xyzw: &[DMatrix<f64>; 4],
        knots_x: &[f64],
        knots_y: &[f64],
    ) -> Result<Self, AppError> {
        let cols = xyzw[0].ncols();
        let rows = xyzw[0].nrows();
        validate_knot_vector(knots_x)?;
        validate_knot_vector(knots_y)?;
        if knots_x.len() <= cols || knots_y.len() <= rows {
            return Err(AppError::KnotVector(
                "knot vector shorter than the control net it clamps".into(),
            ));
        }
        if xyzw[3].iter().any(|&weight| weight <= 0.0) {
            return Err(AppError::Geometry(
                "degenerate patch: weights must be positive".into(),
            ));
        }
        let unique_knots_x = extract_unique_knots(knots_x);
        let unique_knots_y = extract_unique_knots(knots_y);
        let xnumpatch = unique_knots_x.len() - 1;
        let ynumpatch = unique_knots_y.len() - 1;
        let polynomial_order_x = knots_x.len() - cols;
        let polynomial_order_y = knots_y.len() - rows;
        if polynomial_order_x > MAX_POLYNOMIAL_DEGREE + 1
            || polynomial_order_y > MAX_POLYNOMIAL_DEGREE + 1
        {
            return Err(AppError::UnsupportedDegree {
                degree: polynomial_order_x.max(polynomial_order_y) - 1,
                maximum: MAX_POLYNOMIAL_DEGREE,
            });
        }
        let mut data =
            vec![0.0; 4 * polynomial_order_x * xnumpatch * polynomial_order_y * ynumpatch];
        if xnumpatch == 1 && ynumpatch == 1 {
            // Already in Bezier form.
            for (i, component) in xyzw.iter().enumerate() {
                let tmp = unroll(component);
                for (j, &value) in tmp.iter().enumerate() {
                    data[j * 4 + i] = value;
                }
            }
        } else {
            let phi = make_projection(
                knots_x,
                knots_y,
                &unique_knots_x,
                &unique_knots_y,
                polynomial_order_x,
                polynomial_order_y,
            )?;
            for (i, component) in xyzw.iter().enumerate() {
                let tmp = &phi * &unroll(component);
                for (j, &value) in tmp.iter().enumerate() {
                    data[j * 4 + i] = value;
                }
            }
        }
        Ok(Self {
            data,
            polynomial_order_x,
            polynomial_order_y,
            unique_knots_x,
            unique_knots_y,
        })
    }

    fn localize(&self, reference_point: &Vector2<f64>) -> (usize, usize, f64, f64) {
        let x_location = find_location_in_knot_vector(reference_point.x, &self.unique_knots_x);
        let y_location = find_location_in_knot_vector(reference_point.y, &self.unique_knots_y);
        let scaled_x = rescale(
            reference_point.x,
            self.unique_knots_x[x_location],
            self.unique_knots_x[x_location + 1],
        );
        let scaled_y = rescale(
            reference_point.y,
            self.unique_knots_y[y_location],
            self.unique_knots_y[y_location + 1],
        );
        (x_location, y_location, scaled_x, scaled_y)
    }

    fn segments_y(&self) -> usize {
        (self.unique_knots_y.len() - 1) * self.polynomial_order_y
    }

    /// Evaluates the patch at a point in its reference domain.
    pub fn eval(&self, reference_point: &Vector2<f64>) -> Vector3<f64> {
        let (x_location, y_location, scaled_x, scaled_y) = self.localize(reference_point);
        let numy = self.segments_y();
        let mut xbasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ybasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        bernstein::eval_basis(self.polynomial_order_x - 1, &mut xbasis, scaled_x);
        bernstein::eval_basis(self.polynomial_order_y - 1, &mut ybasis, scaled_y);

        let mut tmp = [0.0; 4];
        for i in 0..self.polynomial_order_x {
            for j in 0..self.polynomial_order_y {
                let tpbasisval = xbasis[i] * ybasis[j];
                let accs = 4
                    * (numy * (self.polynomial_order_x * x_location + i)
                        + self.polynomial_order_y * y_location
                        + j);
                for k in 0..4 {
                    tmp[k] += self.data[accs + k] * tpbasisval;
                }
            }
        }
        // Projection from homogeneous coordinates.
        Vector3::new(tmp[0], tmp[1], tmp[2]) / tmp[3]
    }

    /// Jacobian of the parametrization, one column per reference direction.
    pub fn eval_jacobian(&self, reference_point: &Vector2<f64>) -> Matrix3x2<f64> {
        let (x_location, y_location, scaled_x, scaled_y) = self.localize(reference_point);
        let numy = self.segments_y();
        let mut xbasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ybasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut xbasis_d = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ybasis_d = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        bernstein::eval_basis(self.polynomial_order_x - 1, &mut xbasis, scaled_x);
        bernstein::eval_basis(self.polynomial_order_y - 1, &mut ybasis, scaled_y);
        bernstein::eval_der_basis(self.polynomial_order_x - 1, &mut xbasis_d, scaled_x);
        bernstein::eval_der_basis(self.polynomial_order_y - 1, &mut ybasis_d, scaled_y);

        let mut tmp = [0.0; 4];
        let mut tmp_dx = [0.0; 4];
        let mut tmp_dy = [0.0; 4];
        for i in 0..self.polynomial_order_x {
            for j in 0..self.polynomial_order_y {
                let tpbasisval = xbasis[i] * ybasis[j];
                let tpbasisval_dx = xbasis_d[i] * ybasis[j];
                let tpbasisval_dy = xbasis[i] * ybasis_d[j];
                let accs = 4
                    * (numy * (self.polynomial_order_x * x_location + i)
                        + self.polynomial_order_y * y_location
                        + j);
                for k in 0..4 {
                    tmp[k] += self.data[accs + k] * tpbasisval;
                    tmp_dx[k] += self.data[accs + k] * tpbasisval_dx;
                    tmp_dy[k] += self.data[accs + k] * tpbasisval_dy;
                }
            }
        }

        // Quotient rule for the rational weight.
        let bot = 1.0 / (tmp[3] * tmp[3]);
        let mut out = Matrix3x2::zeros();
        for k in 0..3 {
            out[(k, 0)] = (tmp_dx[k] * tmp[3] - tmp[k] * tmp_dx[3]) * bot;
            out[(k, 1)] = (tmp_dy[k] * tmp[3] - tmp[k] * tmp_dy[3]) * bot;
        }
        out
    }

    /// Unnormalized surface normal at a point in the reference domain.
    pub fn eval_normal(&self, reference_point: &Vector2<f64>) -> Vector3<f64> {
        let jacobian = self.eval_jacobian(reference_point);
        let dx = Vector3::new(jacobian[(0, 0)], jacobian[(1, 0)], jacobian[(2, 0)]);
        let dy = Vector3::new(jacobian[(0, 1)], jacobian[(1, 1)], jacobian[(2, 1)]);
        dx.cross(&dy)
    }

    /// Combined evaluation of point and tangents, avoiding the duplicated
    /// basis evaluations of `eval` and `eval_jacobian`.
    ///
    /// `reference_point` lives in the patch domain, `xi` is the same point
    /// in the domain of the element it belongs to.
    pub fn surface_point(
        &self,
        reference_point: &Vector2<f64>,
        weight: f64,
        xi: &Vector2<f64>,
    ) -> SurfacePoint {
        let (x_location, y_location, scaled_x, scaled_y) = self.localize(reference_point);
        let numy = self.segments_y();
        let mut xbasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ybasis = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut xbasis_d = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ybasis_d = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        bernstein::eval_basis(self.polynomial_order_x - 1, &mut xbasis, scaled_x);
        bernstein::eval_basis(self.polynomial_order_y - 1, &mut ybasis, scaled_y);
        bernstein::eval_der_basis(self.polynomial_order_x - 1, &mut xbasis_d, scaled_x);
        bernstein::eval_der_basis(self.polynomial_order_y - 1, &mut ybasis_d, scaled_y);

        let mut tmp = [0.0; 4];
        let mut tmp_dx = [0.0; 4];
        let mut tmp_dy = [0.0; 4];
        for i in 0..self.polynomial_order_x {
            for j in 0..self.polynomial_order_y {
                let tpbasisval = xbasis[i] * ybasis[j];
                let tpbasisval_dx = xbasis_d[i] * ybasis[j];
                let tpbasisval_dy = xbasis[i] * ybasis_d[j];
                let accs = 4
                    * (numy * (self.polynomial_order_x * x_location + i)
                        + self.polynomial_order_y * y_location
                        + j);
                for k in 0..4 {
                    tmp[k] += self.data[accs + k] * tpbasisval;
                    tmp_dx[k] += self.data[accs + k] * tpbasisval_dx;
                    tmp_dy[k] += self.data[accs + k] * tpbasisval_dy;
                }
            }
        }

        let bot = 1.0 / tmp[3];
        let botsqr = bot * bot;
        SurfacePoint {
            reference: *xi,
            weight,
            point: Vector3::new(tmp[0] * bot, tmp[1] * bot, tmp[2] * bot),
            dx: Vector3::new(
                (tmp_dx[0] * tmp[3] - tmp[0] * tmp_dx[3]) * botsqr,
                (tmp_dx[1] * tmp[3] - tmp[1] * tmp_dx[3]) * botsqr,
                (tmp_dx[2] * tmp[3] - tmp[2] * tmp_dx[3]) * botsqr,
            ),
            dy: Vector3::new(
                (tmp_dy[0] * tmp[3] - tmp[0] * tmp_dy[3]) * botsqr,
                (tmp_dy[1] * tmp[3] - tmp[1] * tmp_dy[3]) * botsqr,
                (tmp_dy[2] * tmp[3] - tmp[2] * tmp_dy[3]) * botsqr,
            ),
        }
    }
}

/// Cuts a patch along its internal knots, if any. The result is a vector of
/// Bezier patches, ordered with the y chip index running fastest.
pub fn shredder(patch: &Patch) -> Vec<Patch> {
    if patch.unique_knots_x.len() == 2 && patch.unique_knots_y.len() == 2 {
        return vec![patch.clone()];
    }

    let xchips = patch.unique_knots_x.len() - 1;
    let ychips = patch.unique_knots_y.len() - 1;
    let xp = patch.polynomial_order_x;
    let yp = patch.polynomial_order_y;
    let numy = ychips * yp;

    let mut out = Vec::with_capacity(xchips * ychips);
    for ix in 0..xchips {
        for iy in 0..ychips {
            let mut data = Vec::with_capacity(xp * yp * 4);
            for jx in 0..xp {
                for jy in 0..yp {
                    let accs = 4 * (numy * (xp * ix + jx) + yp * iy + jy);
                    data.extend_from_slice(&patch.data[accs..accs + 4]);
                }
            }
            out.push(Patch {
                data,
                polynomial_order_x: xp,
                polynomial_order_y: yp,
                unique_knots_x: vec![0.0, 1.0],
                unique_knots_y: vec![0.0, 1.0],
            });
        }
    }
    out
}

/// Applies [`shredder`] to every patch of a vector.
pub fn shredder_all(patches: &[Patch]) -> Vec<Patch> {
    patches.iter().flat_map(shredder).collect()
}
