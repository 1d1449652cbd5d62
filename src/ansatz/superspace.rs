//! Element-local polynomial bases on the mesh.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Vector2};

use crate::cluster::{ClusterTree, ElementTreeNode};
use crate::error::AppError;
use crate::geometry::{Geometry, SurfacePoint};
use crate::spline::bernstein;
use crate::util::constants::MAX_POLYNOMIAL_DEGREE;

/// Manages the tensor product Bernstein basis of fixed degree on every
/// element of the mesh and evaluates it on the unit square.
///
/// Basis functions are enumerated x-first: index `iy * (p + 1) + ix` holds
/// `B_ix(s_x) * B_iy(s_y)`.
#[derive(Debug, Clone)]
pub struct SuperSpace {
    mesh: Arc<ClusterTree>,
    polynomial_degree: usize,
    polynomial_degree_plus_one_squared: usize,
}

impl SuperSpace {
    pub fn new(
        geometry: &Geometry,
        refinement_level: usize,
        polynomial_degree: usize,
    ) -> Result<Self, AppError> {
        if polynomial_degree > MAX_POLYNOMIAL_DEGREE {
            return Err(AppError::UnsupportedDegree {
                degree: polynomial_degree,
                maximum: MAX_POLYNOMIAL_DEGREE,
            });
        }
        let mesh = ClusterTree::new(geometry, refinement_level)?;
        Ok(Self {
            mesh: Arc::new(mesh),
            polynomial_degree,
            polynomial_degree_plus_one_squared: (polynomial_degree + 1) * (polynomial_degree + 1),
        })
    }

    pub fn polynomial_degree(&self) -> usize {
        self.polynomial_degree
    }

    pub fn polynomial_degree_plus_one_squared(&self) -> usize {
        self.polynomial_degree_plus_one_squared
    }

    pub fn refinement_level(&self) -> usize {
        self.mesh.max_level()
    }

    pub fn number_of_elements(&self) -> usize {
        self.mesh.number_of_elements()
    }

    pub fn number_of_patches(&self) -> usize {
        self.geometry().number_of_patches()
    }

    pub fn geometry(&self) -> &Geometry {
        self.mesh.geometry()
    }

    pub fn mesh(&self) -> &ClusterTree {
        &self.mesh
    }

    /// Maps a point `xi` of the unit square onto the surface through the
    /// element, carrying the quadrature weight along.
    pub fn map_to_surface(
        &self,
        element: &ElementTreeNode,
        xi: &Vector2<f64>,
        weight: f64,
    ) -> SurfacePoint {
        let st = element.llc + element.h() * xi;
        self.geometry().patches()[element.patch as usize].surface_point(&st, weight, xi)
    }

    /// Evaluates all local shape functions at `s`.
    pub fn basis(&self, s: &Vector2<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.polynomial_degree_plus_one_squared);
        self.add_scaled_basis(&mut out, 1.0, s);
        out
    }

    /// Evaluates all local shape functions at `s`, scales by `w` and adds to
    /// `values`.
    pub fn add_scaled_basis(&self, values: &mut DVector<f64>, w: f64, s: &Vector2<f64>) {
        let order = self.polynomial_degree + 1;
        let mut x = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut y = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        bernstein::eval_basis(self.polynomial_degree, &mut x, s.x);
        bernstein::eval_basis(self.polynomial_degree, &mut y, s.y);
        for iy in 0..order {
            for ix in 0..order {
                values[iy * order + ix] += w * x[ix] * y[iy];
            }
        }
    }

    /// All products of local shape functions, one at `s` and one at `t`.
    pub fn basis_interaction(&self, s: &Vector2<f64>, t: &Vector2<f64>) -> DMatrix<f64> {
        let n = self.polynomial_degree_plus_one_squared;
        let mut out = DMatrix::zeros(n, n);
        self.add_scaled_basis_interaction(&mut out, 1.0, s, t);
        out
    }

    /// All products of local shape functions, one at `s` and one at `t`,
    /// scaled by `w` and added to `interaction`. Rows belong to `s`.
    pub fn add_scaled_basis_interaction(
        &self,
        interaction: &mut DMatrix<f64>,
        w: f64,
        s: &Vector2<f64>,
        t: &Vector2<f64>,
    ) {
        let order = self.polynomial_degree + 1;
        let mut xs = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut ys = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut xt = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        let mut yt = [0.0; MAX_POLYNOMIAL_DEGREE + 1];
        bernstein::eval_basis(self.polynomial_degree, &mut xs, s.x);
        bernstein::eval_basis(self.polynomial_degree, &mut ys, s.y);
        bernstein::eval_basis(self.polynomial_degree, &mut xt, t.x);
        bernstein::eval_basis(self.polynomial_degree, &mut yt, t.y);
        for iy in 0..order {
            for ix in 0..order {
                let a = w * xs[ix] * ys[iy];
                for jy in 0..order {
                    for jx in 0..order {
                        interaction[(iy * order + ix, jy * order + jx)] += a * xt[jx] * yt[jy];
                    }
                }
            }
        }
    }
}
