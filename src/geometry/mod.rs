//! Geometry representation: NURBS patches in Bezier extracted format,
//! loaded from `.dat` files and shared across the solver modules.

pub mod dat;
pub mod patch;

use std::path::Path;
use std::sync::Arc;

use nalgebra::{Vector2, Vector3};

use crate::error::AppError;

pub use dat::RawPatch;
pub use patch::Patch;

/// A point on the surface together with the quadrature data evaluated
/// there: the reference coordinates within the element, the quadrature
/// weight and the two surface tangents.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub reference: Vector2<f64>,
    pub weight: f64,
    pub point: Vector3<f64>,
    pub dx: Vector3<f64>,
    pub dy: Vector3<f64>,
}

impl SurfacePoint {
    /// Unnormalized surface normal.
    pub fn normal(&self) -> Vector3<f64> {
        self.dx.cross(&self.dy)
    }

    /// Surface measure of the parametrization, the norm of the normal.
    pub fn integration_element(&self) -> f64 {
        self.normal().norm()
    }
}

impl Default for SurfacePoint {
    fn default() -> Self {
        Self {
            reference: Vector2::zeros(),
            weight: 0.0,
            point: Vector3::zeros(),
            dx: Vector3::zeros(),
            dy: Vector3::zeros(),
        }
    }
}

/// The surface of the computational domain as a vector of Bezier patches,
/// cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Geometry {
    patches: Arc<Vec<Patch>>,
}

impl Geometry {
    /// Loads a geometry from a `.dat` file and cuts all patches into
    /// Bezier form. The normal directions must be consistent across
    /// patches; this is checked when the element tree is built.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let patches = dat::load_dat(path.as_ref())?;
        Ok(Self::from_patches(patches))
    }

    /// Wraps a patch vector, cutting along interior knots where needed.
    pub fn from_patches(patches: Vec<Patch>) -> Self {
        Self {
            patches: Arc::new(patch::shredder_all(&patches)),
        }
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn number_of_patches(&self) -> usize {
        self.patches.len()
    }
}
