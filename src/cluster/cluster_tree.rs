//! Element tree plus the surface point list it induces.

use nalgebra::{DMatrix, Vector2};

use crate::error::AppError;
use crate::geometry::Geometry;
use crate::util::constants::{EDGE_MIDPOINTS, POINT_COMPARISON_TOLERANCE};

use super::element_tree::ElementTree;

/// Introduces a system of local coordinates on a [`Geometry`] through an
/// element tree. There is no mesh in the classical sense, only elements on
/// the parameter domains of the patches.
#[derive(Debug)]
pub struct ClusterTree {
    element_tree: ElementTree,
    points: DMatrix<f64>,
}

impl ClusterTree {
    /// Refines the element tree to `refinement_level` and verifies that the
    /// patch parametrizations induce a consistent surface orientation.
    pub fn new(geometry: &Geometry, refinement_level: usize) -> Result<Self, AppError> {
        let mut element_tree = ElementTree::new(geometry, refinement_level);
        let points = element_tree.compute_element_enclosings();
        let tree = Self {
            element_tree,
            points,
        };
        tree.check_orientation()?;
        Ok(tree)
    }

    pub fn element_tree(&self) -> &ElementTree {
        &self.element_tree
    }

    /// Surface points indexed by vertex id.
    pub fn points(&self) -> &DMatrix<f64> {
        &self.points
    }

    pub fn geometry(&self) -> &Geometry {
        self.element_tree.geometry()
    }

    pub fn max_level(&self) -> usize {
        self.element_tree.max_level()
    }

    pub fn number_of_elements(&self) -> usize {
        self.element_tree.number_of_elements()
    }

    /// Patches meeting at an edge must agree on the outward normal, otherwise
    /// layer potentials change sign across the seam.
    fn check_orientation(&self) -> Result<(), AppError> {
        let patches = self.geometry().patches();
        for interface in self.element_tree.patch_topology_info() {
            let (first, second) = interface.patches;
            if second < 0 {
                continue;
            }
            let mid1 = edge_midpoint(interface.edges.0 as usize);
            let mid2 = edge_midpoint(interface.edges.1 as usize);
            let a = patches[first as usize].eval(&mid1);
            let b = patches[second as usize].eval(&mid2);
            if (a - b).norm() >= POINT_COMPARISON_TOLERANCE {
                return Err(AppError::Geometry(format!(
                    "patches {first} and {second} do not meet at their shared edge"
                )));
            }
            let na = patches[first as usize].eval_normal(&mid1);
            let nb = patches[second as usize].eval_normal(&mid2);
            if na.dot(&nb) <= 0.0 {
                return Err(AppError::Geometry(format!(
                    "normals of patches {first} and {second} point to opposite sides"
                )));
            }
        }
        Ok(())
    }
}

fn edge_midpoint(edge: usize) -> Vector2<f64> {
    Vector2::new(EDGE_MIDPOINTS[0][edge], EDGE_MIDPOINTS[1][edge])
}
