//! VTK export of surface meshes and surface data.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{DMatrix, Vector2, Vector3};

use crate::ansatz::FunctionEvaluator;
use crate::cluster::ClusterTree;
use crate::error::AppError;
use crate::geometry::Geometry;

/// Exports functions on a geometry to the VTK PolyData format.
///
/// The export refines its own visualization mesh, deliberately not
/// tied to a computation mesh since visualization is often wanted on a
/// finer one. Data sets are sampled per cell at the element midpoints.
#[derive(Debug)]
pub struct VtkSurfaceExport {
    mesh: ClusterTree,
    points: DMatrix<f64>,
    cells: Vec<[usize; 4]>,
    normals: Vec<Vector3<f64>>,
    patch_numbers: Vec<i32>,
    data_sets: Vec<(String, Vec<f64>)>,
}

impl VtkSurfaceExport {
    pub fn new(geometry: &Geometry, refinement_level: usize) -> Result<Self, AppError> {
        let mesh = ClusterTree::new(geometry, refinement_level)?;
        let tree = mesh.element_tree();
        let points = tree.generate_point_list();
        let cells = tree.generate_element_list();
        let patches = geometry.patches();
        let mut normals = Vec::with_capacity(cells.len());
        let mut patch_numbers = Vec::with_capacity(cells.len());
        for element in tree.leafs() {
            let normal =
                patches[element.patch as usize].eval_normal(&element.reference_midpoint());
            normals.push(normal.normalize());
            patch_numbers.push(element.patch);
        }
        Ok(Self {
            mesh,
            points,
            cells,
            normals,
            patch_numbers,
            data_sets: Vec::new(),
        })
    }

    /// Attaches a scalar field sampled at the element midpoints on the
    /// parameter square.
    pub fn add_data_set<F>(&mut self, name: &str, fun: F)
    where
        F: Fn(usize, &Vector2<f64>) -> f64,
    {
        let values = self
            .mesh
            .element_tree()
            .leafs()
            .map(|element| fun(element.patch as usize, &element.reference_midpoint()))
            .collect();
        self.data_sets.push((name.to_string(), values));
    }

    /// Attaches a discrete function given by its ansatz coefficients.
    pub fn add_coefficient_data(&mut self, name: &str, evaluator: &FunctionEvaluator) {
        self.add_data_set(name, |patch, midpoint| {
            evaluator.evaluate_on_patch(patch, midpoint)
        });
    }

    /// Writes the mesh with all attached data sets.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        writeln!(
            out,
            "<VTKFile type=\"PolyData\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        writeln!(out, "<PolyData>")?;
        writeln!(
            out,
            "<Piece NumberOfPoints=\"{}\" NumberOfVerts=\"0\" NumberOfLines=\"0\" \
             NumberOfStrips=\"0\" NumberOfPolys=\"{}\">",
            self.points.ncols(),
            self.cells.len()
        )?;
        writeln!(out, "<Points>")?;
        writeln!(
            out,
            "<DataArray type=\"Float32\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        for point in self.points.column_iter() {
            writeln!(out, "{:.6e} {:.6e} {:.6e}", point[0], point[1], point[2])?;
        }
        writeln!(out, "</DataArray>")?;
        writeln!(out, "</Points>")?;
        writeln!(
            out,
            "<CellData Scalars=\"patch_number\" Normals=\"cell_normals\">"
        )?;
        writeln!(
            out,
            "<DataArray type=\"Int32\" Name=\"patch_number\" format=\"ascii\">"
        )?;
        for patch in &self.patch_numbers {
            writeln!(out, "{patch}")?;
        }
        writeln!(out, "</DataArray>")?;
        writeln!(
            out,
            "<DataArray type=\"Float32\" Name=\"cell_normals\" NumberOfComponents=\"3\" \
             format=\"ascii\">"
        )?;
        for normal in &self.normals {
            writeln!(out, "{:.6e} {:.6e} {:.6e}", normal.x, normal.y, normal.z)?;
        }
        writeln!(out, "</DataArray>")?;
        for (name, values) in &self.data_sets {
            writeln!(
                out,
                "<DataArray type=\"Float32\" Name=\"{name}\" NumberOfComponents=\"1\" \
                 format=\"ascii\">"
            )?;
            for value in values {
                writeln!(out, "{value:.6e}")?;
            }
            writeln!(out, "</DataArray>")?;
        }
        writeln!(out, "</CellData>")?;
        writeln!(out, "<Polys>")?;
        writeln!(
            out,
            "<DataArray type=\"Int32\" Name=\"connectivity\" format=\"ascii\">"
        )?;
        for cell in &self.cells {
            writeln!(out, "{} {} {} {}", cell[0], cell[1], cell[2], cell[3])?;
        }
        writeln!(out, "</DataArray>")?;
        writeln!(
            out,
            "<DataArray type=\"Int32\" Name=\"offsets\" format=\"ascii\">"
        )?;
        for i in 0..self.cells.len() {
            writeln!(out, "{}", (i + 1) * 4)?;
        }
        writeln!(out, "</DataArray>")?;
        writeln!(out, "</Polys>")?;
        writeln!(out, "</Piece>")?;
        writeln!(out, "</PolyData>")?;
        writeln!(out, "</VTKFile>")?;
        tracing::debug!(
            path = %path.as_ref().display(),
            cells = self.cells.len(),
            data_sets = self.data_sets.len(),
            "VTK surface written"
        );
        Ok(())
    }
}
