//! Export command: VTK visualization of a refined surface mesh.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::Config;
use crate::geometry::Geometry;
use crate::io::VtkSurfaceExport;

use super::harmonic;

/// Export the refined surface mesh of a geometry as a VTK PolyData file,
/// with patch numbers, cell normals and the built-in Dirichlet datum as
/// cell data.
#[derive(Parser)]
pub struct ExportCommand {
    /// Path to the geometry `.dat` file.
    pub geometry: PathBuf,

    /// Refinement level of the visualization mesh (defaults to
    /// configuration).
    #[arg(short, long)]
    pub level: Option<usize>,

    /// Output file (defaults to the geometry name in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ExportCommand {
    /// Run the export command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let level = self.level.unwrap_or(config.discretization.refinement_level);
        let geometry = Geometry::from_file(&self.geometry)?;

        let mut export = VtkSurfaceExport::new(&geometry, level)?;
        export.add_data_set("dirichlet_datum", |patch, midpoint| {
            harmonic(&geometry.patches()[patch].eval(midpoint))
        });

        let path = match self.output {
            Some(path) => path,
            None => {
                let stem = self
                    .geometry
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "surface".to_string());
                Path::new(&config.output.directory).join(format!("{stem}.vtp"))
            }
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        export.write_to_file(&path)?;
        tracing::info!(
            path = %path.display(),
            level,
            patches = geometry.number_of_patches(),
            "Surface mesh exported"
        );
        Ok(())
    }
}
