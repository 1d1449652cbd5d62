//! Info command: geometry and space summary.

use std::path::PathBuf;

use clap::Parser;

use crate::ansatz::AnsatzSpace;
use crate::cluster::ClusterTree;
use crate::config::Config;
use crate::geometry::Geometry;
use crate::io::ReportTable;
use crate::operators::DifferentialForm;

/// Summarize a geometry file: patches, elements per refinement level and
/// the dimensions of the spline spaces living on them.
#[derive(Parser)]
pub struct InfoCommand {
    /// Path to the geometry `.dat` file.
    pub geometry: PathBuf,

    /// Highest refinement level of the summary (defaults to configuration).
    #[arg(short, long)]
    pub level: Option<usize>,

    /// Polynomial degree of the spline spaces (defaults to configuration).
    #[arg(short = 'p', long)]
    pub degree: Option<usize>,
}

impl InfoCommand {
    /// Run the info command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let max_level = self.level.unwrap_or(config.discretization.refinement_level);
        let degree = self
            .degree
            .unwrap_or(config.discretization.polynomial_degree);
        let knot_repetition = config.discretization.knot_repetition;

        let geometry = Geometry::from_file(&self.geometry)?;
        tracing::info!(
            path = %self.geometry.display(),
            patches = geometry.number_of_patches(),
            "Geometry loaded"
        );

        let mut table = ReportTable::new(&[
            "level",
            "elements",
            "vertices",
            "smooth dofs",
            "local dofs",
        ]);
        for level in 0..=max_level {
            let mesh = ClusterTree::new(&geometry, level)?;
            let smooth = AnsatzSpace::new(
                &geometry,
                level,
                degree,
                knot_repetition,
                DifferentialForm::Continuous,
            )?;
            let local = AnsatzSpace::new(
                &geometry,
                level,
                degree,
                knot_repetition,
                DifferentialForm::Discontinuous,
            )?;
            table.push_row(vec![
                level.to_string(),
                mesh.number_of_elements().to_string(),
                mesh.points().ncols().to_string(),
                smooth.number_of_dofs().to_string(),
                local.number_of_dofs().to_string(),
            ]);
        }
        println!(
            "{} patches, ansatz functions of degree {}",
            geometry.number_of_patches(),
            degree
        );
        println!("{table}");
        Ok(())
    }
}
