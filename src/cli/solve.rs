//! Solve command: interior Dirichlet problem via the single layer operator.

use std::path::{Path, PathBuf};

use clap::Parser;
use nalgebra::DVector;

use crate::ansatz::{AnsatzSpace, FunctionEvaluator};
use crate::config::Config;
use crate::geometry::Geometry;
use crate::hmatrix::H2Matrix;
use crate::io::{RunReport, Stopwatch, VtkSurfaceExport};
use crate::linearform::{assemble_linear_form, DirichletTrace};
use crate::operators::laplace::{SingleLayerOperator, SingleLayerPotential};
use crate::operators::{assemble_dense, DifferentialForm};
use crate::potential::DiscretePotential;
use crate::solver::{conjugate_gradients, CgInfo};
use crate::util::convergence::max_pointwise_error;

use super::{evaluation_grid, harmonic};

/// Solve the interior Dirichlet problem for a built-in harmonic function
/// and report the potential error on an interior evaluation grid.
#[derive(Parser)]
pub struct SolveCommand {
    /// Path to the geometry `.dat` file.
    pub geometry: PathBuf,

    /// Polynomial degree of the ansatz space (defaults to configuration).
    #[arg(short = 'p', long)]
    pub degree: Option<usize>,

    /// Refinement level of the mesh (defaults to configuration).
    #[arg(short, long)]
    pub level: Option<usize>,

    /// Assemble the operator densely instead of compressed.
    #[arg(long)]
    pub dense: bool,

    /// Write a VTK visualization of the solved density.
    #[arg(long)]
    pub vtk: bool,

    /// Write a JSON report of the run.
    #[arg(long)]
    pub report: bool,
}

impl SolveCommand {
    /// Run the solve command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let degree = self
            .degree
            .unwrap_or(config.discretization.polynomial_degree);
        let level = self.level.unwrap_or(config.discretization.refinement_level);

        let mut watch = Stopwatch::start();
        let geometry = Geometry::from_file(&self.geometry)?;
        let space = AnsatzSpace::new(
            &geometry,
            level,
            degree,
            config.discretization.knot_repetition,
            DifferentialForm::Discontinuous,
        )?;
        tracing::info!(
            degree,
            level,
            dofs = space.number_of_dofs(),
            "Ansatz space built"
        );

        let rhs = assemble_linear_form(&DirichletTrace::new(harmonic), &space);
        let (density, cg, compression_rate) = self.assemble_and_solve(
            &config,
            &space,
            &rhs,
            &mut watch,
        )?;
        tracing::info!(
            iterations = cg.iterations,
            residual = cg.residual,
            seconds = watch.lap(),
            "System solved"
        );

        let grid = evaluation_grid();
        let potential = DiscretePotential::new(SingleLayerPotential, &space, &density);
        let values = potential.evaluate(&grid);
        let error = max_pointwise_error(&values, &grid, harmonic);
        tracing::info!(
            points = grid.len(),
            error,
            seconds = watch.lap(),
            "Potential evaluated"
        );
        println!(
            "degree {degree} level {level} dofs {} error {error:.6e}",
            space.number_of_dofs()
        );

        let output = Path::new(&config.output.directory);
        let write_vtk = self.vtk || config.output.vtk;
        if write_vtk || self.report {
            std::fs::create_dir_all(output)?;
        }
        if write_vtk {
            let mut export = VtkSurfaceExport::new(&geometry, level)?;
            export.add_coefficient_data("density", &FunctionEvaluator::new(&space, &density));
            export.add_data_set("dirichlet_datum", |patch, midpoint| {
                harmonic(&geometry.patches()[patch].eval(midpoint))
            });
            let path = output.join("solution.vtp");
            export.write_to_file(&path)?;
            tracing::info!(path = %path.display(), "VTK visualization written");
        }
        if self.report {
            let report = RunReport {
                created: chrono::Local::now().to_rfc3339(),
                geometry: self.geometry.display().to_string(),
                polynomial_degree: degree,
                refinement_level: level,
                dofs: space.number_of_dofs(),
                compression_rate,
                iterations: cg.iterations,
                residual: cg.residual,
                max_potential_error: error,
                seconds: watch.laps().to_vec(),
            };
            let path = output.join("report.json");
            report.save(&path)?;
            tracing::info!(path = %path.display(), "Run report written");
        }
        Ok(())
    }

    fn assemble_and_solve(
        &self,
        config: &Config,
        space: &AnsatzSpace,
        rhs: &DVector<f64>,
        watch: &mut Stopwatch,
    ) -> color_eyre::Result<(DVector<f64>, CgInfo, Option<f64>)> {
        if self.dense {
            let matrix = assemble_dense(&SingleLayerOperator, space)?;
            tracing::info!(seconds = watch.lap(), "Operator assembled densely");
            let (density, cg) = conjugate_gradients(&matrix, rhs, &config.solver)?;
            Ok((density, cg, None))
        } else {
            let matrix = H2Matrix::new(&SingleLayerOperator, space, &config.compression)?;
            let rate = matrix.compression_rate();
            tracing::info!(
                seconds = watch.lap(),
                compression_rate = rate,
                "Operator assembled"
            );
            let (density, cg) = conjugate_gradients(&matrix, rhs, &config.solver)?;
            Ok((density, cg, Some(rate)))
        }
    }
}
