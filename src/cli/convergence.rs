//! Convergence command: degree and level sweep with rate checks.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;
use nalgebra::DVector;

use crate::ansatz::AnsatzSpace;
use crate::config::Config;
use crate::geometry::Geometry;
use crate::hmatrix::H2Matrix;
use crate::io::{ReportTable, Stopwatch};
use crate::linearform::{assemble_linear_form, DirichletTrace};
use crate::operators::laplace::{SingleLayerOperator, SingleLayerPotential};
use crate::operators::{assemble_dense, DifferentialForm};
use crate::potential::DiscretePotential;
use crate::solver::{conjugate_gradients, CgInfo};
use crate::util::convergence::{estimate_rate_of_convergence, max_pointwise_error};

use super::{evaluation_grid, harmonic};

/// Solve the interior Dirichlet problem over a sweep of polynomial degrees
/// and refinement levels and check the measured convergence rates against
/// the theoretical `2p + 3`.
#[derive(Parser)]
pub struct ConvergenceCommand {
    /// Path to the geometry `.dat` file.
    pub geometry: PathBuf,

    /// Highest polynomial degree of the sweep.
    #[arg(long, default_value_t = 3)]
    pub max_degree: usize,

    /// Highest refinement level of the sweep.
    #[arg(long, default_value_t = 3)]
    pub max_level: usize,

    /// Assemble the operators densely instead of compressed.
    #[arg(long)]
    pub dense: bool,
}

impl ConvergenceCommand {
    /// Run the convergence command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let geometry = Geometry::from_file(&self.geometry)?;
        let grid = evaluation_grid();
        let mut table = ReportTable::new(&[
            "degree", "level", "dofs", "its", "seconds", "error", "rate",
        ]);
        let mut missed = Vec::new();

        for degree in 0..=self.max_degree {
            let mut errors = Vec::with_capacity(self.max_level + 1);
            for level in 0..=self.max_level {
                let watch = Stopwatch::start();
                let space = AnsatzSpace::new(
                    &geometry,
                    level,
                    degree,
                    config.discretization.knot_repetition,
                    DifferentialForm::Discontinuous,
                )?;
                let rhs = assemble_linear_form(&DirichletTrace::new(harmonic), &space);
                let (density, cg) = self.solve(&config, &space, &rhs)?;
                let potential = DiscretePotential::new(SingleLayerPotential, &space, &density);
                let values = potential.evaluate(&grid);
                errors.push(max_pointwise_error(&values, &grid, harmonic));

                // rate between the previous and the current level
                let rate = match errors.len() {
                    1 => "-".to_string(),
                    n => format!(
                        "{:.2}",
                        estimate_rate_of_convergence(&errors[n - 2..])
                    ),
                };
                table.push_row(vec![
                    degree.to_string(),
                    level.to_string(),
                    space.number_of_dofs().to_string(),
                    cg.iterations.to_string(),
                    format!("{:.3}", watch.elapsed()),
                    format!("{:.6e}", errors[level]),
                    rate,
                ]);
                tracing::info!(
                    degree,
                    level,
                    error = errors[level],
                    seconds = watch.elapsed(),
                    "Sweep step finished"
                );
            }

            let expected = (2 * degree + 3) as f64;
            let measured = estimate_rate_of_convergence(&errors[errors.len() - 2..]);
            if measured < 0.9 * expected {
                tracing::warn!(degree, measured, expected, "Convergence rate missed");
                missed.push((degree, measured, expected));
            } else {
                tracing::info!(degree, measured, expected, "Convergence rate confirmed");
            }
        }

        println!("{table}");
        if let Some((degree, measured, expected)) = missed.first() {
            return Err(eyre!(
                "degree {degree} converged with rate {measured:.2}, expected {expected:.1}"
            ));
        }
        Ok(())
    }

    fn solve(
        &self,
        config: &Config,
        space: &AnsatzSpace,
        rhs: &DVector<f64>,
    ) -> color_eyre::Result<(DVector<f64>, CgInfo)> {
        let solved = if self.dense {
            let matrix = assemble_dense(&SingleLayerOperator, space)?;
            conjugate_gradients(&matrix, rhs, &config.solver)?
        } else {
            let matrix = H2Matrix::new(&SingleLayerOperator, space, &config.compression)?;
            conjugate_gradients(&matrix, rhs, &config.solver)?
        };
        Ok(solved)
    }
}
