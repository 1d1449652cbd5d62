//! CLI module for isobem.
//!
//! Subcommands:
//! - `info`: Summarize a geometry file and the spaces it carries
//! - `solve`: Solve an interior Laplace Dirichlet problem
//! - `convergence`: Sweep degrees and levels and check convergence rates
//! - `export`: Write a refined surface mesh to a VTK file

mod convergence;
mod export;
mod info;
mod solve;

use clap::{Parser, Subcommand};
use nalgebra::Vector3;

use crate::util::grids::{linspace, make_tensor_product_grid};

pub use convergence::ConvergenceCommand;
pub use export::ExportCommand;
pub use info::InfoCommand;
pub use solve::SolveCommand;

/// isobem - Isogeometric Galerkin Boundary Elements
#[derive(Parser)]
#[command(name = "isobem")]
#[command(about = "Isogeometric Galerkin boundary element solver for the Laplace equation")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize the patches, elements and spline spaces of a geometry file
    Info(InfoCommand),

    /// Solve an interior Dirichlet problem on the given surface
    Solve(SolveCommand),

    /// Sweep polynomial degrees and refinement levels and report convergence
    /// rates
    Convergence(ConvergenceCommand),

    /// Export the refined surface mesh as a VTK file
    Export(ExportCommand),
}

impl App {
    /// Run the CLI application.
    pub fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Info(cmd) => cmd.run(),
            Command::Solve(cmd) => cmd.run(),
            Command::Convergence(cmd) => cmd.run(),
            Command::Export(cmd) => cmd.run(),
        }
    }
}

/// The built-in Dirichlet datum of the driver, harmonic on all of space.
fn harmonic(point: &Vector3<f64>) -> f64 {
    4.0 * point.x * point.x - 3.0 * point.y * point.y - point.z * point.z
}

/// Tensor product grid of 1000 evaluation points in the cube of half
/// width 0.25, well inside the unit sphere.
fn evaluation_grid() -> Vec<Vector3<f64>> {
    let axis = linspace(10, -0.25, 0.25);
    make_tensor_product_grid(&axis, &axis, &axis)
}
