//! Run artifacts: VTK visualization, timing, measurement tables.

mod report;
mod stopwatch;
mod vtk;

pub use report::{ReportTable, RunReport};
pub use stopwatch::Stopwatch;
pub use vtk::VtkSurfaceExport;
