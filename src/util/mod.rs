//! Shared constants and small numerical helpers.

pub mod constants;
pub mod convergence;
pub mod grids;
