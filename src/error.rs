//! Application error types.

use thiserror::Error;

use crate::operators::DifferentialForm;

/// Application-level errors for isobem.
#[derive(Error, Debug)]
pub enum AppError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid geometry file {path}: {message}")]
    GeometryFile { path: String, message: String },

    // Domain errors
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Invalid knot vector: {0}")]
    KnotVector(String),

    #[error("Space mismatch: the operator needs a {expected:?} ansatz space, got {actual:?}")]
    SpaceMismatch {
        expected: DifferentialForm,
        actual: DifferentialForm,
    },

    #[error("Polynomial degree {degree} exceeds the supported maximum {maximum}")]
    UnsupportedDegree { degree: usize, maximum: usize },

    #[error("Invalid ansatz space: {0}")]
    Ansatz(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Solver stagnated after {iterations} iterations at residual {residual:.3e}")]
    SolverStagnation { iterations: usize, residual: f64 },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
