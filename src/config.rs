//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/isobem/config.toml` (XDG) or platform config dir
//! 2. Project config: `.isobem.toml`
//! 3. Environment variables: `ISOBEM_*`
//!
//! # Intended Usage
//!
//! **Global config** (`~/.config/isobem/config.toml`):
//! ```toml
//! [solver]
//! tolerance = 1e-12
//! max_iterations = 1000
//! ```
//!
//! **Project config** (`.isobem.toml` next to the geometry files):
//! ```toml
//! [discretization]
//! polynomial_degree = 2
//! refinement_level = 3
//!
//! [compression]
//! eta = 1.6
//! interpolation_points = 9
//!
//! [output]
//! directory = "runs"
//! vtk = true
//! ```
//!
//! Every section and every key is optional and falls back to its
//! default. Environment variables address nested keys with a double
//! underscore, e.g. `ISOBEM_SOLVER__TOLERANCE=1e-10`, so that key names
//! containing underscores stay unambiguous.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::hmatrix::CompressionParameters;
use crate::solver::SolverParameters;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discretization: DiscretizationConfig,
    pub compression: CompressionParameters,
    pub solver: SolverParameters,
    pub output: OutputConfig,
}

/// Discretization of the boundary, shared by all subcommands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscretizationConfig {
    /// Polynomial degree of the ansatz space.
    pub polynomial_degree: usize,
    /// Uniform refinements of the patch mesh.
    pub refinement_level: usize,
    /// Knot repetition of the trial space, 1 for maximal smoothness.
    pub knot_repetition: usize,
}

impl Default for DiscretizationConfig {
    fn default() -> Self {
        Self {
            polynomial_degree: 2,
            refinement_level: 2,
            knot_repetition: 1,
        }
    }
}

/// Where run artifacts end up.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for reports and VTK files.
    pub directory: String,
    /// Write a VTK visualization of solve results.
    pub vtk: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            vtk: false,
        }
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let user_config = Self::user_config_path();

        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(".isobem.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("ISOBEM_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// User config path: ~/.config/isobem/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("isobem").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("isobem").join("config.toml"))
            .unwrap_or_default()
    }
}
