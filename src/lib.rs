//! isobem - Isogeometric Galerkin Boundary Elements
//!
//! A boundary element solver for the Laplace equation on NURBS surfaces,
//! with dense and hierarchically compressed Galerkin matrices.

pub mod ansatz;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod duffy;
pub mod error;
pub mod geometry;
pub mod hmatrix;
pub mod io;
pub mod linearform;
pub mod operators;
pub mod potential;
pub mod quadrature;
pub mod solver;
pub mod spline;
pub mod util;
