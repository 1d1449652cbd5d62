//! Hierarchical matrix compression of boundary integral operators.
//!
//! A Galerkin matrix of a boundary integral operator is dense, but its
//! far field is smooth. The [`BlockClusterTree`] partitions the element
//! pairs into a near field, assembled exactly, and a far field whose
//! blocks are interpolated on nested Chebyshev bases. The resulting
//! [`H2Matrix`] multiplies vectors in almost linear time.

mod block_cluster;
mod h2;
pub mod multipole;

pub use block_cluster::{Admissibility, BlockClusterLeaf, BlockClusterTree, CompressionParameters};
pub use h2::H2Matrix;
