//! Element trees over multipatch geometries.

mod cluster_tree;
mod element_tree;

pub use cluster_tree::ClusterTree;
pub use element_tree::{ElementTree, ElementTreeNode, PatchInterface};
