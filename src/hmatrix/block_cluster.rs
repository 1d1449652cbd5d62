//! Block cluster tree driving the matrix compression.

use serde::Deserialize;

use crate::cluster::{ElementTree, ElementTreeNode};

/// Classification of a cluster pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admissibility {
    /// The pair is neither admissible nor small, subdivide it.
    Refine,
    /// The clusters are well separated, interpolate the kernel.
    LowRank,
    /// The pair is small enough to assemble exactly.
    Dense,
}

/// Tuning knobs of the compression.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompressionParameters {
    /// Admissibility constant. Smaller values admit fewer blocks.
    pub eta: f64,
    /// Dense leaves keep `4^min_cluster_level` elements per cluster.
    pub min_cluster_level: usize,
    /// Chebyshev points per direction of the kernel interpolation.
    pub interpolation_points: usize,
}

impl Default for CompressionParameters {
    fn default() -> Self {
        Self {
            eta: 1.6,
            min_cluster_level: 1,
            interpolation_points: 9,
        }
    }
}

/// A leaf of the block cluster tree: a pair of clusters whose
/// interaction is kept as a single matrix block.
///
/// Both clusters of a pair live on the same level, so the leaf carries
/// one level and the positions of its rows and columns within the
/// element-local numbering.
#[derive(Debug, Clone)]
pub struct BlockClusterLeaf {
    /// Arena index of the row cluster within the element tree.
    pub cluster_1: usize,
    /// Arena index of the column cluster.
    pub cluster_2: usize,
    /// Leaf positions covered by the row cluster.
    pub rows: std::ops::Range<usize>,
    /// Leaf positions covered by the column cluster.
    pub cols: std::ops::Range<usize>,
    /// Element tree level of both clusters.
    pub level: i32,
    /// Ids of the two clusters within their level.
    pub column_1: usize,
    pub column_2: usize,
    pub admissibility: Admissibility,
}

/// Partition of all element pairs into admissible and dense leaves.
///
/// The root pair is subdivided recursively. A pair whose clusters
/// satisfy the admissibility condition becomes a low rank leaf, a pair
/// within `min_cluster_level` levels of the leaves stays dense, and
/// everything else is refined into the sixteen son pairs.
#[derive(Debug)]
pub struct BlockClusterTree {
    leaves: Vec<BlockClusterLeaf>,
    eta: f64,
    min_cluster_level: usize,
    max_level: usize,
}

impl BlockClusterTree {
    pub fn new(tree: &ElementTree, parameters: &CompressionParameters) -> Self {
        let mut out = Self {
            leaves: Vec::new(),
            eta: parameters.eta,
            min_cluster_level: parameters.min_cluster_level,
            max_level: tree.max_level(),
        };
        // the root pair always compares as refine or dense, so the
        // recursion handles everything
        out.append_subtree(tree, 0, 0);
        out
    }

    /// Leaves in depth first order, column clusters outermost.
    pub fn leaves(&self) -> &[BlockClusterLeaf] {
        &self.leaves
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn min_cluster_level(&self) -> usize {
        self.min_cluster_level
    }

    fn append_subtree(&mut self, tree: &ElementTree, cluster_1: usize, cluster_2: usize) {
        let node_1 = tree.node(cluster_1);
        let node_2 = tree.node(cluster_2);
        match self.compare_clusters(node_1, node_2) {
            Admissibility::Refine => {
                for &son_2 in &node_2.sons {
                    for &son_1 in &node_1.sons {
                        self.append_subtree(tree, son_1, son_2);
                    }
                }
            }
            admissibility => self.leaves.push(BlockClusterLeaf {
                cluster_1,
                cluster_2,
                rows: tree.cluster_leaf_range(node_1),
                cols: tree.cluster_leaf_range(node_2),
                level: node_1.level,
                column_1: node_1.id.max(0) as usize,
                column_2: node_2.id.max(0) as usize,
                admissibility,
            }),
        }
    }

    fn compare_clusters(
        &self,
        cluster_1: &ElementTreeNode,
        cluster_2: &ElementTreeNode,
    ) -> Admissibility {
        let distance = ((cluster_1.midpoint - cluster_2.midpoint).norm()
            - cluster_1.radius
            - cluster_2.radius)
            .max(0.0);
        let max_radius = cluster_1.radius.max(cluster_2.radius);
        if max_radius >= self.eta * distance {
            if self.max_level as i32 - cluster_1.level <= self.min_cluster_level as i32 {
                Admissibility::Dense
            } else {
                Admissibility::Refine
            }
        } else {
            Admissibility::LowRank
        }
    }
}
