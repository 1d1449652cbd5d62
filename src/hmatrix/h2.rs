//! Hierarchically compressed Galerkin matrices.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::csc::CscMatrix;
use rayon::prelude::*;

use crate::ansatz::{AnsatzSpace, SuperSpace};
use crate::cluster::ElementTree;
use crate::duffy;
use crate::error::AppError;
use crate::geometry::SurfacePoint;
use crate::operators::LinearOperator;
use crate::quadrature;
use crate::solver::MatrixOperator;

use super::block_cluster::{
    Admissibility, BlockClusterLeaf, BlockClusterTree, CompressionParameters,
};
use super::multipole;

/// Compressed representation of a boundary integral operator.
///
/// Dense leaves of the block cluster tree are assembled exactly, low
/// rank leaves store a kernel interpolation between nested cluster
/// bases. The matrix never materializes; it acts on vectors through
/// the forward and backward transformations.
#[derive(Debug)]
pub struct H2Matrix {
    transformation: CscMatrix<f64>,
    transposed: CscMatrix<f64>,
    block_cluster_tree: BlockClusterTree,
    /// One matrix per block cluster leaf, in leaf order.
    leaf_matrices: Vec<DMatrix<f64>>,
    moments: DMatrix<f64>,
    transfers: DMatrix<f64>,
    /// Number of transfer steps from the finest cluster level to the
    /// patches.
    steps: usize,
    polynomial_degree_plus_one_squared: usize,
}

impl H2Matrix {
    pub fn new<L>(
        operator: &L,
        space: &AnsatzSpace,
        parameters: &CompressionParameters,
    ) -> Result<Self, AppError>
    where
        L: LinearOperator + Sync,
    {
        crate::operators::discrete::check_form(L::FORM, space)?;
        let super_space = space.super_space();
        let tree = super_space.mesh().element_tree();
        let max_level = tree.max_level();
        let block_cluster_tree = BlockClusterTree::new(tree, parameters);
        let steps = max_level.saturating_sub(parameters.min_cluster_level);
        let moments = multipole::moment_matrix(
            super_space,
            steps,
            parameters.min_cluster_level.min(max_level),
            parameters.interpolation_points,
        );
        let transfers = multipole::transfer_matrices(parameters.interpolation_points);
        let points = multipole::interpolation_points(parameters.interpolation_points);
        let ffield_deg =
            operator.far_field_quadrature_degree(super_space.polynomial_degree());
        let ffield_qnodes =
            duffy::compute_ffield_qnodes(super_space, quadrature::tensor_rule(ffield_deg));
        let q = super_space.polynomial_degree_plus_one_squared();
        let leaf_matrices = block_cluster_tree
            .leaves()
            .par_iter()
            .map(|leaf| match leaf.admissibility {
                Admissibility::LowRank => Ok(multipole::interpolate_kernel(
                    operator,
                    super_space,
                    &points,
                    tree.node(leaf.cluster_1),
                    tree.node(leaf.cluster_2),
                )),
                _ => dense_block(operator, super_space, tree, leaf, q, &ffield_qnodes),
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let low_rank = leaf_matrices
            .iter()
            .zip(block_cluster_tree.leaves())
            .filter(|(_, leaf)| leaf.admissibility == Admissibility::LowRank)
            .count();
        tracing::debug!(
            dofs = space.number_of_dofs(),
            leaves = block_cluster_tree.leaves().len(),
            low_rank,
            "Compressed operator assembled"
        );
        Ok(Self {
            transformation: space.transformation_matrix().clone(),
            transposed: space.transformation_matrix().transpose(),
            block_cluster_tree,
            leaf_matrices,
            moments,
            transfers,
            steps,
            polynomial_degree_plus_one_squared: q,
        })
    }

    pub fn block_cluster_tree(&self) -> &BlockClusterTree {
        &self.block_cluster_tree
    }

    /// Fraction of matrix entries kept in dense blocks.
    pub fn compression_rate(&self) -> f64 {
        let q = self.polynomial_degree_plus_one_squared as f64;
        let dense: f64 = self
            .block_cluster_tree
            .leaves()
            .iter()
            .filter(|leaf| leaf.admissibility == Admissibility::Dense)
            .map(|leaf| q * leaf.rows.len() as f64 * q * leaf.cols.len() as f64)
            .sum();
        let long_dofs = self.transformation.nrows() as f64;
        dense / (long_dofs * long_dofs)
    }
}

impl MatrixOperator for H2Matrix {
    fn rows(&self) -> usize {
        self.transformation.ncols()
    }

    fn cols(&self) -> usize {
        self.transformation.ncols()
    }

    fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        let q = self.polynomial_degree_plus_one_squared;
        let long_rhs = &self.transformation * x;
        let clusters = long_rhs.len() / self.moments.ncols();
        let long_rhs_matrix =
            DMatrix::from_column_slice(self.moments.ncols(), clusters, long_rhs.as_slice());
        let forward = multipole::forward_transformation(
            &self.moments,
            &self.transfers,
            self.steps,
            &long_rhs_matrix,
        );
        let mut backward: Vec<DMatrix<f64>> = forward
            .iter()
            .map(|level| DMatrix::zeros(level.nrows(), level.ncols()))
            .collect();
        let mut long_dst = DVector::zeros(long_rhs.len());
        for (leaf, matrix) in self
            .block_cluster_tree
            .leaves()
            .iter()
            .zip(&self.leaf_matrices)
        {
            match leaf.admissibility {
                Admissibility::LowRank => {
                    let fmm_level = self.steps - leaf.level as usize;
                    let update = matrix * forward[fmm_level].column(leaf.column_2);
                    backward[fmm_level]
                        .column_mut(leaf.column_1)
                        .axpy(1.0, &update, 1.0);
                }
                _ => {
                    let update =
                        matrix * long_rhs.rows(q * leaf.cols.start, q * leaf.cols.len());
                    long_dst
                        .rows_mut(q * leaf.rows.start, q * leaf.rows.len())
                        .axpy(1.0, &update, 1.0);
                }
            }
        }
        long_dst += multipole::backward_transformation(
            &self.moments,
            &self.transfers,
            self.steps,
            backward,
        );
        &self.transposed * &long_dst
    }
}

fn dense_block<L: LinearOperator>(
    operator: &L,
    super_space: &SuperSpace,
    tree: &ElementTree,
    leaf: &BlockClusterLeaf,
    q: usize,
    ffield_qnodes: &[Vec<SurfacePoint>],
) -> Result<DMatrix<f64>, AppError> {
    let mut block = DMatrix::zeros(q * leaf.rows.len(), q * leaf.cols.len());
    let mut interaction = DMatrix::zeros(q, q);
    for (j, col) in leaf.cols.clone().enumerate() {
        let element_2 = tree.leaf(col);
        for (i, row) in leaf.rows.clone().enumerate() {
            let element_1 = tree.leaf(row);
            duffy::evaluate_bilinear_form(
                operator,
                super_space,
                element_1,
                element_2,
                &ffield_qnodes[row],
                &ffield_qnodes[col],
                &mut interaction,
            )?;
            block.view_mut((q * i, q * j), (q, q)).copy_from(&interaction);
        }
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix as M;

    use crate::geometry::{Geometry, Patch};
    use crate::operators::laplace::SingleLayerOperator;
    use crate::operators::{assemble_dense, DifferentialForm};

    fn screen_space(level: usize, degree: usize) -> AnsatzSpace {
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(
            &[
                M::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]),
                M::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]),
                M::zeros(2, 2),
                M::repeat(2, 2, 1.0),
            ],
            &knots,
            &knots,
        )
        .unwrap();
        AnsatzSpace::new(
            &Geometry::from_patches(vec![patch]),
            level,
            degree,
            1,
            DifferentialForm::Discontinuous,
        )
        .unwrap()
    }

    #[test]
    fn test_matvec_matches_dense_assembly() {
        let space = screen_space(3, 0);
        let dense = assemble_dense(&SingleLayerOperator, &space).unwrap();
        let compressed =
            H2Matrix::new(&SingleLayerOperator, &space, &CompressionParameters::default())
                .unwrap();
        assert_eq!(compressed.rows(), space.number_of_dofs());
        assert!(compressed.compression_rate() < 1.0);
        let x = DVector::from_fn(space.number_of_dofs(), |i, _| (0.29 * i as f64).sin());
        let exact = &dense * &x;
        let fast = compressed.matvec(&x);
        assert!((&fast - &exact).norm() / exact.norm() < 1e-4);
    }

    #[test]
    fn test_matvec_matches_dense_assembly_linear_basis() {
        let space = screen_space(3, 1);
        let dense = assemble_dense(&SingleLayerOperator, &space).unwrap();
        let compressed =
            H2Matrix::new(&SingleLayerOperator, &space, &CompressionParameters::default())
                .unwrap();
        let low_rank = compressed
            .block_cluster_tree()
            .leaves()
            .iter()
            .filter(|leaf| leaf.admissibility == Admissibility::LowRank)
            .count();
        assert!(low_rank > 0, "a level 3 screen has admissible pairs");
        let x = DVector::from_fn(space.number_of_dofs(), |i, _| 1.0 / (1.0 + i as f64));
        let exact = &dense * &x;
        let fast = compressed.matvec(&x);
        assert!((&fast - &exact).norm() / exact.norm() < 1e-4);
    }

    #[test]
    fn test_compression_rejects_space_of_the_wrong_form() {
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(
            &[
                M::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]),
                M::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]),
                M::zeros(2, 2),
                M::repeat(2, 2, 1.0),
            ],
            &knots,
            &knots,
        )
        .unwrap();
        let smooth = AnsatzSpace::new(
            &Geometry::from_patches(vec![patch]),
            2,
            1,
            1,
            DifferentialForm::Continuous,
        )
        .unwrap();
        assert!(matches!(
            H2Matrix::new(&SingleLayerOperator, &smooth, &CompressionParameters::default()),
            Err(AppError::SpaceMismatch { .. })
        ));
    }

    #[test]
    fn test_all_dense_tree_reproduces_dense_assembly() {
        // pushing the dense threshold to the mesh depth disables the
        // compression entirely, the matvec must then be exact
        let space = screen_space(2, 0);
        let dense = assemble_dense(&SingleLayerOperator, &space).unwrap();
        let parameters = CompressionParameters {
            min_cluster_level: 2,
            ..Default::default()
        };
        let compressed = H2Matrix::new(&SingleLayerOperator, &space, &parameters).unwrap();
        assert!((compressed.compression_rate() - 1.0).abs() < 1e-14);
        let x = DVector::from_fn(space.number_of_dofs(), |i, _| (i as f64).cos());
        let exact = &dense * &x;
        let fast = compressed.matvec(&x);
        assert!((&fast - &exact).norm() / exact.norm() < 1e-12);
    }
}
