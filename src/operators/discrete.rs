//! Galerkin assembly of discrete operators.
//!
//! Both routines first assemble the operator in the element-local basis
//! and conjugate with the transformation matrix of the ansatz space
//! afterwards, so the element loops never see the spline topology.

use nalgebra::{DMatrix, DMatrixViewMut};
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csc::CscMatrix;
use rayon::prelude::*;

use crate::ansatz::AnsatzSpace;
use crate::duffy;
use crate::error::AppError;
use crate::operators::{LinearOperator, LocalOperator};
use crate::quadrature;

/// Assembles the dense Galerkin matrix of a boundary integral operator.
///
/// Element interactions are computed column by column in parallel; each
/// column block of the local matrix is contiguous in memory and owned by
/// exactly one task.
pub fn assemble_dense<L>(operator: &L, space: &AnsatzSpace) -> Result<DMatrix<f64>, AppError>
where
    L: LinearOperator + Sync,
{
    check_form(L::FORM, space)?;
    let super_space = space.super_space();
    let tree = super_space.mesh().element_tree();
    let q = super_space.polynomial_degree_plus_one_squared();
    let n = tree.number_of_leafs();
    let ffield_deg = operator.far_field_quadrature_degree(super_space.polynomial_degree());
    let ffield_qnodes = duffy::compute_ffield_qnodes(super_space, quadrature::tensor_rule(ffield_deg));

    let mut local = DMatrix::zeros(q * n, q * n);
    local
        .as_mut_slice()
        .par_chunks_mut(q * q * n)
        .enumerate()
        .try_for_each(|(col, chunk)| -> Result<(), AppError> {
            let e2 = tree.leaf(col);
            let mut block = DMatrixViewMut::from_slice(chunk, q * n, q);
            let mut interaction = DMatrix::zeros(q, q);
            for (row, e1) in tree.leafs().enumerate() {
                duffy::evaluate_bilinear_form(
                    operator,
                    super_space,
                    e1,
                    e2,
                    &ffield_qnodes[row],
                    &ffield_qnodes[col],
                    &mut interaction,
                )?;
                block.view_mut((q * row, 0), (q, q)).copy_from(&interaction);
            }
            Ok(())
        })?;
    tracing::debug!(
        elements = n,
        local_dofs = q * n,
        dofs = space.number_of_dofs(),
        "Dense operator assembled"
    );

    let transposed = space.transformation_matrix().transpose();
    let left = &transposed * &local;
    Ok((&transposed * &left.transpose()).transpose())
}

/// Assembles the sparse Galerkin matrix of an operator acting element by
/// element, such as the mass matrix.
pub fn assemble_local<L>(operator: &L, space: &AnsatzSpace) -> Result<CscMatrix<f64>, AppError>
where
    L: LocalOperator,
{
    check_form(L::FORM, space)?;
    let super_space = space.super_space();
    let tree = super_space.mesh().element_tree();
    let q = super_space.polynomial_degree_plus_one_squared();
    let n = tree.number_of_leafs();
    let rule = quadrature::tensor_rule(super_space.polynomial_degree() + 1);

    let mut coo = CooMatrix::new(q * n, q * n);
    let mut interaction = DMatrix::zeros(q, q);
    for (index, element) in tree.leafs().enumerate() {
        interaction.fill(0.0);
        for (xi, &w) in rule.xi.iter().zip(&rule.weights) {
            let qp = super_space.map_to_surface(element, xi, w);
            operator.evaluate_integrand(super_space, &qp, &mut interaction);
        }
        for j in 0..q {
            for i in 0..q {
                coo.push(q * index + i, q * index + j, interaction[(i, j)]);
            }
        }
    }

    let local = CscMatrix::from(&coo);
    let transformation = space.transformation_matrix();
    Ok(&transformation.transpose() * &(&local * transformation))
}

/// The Galerkin pairing is only meaningful when the space provides the
/// continuity the operator was derived for.
pub(crate) fn check_form(
    expected: crate::operators::DifferentialForm,
    space: &AnsatzSpace,
) -> Result<(), AppError> {
    if expected != space.form() {
        return Err(AppError::SpaceMismatch {
            expected,
            actual: space.form(),
        });
    }
    Ok(())
}
