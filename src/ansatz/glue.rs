//! Identification of B-spline dofs across patch boundaries.
//!
//! Dof enumeration on one patch, with `dim_x = 4` and `dim_y = 3`:
//!
//! ```text
//!               edge 2
//!    y      | 8  9 10 11 |
//!    ^ edge | 4  5  6  7 | edge
//!    |    3 | 0  1  2  3 |    1
//!               edge 0
//!     --> x
//! ```
//!
//! Edges are parametrized counterclockwise: 0 = (0,0)->(1,0),
//! 1 = (1,0)->(1,1), 2 = (1,1)->(0,1), 3 = (0,1)->(0,0).

use nalgebra_sparse::{coo::CooMatrix, csc::CscMatrix};

use crate::cluster::PatchInterface;
use crate::operators::DifferentialForm;

use super::projector::Projector;
use super::superspace::SuperSpace;

/// A group of dofs that represent the same function on the glued surface.
#[derive(Debug, Clone)]
struct DofIdentification {
    dofs: Vec<usize>,
}

/// Merges matching dofs across patch edges. The smallest dof index of each
/// group acts as the master; all others are dropped from the dof count.
#[derive(Debug)]
pub struct Glue {
    matrix: CscMatrix<f64>,
}

impl Glue {
    pub fn new(super_space: &SuperSpace, projector: &Projector, form: DifferentialForm) -> Self {
        let edges = super_space.mesh().element_tree().patch_topology_info();
        let identifications = match form {
            // element-local spaces need no gluing
            DifferentialForm::Discontinuous => Vec::new(),
            DifferentialForm::Continuous => {
                make_dof_identification(&edges, super_space, projector)
            }
        };
        let matrix = assemble_glue_matrix(projector.dofs_after(), identifications);
        Self { matrix }
    }

    pub fn glue_matrix(&self) -> &CscMatrix<f64> {
        &self.matrix
    }

    pub fn dofs_after(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Dof indices with support on the given edge of a patch with `dim_x` by
/// `dim_y` dofs. `shift` moves the indices to the right patch.
fn edge_dof_indices(edge: i32, dim_x: usize, dim_y: usize, shift: usize) -> Vec<usize> {
    match edge {
        0 => (0..dim_x).map(|i| i + shift).collect(),
        1 => (0..dim_y).map(|i| dim_x * (i + 1) - 1 + shift).collect(),
        2 => (0..dim_x).map(|i| dim_x * (dim_y - 1) + i + shift).collect(),
        3 => (0..dim_y).map(|i| dim_x * i + shift).collect(),
        // -1 stands for a missing partner on the geometry boundary
        _ => Vec::new(),
    }
}

fn edge_is_forward_parametrized(edge: i32) -> bool {
    edge == 0 || edge == 1
}

/// Two glued edges run in opposite directions along the seam unless both are
/// forward or both are backward parametrized.
fn reverse_parametrized(interface: &PatchInterface) -> bool {
    edge_is_forward_parametrized(interface.edges.0)
        == edge_is_forward_parametrized(interface.edges.1)
}

fn make_dof_identification(
    edges: &[PatchInterface],
    super_space: &SuperSpace,
    projector: &Projector,
) -> Vec<DofIdentification> {
    let one_d_dim = super_space.polynomial_degree()
        + 1
        + projector.knot_repetition() * ((1 << super_space.refinement_level()) - 1);
    let dofs_per_patch = one_d_dim * one_d_dim;

    let mut out: Vec<DofIdentification> = Vec::with_capacity(edges.len() * one_d_dim);
    // storage location of each dof in `out`, if it is part of a group
    let mut already_stored_in: Vec<Option<usize>> = vec![None; projector.dofs_after()];

    for interface in edges {
        if interface.patches.0 < 0 || interface.patches.1 < 0 {
            continue;
        }
        let shift_1 = interface.patches.0 as usize * dofs_per_patch;
        let shift_2 = interface.patches.1 as usize * dofs_per_patch;
        let dofs_1 = edge_dof_indices(interface.edges.0, one_d_dim, one_d_dim, shift_1);
        let dofs_2 = edge_dof_indices(interface.edges.1, one_d_dim, one_d_dim, shift_2);
        let needs_reversion = reverse_parametrized(interface);

        for i in 0..one_d_dim {
            let j = if needs_reversion { one_d_dim - 1 - i } else { i };
            debug_assert_ne!(dofs_1[i], dofs_2[j]);
            let small = dofs_1[i].min(dofs_2[j]);
            let large = dofs_1[i].max(dofs_2[j]);

            match (already_stored_in[small], already_stored_in[large]) {
                (Some(store), None) => {
                    out[store].dofs.push(large);
                    already_stored_in[large] = Some(store);
                }
                (None, Some(store)) => {
                    out[store].dofs.push(small);
                    already_stored_in[small] = Some(store);
                }
                (Some(first), Some(second)) if first != second => {
                    // two groups meet at a corner and collapse into one
                    let keep = first.min(second);
                    let drain = first.max(second);
                    let moved = std::mem::take(&mut out[drain].dofs);
                    for dof in moved {
                        already_stored_in[dof] = Some(keep);
                        out[keep].dofs.push(dof);
                    }
                }
                (Some(_), Some(_)) => {}
                (None, None) => {
                    already_stored_in[small] = Some(out.len());
                    already_stored_in[large] = Some(out.len());
                    out.push(DofIdentification {
                        dofs: vec![small, large],
                    });
                }
            }
        }
    }
    // collapsed groups leave empty sets behind
    out.retain(|identification| !identification.dofs.is_empty());
    out
}

fn assemble_glue_matrix(
    pre_dofs: usize,
    mut identifications: Vec<DofIdentification>,
) -> CscMatrix<f64> {
    let mut dof_is_slave = vec![false; pre_dofs];
    let mut dof_is_master = vec![false; pre_dofs];
    let mut number_of_slaves = 0;
    for identification in &mut identifications {
        identification.dofs.sort_unstable();
        dof_is_master[identification.dofs[0]] = true;
        for &dof in &identification.dofs[1..] {
            dof_is_slave[dof] = true;
            number_of_slaves += 1;
        }
    }
    identifications.sort_by_key(|identification| identification.dofs[0]);

    let post_dofs = pre_dofs - number_of_slaves;
    let mut triplets = CooMatrix::new(pre_dofs, post_dofs);
    let mut skip = 0;
    let mut master_index = 0;
    for post_index in 0..post_dofs {
        while post_index + skip < pre_dofs && dof_is_slave[post_index + skip] {
            skip += 1;
        }
        let pre_index = post_index + skip;
        triplets.push(pre_index, post_index, 1.0);
        debug_assert!(!(dof_is_master[pre_index] && dof_is_slave[pre_index]));
        if dof_is_master[pre_index] {
            debug_assert_eq!(pre_index, identifications[master_index].dofs[0]);
            for &slave in &identifications[master_index].dofs[1..] {
                triplets.push(slave, post_index, 1.0);
            }
            master_index += 1;
        }
    }
    CscMatrix::from(&triplets)
}
