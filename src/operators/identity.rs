//! Mass matrices, the identity in Galerkin discretization.

use nalgebra::DMatrix;

use crate::ansatz::SuperSpace;
use crate::geometry::SurfacePoint;

use super::{DifferentialForm, LocalOperator};

fn mass_integrand(super_space: &SuperSpace, p: &SurfacePoint, interaction: &mut DMatrix<f64>) {
    let integrand = p.integration_element() * p.weight;
    super_space.add_scaled_basis_interaction(interaction, integrand, &p.reference, &p.reference);
}

/// Mass matrix of a globally continuous space.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousMassOperator;

impl LocalOperator for ContinuousMassOperator {
    const FORM: DifferentialForm = DifferentialForm::Continuous;

    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p: &SurfacePoint,
        interaction: &mut DMatrix<f64>,
    ) {
        mass_integrand(super_space, p, interaction);
    }
}

/// Mass matrix of an element-local space.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscontinuousMassOperator;

impl LocalOperator for DiscontinuousMassOperator {
    const FORM: DifferentialForm = DifferentialForm::Discontinuous;

    fn evaluate_integrand(
        &self,
        super_space: &SuperSpace,
        p: &SurfacePoint,
        interaction: &mut DMatrix<f64>,
    ) {
        mass_integrand(super_space, p, interaction);
    }
}
