use super::MIN_PAIR_DISTANCE;
use crate::Real;
use crate::core::forces::electrostatics::{self, ElectrostaticsParams};
use crate::engine::error::EngineError;
use crate::engine::pairs::{PairKernel, PairScratch};

fn charge_product(charge: &[Real], i: usize, j: usize) -> Result<Real, EngineError> {
    let product = charge[i] * charge[j];
    if product == 0.0 {
        // The charged compaction only threads non-zero charges; a zero
        // product here means the compaction and the pair list disagree.
        return Err(EngineError::Internal(format!(
            "electrostatic pair ({i}, {j}) has zero charge product"
        )));
    }
    Ok(product)
}

/// Damped, clamped Coulomb-like pair force over the charged compaction.
pub struct ElectrostaticForceKernel<'a> {
    pub charge: &'a [Real],
    pub params: &'a ElectrostaticsParams,
}

impl PairKernel for ElectrostaticForceKernel<'_> {
    fn cutoff(&self) -> Real {
        self.params.cutoff
    }

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError> {
        let product = charge_product(self.charge, i, j)?;
        if dist < MIN_PAIR_DISTANCE {
            return Ok(());
        }

        let force = electrostatics::force(dist, product, self.params);
        let inv_dist = 1.0 / dist;
        let f = [
            force * delta[0] * inv_dist,
            force * delta[1] * inv_dist,
            force * delta[2] * inv_dist,
        ];
        unsafe {
            scratch.forces.add(i, f[0], f[1], f[2]);
            scratch.forces.add(j, -f[0], -f[1], -f[2]);
        }
        Ok(())
    }
}

/// Electrostatic pair potential and virial, consistent with the clamped
/// force law.
pub struct ElectrostaticPotentialKernel<'a> {
    pub charge: &'a [Real],
    pub params: &'a ElectrostaticsParams,
}

impl PairKernel for ElectrostaticPotentialKernel<'_> {
    fn cutoff(&self) -> Real {
        self.params.cutoff
    }

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError> {
        let product = charge_product(self.charge, i, j)?;
        if dist < MIN_PAIR_DISTANCE {
            return Ok(());
        }

        scratch
            .adders
            .potential
            .add(electrostatics::potential(dist, product, self.params) as f64);

        let force_over_dist = electrostatics::force(dist, product, self.params) / dist;
        scratch.adders.add_virial(
            (force_over_dist * delta[0] * delta[0]) as f64,
            (force_over_dist * delta[1] * delta[1]) as f64,
            (force_over_dist * delta[2] * delta[2]) as f64,
        );
        Ok(())
    }
}
