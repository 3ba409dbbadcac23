//! Intramolecular harmonic-bond evaluation.
//!
//! Bonds use the same safe-chunk discipline as the cell-pair driver: within
//! one chunk no particle appears in two bonds, so workers write forces
//! without synchronization, and chunks are separated by a join.

use super::accumulator::AdderGroup;
use super::error::EngineError;
use super::pairs::{SharedForces, WorkerPool};
use crate::Real;
use crate::core::forces::bond;
use crate::core::geometry::{BoxSize, PeriodicBoundaries, minimum_image};
use crate::core::models::bonds::{BondChunks, HarmonicBond};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Borrowed inputs of one bonded pass.
pub(crate) struct BondedPass<'a> {
    pub bonds: &'a BondChunks,
    pub box_size: &'a BoxSize,
    pub periodic: &'a PeriodicBoundaries,
    pub x: &'a [Real],
    pub y: &'a [Real],
    pub z: &'a [Real],
}

impl BondedPass<'_> {
    fn displacement(&self, bond: &HarmonicBond) -> ([Real; 3], Real) {
        let delta = minimum_image(
            [
                self.x[bond.a] - self.x[bond.b],
                self.y[bond.a] - self.y[bond.b],
                self.z[bond.a] - self.z[bond.b],
            ],
            self.box_size,
            self.periodic,
        );
        let dist =
            (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
        (delta, dist)
    }
}

#[cfg(feature = "parallel")]
fn for_each_bond<F>(pool: Option<&WorkerPool>, indices: &[usize], task: F)
where
    F: Fn(usize) + Sync,
{
    match pool {
        Some(pool) => pool.install(|| indices.par_iter().copied().for_each(&task)),
        None => indices.iter().copied().for_each(task),
    }
}

#[cfg(not(feature = "parallel"))]
fn for_each_bond<F>(_pool: Option<&WorkerPool>, indices: &[usize], task: F)
where
    F: Fn(usize) + Sync,
{
    indices.iter().copied().for_each(task)
}

/// Accumulates bond forces into the shared force view.
pub(crate) fn accumulate_forces(
    pass: &BondedPass<'_>,
    forces: &SharedForces<'_>,
    pool: Option<&WorkerPool>,
) -> Result<(), EngineError> {
    for chunk in pass.bonds.chunks() {
        for_each_bond(pool, chunk, |index| {
            let bond = &pass.bonds.bonds()[index];
            let (delta, dist) = pass.displacement(bond);
            if dist == 0.0 {
                return;
            }
            let force = bond::bond_force(bond.force_constant, dist, bond.length, bond.behavior);
            let inv_dist = 1.0 / dist;
            let f = [
                force * delta[0] * inv_dist,
                force * delta[1] * inv_dist,
                force * delta[2] * inv_dist,
            ];
            // Sound per the chunk invariant: no particle twice per chunk.
            unsafe {
                forces.add(bond.a, f[0], f[1], f[2]);
                forces.add(bond.b, -f[0], -f[1], -f[2]);
            }
        });
    }
    Ok(())
}

/// Accumulates bond potential energy and virial into the adders.
pub(crate) fn accumulate_potential(
    pass: &BondedPass<'_>,
    adders: &AdderGroup,
    pool: Option<&WorkerPool>,
) {
    for chunk in pass.bonds.chunks() {
        for_each_bond(pool, chunk, |index| {
            let bond = &pass.bonds.bonds()[index];
            let (delta, dist) = pass.displacement(bond);
            adders.potential.add(bond::bond_potential(
                bond.force_constant,
                dist,
                bond.length,
                bond.behavior,
            ) as f64);
            if dist > 0.0 {
                let force =
                    bond::bond_force(bond.force_constant, dist, bond.length, bond.behavior);
                let force_over_dist = force / dist;
                adders.add_virial(
                    (force_over_dist * delta[0] * delta[0]) as f64,
                    (force_over_dist * delta[1] * delta[1]) as f64,
                    (force_over_dist * delta[2] * delta[2]) as f64,
                );
            }
        });
    }
}
