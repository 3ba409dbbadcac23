//! Step-level measured quantities: kinetic energy, temperature, pressure,
//! surface tension, radii of gyration.
//!
//! Everything here sums serially in `f64`; these run once per output step
//! and their cost is negligible next to a force pass.

use crate::Real;
use crate::core::geometry::{BoxSize, PeriodicBoundaries, minimum_image};
use crate::core::models::particles::ParticleSet;
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// Total kinetic energy ½Σmv².
pub fn kinetic_energy(set: &ParticleSet) -> f64 {
    (0..set.len())
        .map(|i| {
            let v2 = set.vx[i] * set.vx[i] + set.vy[i] * set.vy[i] + set.vz[i] * set.vz[i];
            0.5 * (set.dpd_mass[i] * v2) as f64
        })
        .sum()
}

/// Instantaneous temperature in k_BT units, 2E_kin / (3N).
pub fn temperature(kinetic: f64, particle_count: usize) -> f64 {
    if particle_count == 0 {
        return 0.0;
    }
    2.0 * kinetic / (3.0 * particle_count as f64)
}

/// Diagonal of the pressure tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureDiagonal {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PressureDiagonal {
    pub fn mean(&self) -> f64 {
        (self.x + self.y + self.z) / 3.0
    }
}

/// Assembles the pressure diagonal from the kinetic term Σmv_a² and the
/// accumulated virial Σ(f/r)Δa², both divided by the box volume.
pub fn pressure_diagonal(
    set: &ParticleSet,
    virial: [f64; 3],
    box_size: &BoxSize,
) -> PressureDiagonal {
    let mut kinetic = [0.0f64; 3];
    for i in 0..set.len() {
        let mass = set.dpd_mass[i] as f64;
        kinetic[0] += mass * (set.vx[i] * set.vx[i]) as f64;
        kinetic[1] += mass * (set.vy[i] * set.vy[i]) as f64;
        kinetic[2] += mass * (set.vz[i] * set.vz[i]) as f64;
    }
    let inv_volume = 1.0 / box_size.volume() as f64;
    PressureDiagonal {
        x: (kinetic[0] + virial[0]) * inv_volume,
        y: (kinetic[1] + virial[1]) * inv_volume,
        z: (kinetic[2] + virial[2]) * inv_volume,
    }
}

/// Surface tension along z, ½L_z·(P_zz − ½(P_xx + P_yy)). The leading ½
/// divides between the two interfaces a periodic slab geometry holds.
pub fn surface_tension(pressure: &PressureDiagonal, length_z: Real) -> f64 {
    0.5 * length_z as f64 * (pressure.z - 0.5 * (pressure.x + pressure.y))
}

/// Mass-weighted radius of gyration averaged over the molecules of each
/// molecule type. Types without molecules report 0.
///
/// Positions within a molecule are unwrapped by chaining minimum-image
/// displacements from the molecule's first particle, so a molecule halved
/// by a periodic seam measures its physical extent.
pub fn radius_of_gyration(
    set: &ParticleSet,
    box_size: &BoxSize,
    periodic: &PeriodicBoundaries,
    molecule_type_count: usize,
) -> Vec<f64> {
    let mut molecules: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for i in 0..set.len() {
        molecules
            .entry((set.molecule_type[i], set.molecule_instance[i]))
            .or_default()
            .push(i);
    }

    let mut sums = vec![0.0f64; molecule_type_count];
    let mut counts = vec![0usize; molecule_type_count];
    for ((molecule_type, _), members) in &molecules {
        if *molecule_type >= molecule_type_count {
            continue;
        }
        let reference = Vector3::new(
            set.x[members[0]],
            set.y[members[0]],
            set.z[members[0]],
        );
        let unwrapped: Vec<Vector3<Real>> = members
            .iter()
            .map(|&i| {
                let delta = minimum_image(
                    [
                        set.x[i] - reference.x,
                        set.y[i] - reference.y,
                        set.z[i] - reference.z,
                    ],
                    box_size,
                    periodic,
                );
                reference + Vector3::new(delta[0], delta[1], delta[2])
            })
            .collect();

        let total_mass: Real = members.iter().map(|&i| set.molar_mass[i]).sum();
        if total_mass <= 0.0 {
            continue;
        }
        let center = unwrapped
            .iter()
            .zip(members)
            .map(|(p, &i)| p * set.molar_mass[i])
            .sum::<Vector3<Real>>()
            / total_mass;
        let gyration_sq: Real = unwrapped
            .iter()
            .zip(members)
            .map(|(p, &i)| set.molar_mass[i] * (p - center).norm_squared())
            .sum::<Real>()
            / total_mass;

        sums[*molecule_type] += (gyration_sq as f64).sqrt();
        counts[*molecule_type] += 1;
    }

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| if count == 0 { 0.0 } else { sum / count as f64 })
        .collect()
}
