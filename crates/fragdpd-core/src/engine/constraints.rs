//! Application of the molecule-level constraint table inside the step loop.
//!
//! Order matters: external and gravitational accelerations are folded into
//! the forces before integration, the frozen-axis and fixed-velocity rules
//! override the integrated velocities afterwards, and boundary reflection
//! runs last on the updated positions.

use crate::core::models::constraints::ConstraintTable;
use crate::core::models::particles::ParticleSet;

/// Adds the per-type external acceleration and the global gravity to the
/// force arrays, as mass-scaled forces, and zeroes force components on
/// frozen axes.
pub(crate) fn apply_to_forces(table: &ConstraintTable, set: &mut ParticleSet) {
    if table.is_trivial() {
        return;
    }
    for i in 0..set.len() {
        let constraints = table.of_type(set.molecule_type[i]);
        let mass = set.dpd_mass[i];
        set.fx[i] += mass * (constraints.acceleration[0] + table.gravity[0]);
        set.fy[i] += mass * (constraints.acceleration[1] + table.gravity[1]);
        set.fz[i] += mass * (constraints.acceleration[2] + table.gravity[2]);
        if constraints.frozen.x {
            set.fx[i] = 0.0;
        }
        if constraints.frozen.y {
            set.fy[i] = 0.0;
        }
        if constraints.frozen.z {
            set.fz[i] = 0.0;
        }
    }
}

/// Overrides integrated velocities with the fixed-velocity and frozen-axis
/// rules. Operates on the main velocity arrays.
pub(crate) fn apply_to_velocities(table: &ConstraintTable, set: &mut ParticleSet) {
    if table.is_trivial() {
        return;
    }
    for i in 0..set.len() {
        let constraints = table.of_type(set.molecule_type[i]);
        if let Some(velocity) = constraints.fixed_velocity {
            set.vx[i] = velocity[0];
            set.vy[i] = velocity[1];
            set.vz[i] = velocity[2];
        }
        if constraints.frozen.x {
            set.vx[i] = 0.0;
        }
        if constraints.frozen.y {
            set.vy[i] = 0.0;
        }
        if constraints.frozen.z {
            set.vz[i] = 0.0;
        }
    }
}

/// Reflects particles off their type's region walls: the position is
/// mirrored at the crossed wall and the velocity component reversed.
pub(crate) fn apply_reflection(table: &ConstraintTable, set: &mut ParticleSet) {
    if table.is_trivial() {
        return;
    }
    for i in 0..set.len() {
        let Some(region) = table.of_type(set.molecule_type[i]).reflection else {
            continue;
        };
        let positions: [(&mut Vec<_>, &mut Vec<_>); 3] = [
            (&mut set.x, &mut set.vx),
            (&mut set.y, &mut set.vy),
            (&mut set.z, &mut set.vz),
        ];
        for (axis, (coords, velocities)) in positions.into_iter().enumerate() {
            let coord = &mut coords[i];
            if *coord < region.min[axis] {
                *coord = 2.0 * region.min[axis] - *coord;
                velocities[i] = -velocities[i];
            } else if *coord > region.max[axis] {
                *coord = 2.0 * region.max[axis] - *coord;
                velocities[i] = -velocities[i];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::constraints::{AxisMask, MoleculeConstraints, ReflectingRegion};
    use crate::core::models::particles::{ParticleInit, ParticleSetBuilder};

    fn one_particle(molecule_type: usize) -> ParticleSet {
        let mut builder = ParticleSetBuilder::new();
        builder.push(ParticleInit {
            position: [5.0, 5.0, 5.0],
            velocity: [1.0, 1.0, 1.0],
            molecule_type,
            ..ParticleInit::default()
        });
        builder.build().unwrap()
    }

    #[test]
    fn frozen_axes_zero_forces_and_velocities() {
        let table = ConstraintTable::new(
            vec![MoleculeConstraints {
                frozen: AxisMask {
                    x: true,
                    y: false,
                    z: true,
                },
                ..MoleculeConstraints::UNCONSTRAINED
            }],
            [0.0; 3],
        );
        let mut set = one_particle(0);
        set.fx[0] = 3.0;
        set.fy[0] = 3.0;
        set.fz[0] = 3.0;
        apply_to_forces(&table, &mut set);
        apply_to_velocities(&table, &mut set);
        assert_eq!((set.fx[0], set.fy[0], set.fz[0]), (0.0, 3.0, 0.0));
        assert_eq!((set.vx[0], set.vy[0], set.vz[0]), (0.0, 1.0, 0.0));
    }

    #[test]
    fn gravity_scales_with_particle_mass() {
        let table = ConstraintTable::new(Vec::new(), [0.0, 0.0, -10.0]);
        let mut builder = ParticleSetBuilder::new();
        builder.push(ParticleInit {
            dpd_mass: 2.0,
            ..ParticleInit::default()
        });
        let mut set = builder.build().unwrap();
        apply_to_forces(&table, &mut set);
        assert_eq!(set.fz[0], -20.0);
    }

    #[test]
    fn crossing_particle_is_mirrored_with_reversed_velocity() {
        let table = ConstraintTable::new(
            vec![MoleculeConstraints {
                reflection: Some(ReflectingRegion {
                    min: [0.0; 3],
                    max: [4.0; 3],
                }),
                ..MoleculeConstraints::UNCONSTRAINED
            }],
            [0.0; 3],
        );
        let mut set = one_particle(0);
        apply_reflection(&table, &mut set);
        // 5.0 past a wall at 4.0 mirrors to 3.0.
        assert_eq!(set.x[0], 3.0);
        assert_eq!(set.vx[0], -1.0);
    }

    #[test]
    fn unconstrained_types_are_untouched() {
        let table = ConstraintTable::new(
            vec![MoleculeConstraints {
                fixed_velocity: Some([0.0; 3]),
                ..MoleculeConstraints::UNCONSTRAINED
            }],
            [0.0; 3],
        );
        let mut set = one_particle(1);
        apply_to_velocities(&table, &mut set);
        assert_eq!(set.vx[0], 1.0);
    }
}
