use crate::Real;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParticleSetError {
    #[error("Particle set is empty")]
    Empty,
    #[error("DPD mass of particle {index} must be positive, got {mass}")]
    NonPositiveMass { index: usize, mass: Real },
}

/// Per-particle initialization record consumed by [`ParticleSetBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct ParticleInit {
    pub position: [Real; 3],
    pub velocity: [Real; 3],
    pub type_index: usize,
    pub molecule_type: usize,
    pub molecule_instance: usize,
    pub charge: Real,
    pub dpd_mass: Real,
    pub molar_mass: Real,
}

impl Default for ParticleInit {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            type_index: 0,
            molecule_type: 0,
            molecule_instance: 0,
            charge: 0.0,
            dpd_mass: 1.0,
            molar_mass: 1.0,
        }
    }
}

/// Mutable struct-of-arrays particle state.
///
/// Every array shares one length and one indexing; a particle index is stable
/// for the lifetime of a run (no reordering). The two force channels exist
/// because the self-consistent integrators re-evaluate only the dissipative
/// term: `f` holds the complete force of the current evaluation, `f_two`
/// stashes the velocity-independent part the iteration restores from.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    pub x: Vec<Real>,
    pub y: Vec<Real>,
    pub z: Vec<Real>,
    pub old_x: Vec<Real>,
    pub old_y: Vec<Real>,
    pub old_z: Vec<Real>,
    pub vx: Vec<Real>,
    pub vy: Vec<Real>,
    pub vz: Vec<Real>,
    pub new_vx: Vec<Real>,
    pub new_vy: Vec<Real>,
    pub new_vz: Vec<Real>,
    pub fx: Vec<Real>,
    pub fy: Vec<Real>,
    pub fz: Vec<Real>,
    pub f_two_x: Vec<Real>,
    pub f_two_y: Vec<Real>,
    pub f_two_z: Vec<Real>,
    pub type_index: Vec<usize>,
    pub molecule_type: Vec<usize>,
    pub molecule_instance: Vec<usize>,
    pub charge: Vec<Real>,
    pub dpd_mass: Vec<Real>,
    pub molar_mass: Vec<Real>,
    charged_indices: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct ParticleSetBuilder {
    records: Vec<ParticleInit>,
}

impl ParticleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: ParticleInit) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn build(self) -> Result<ParticleSet, ParticleSetError> {
        if self.records.is_empty() {
            return Err(ParticleSetError::Empty);
        }
        for (index, record) in self.records.iter().enumerate() {
            if !(record.dpd_mass > 0.0) {
                return Err(ParticleSetError::NonPositiveMass {
                    index,
                    mass: record.dpd_mass,
                });
            }
        }

        let n = self.records.len();
        let mut set = ParticleSet {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            old_x: Vec::with_capacity(n),
            old_y: Vec::with_capacity(n),
            old_z: Vec::with_capacity(n),
            vx: Vec::with_capacity(n),
            vy: Vec::with_capacity(n),
            vz: Vec::with_capacity(n),
            new_vx: vec![0.0; n],
            new_vy: vec![0.0; n],
            new_vz: vec![0.0; n],
            fx: vec![0.0; n],
            fy: vec![0.0; n],
            fz: vec![0.0; n],
            f_two_x: vec![0.0; n],
            f_two_y: vec![0.0; n],
            f_two_z: vec![0.0; n],
            type_index: Vec::with_capacity(n),
            molecule_type: Vec::with_capacity(n),
            molecule_instance: Vec::with_capacity(n),
            charge: Vec::with_capacity(n),
            dpd_mass: Vec::with_capacity(n),
            molar_mass: Vec::with_capacity(n),
            charged_indices: Vec::new(),
        };

        for (index, record) in self.records.into_iter().enumerate() {
            set.x.push(record.position[0]);
            set.y.push(record.position[1]);
            set.z.push(record.position[2]);
            set.old_x.push(record.position[0]);
            set.old_y.push(record.position[1]);
            set.old_z.push(record.position[2]);
            set.vx.push(record.velocity[0]);
            set.vy.push(record.velocity[1]);
            set.vz.push(record.velocity[2]);
            set.type_index.push(record.type_index);
            set.molecule_type.push(record.molecule_type);
            set.molecule_instance.push(record.molecule_instance);
            set.charge.push(record.charge);
            set.dpd_mass.push(record.dpd_mass);
            set.molar_mass.push(record.molar_mass);
            if record.charge != 0.0 {
                set.charged_indices.push(index);
            }
        }

        Ok(set)
    }
}

impl ParticleSet {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Global indices of particles with non-zero charge, in index order.
    ///
    /// The electrostatics calculators iterate only this compaction so that a
    /// zero-charge pair can never legitimately reach their callbacks.
    #[inline]
    pub fn charged_indices(&self) -> &[usize] {
        &self.charged_indices
    }

    /// Copies current positions into the "old" position channel.
    pub fn save_positions(&mut self) {
        self.old_x.copy_from_slice(&self.x);
        self.old_y.copy_from_slice(&self.y);
        self.old_z.copy_from_slice(&self.z);
    }

    /// Restores current positions from the "old" position channel.
    pub fn restore_positions(&mut self) {
        self.x.copy_from_slice(&self.old_x);
        self.y.copy_from_slice(&self.old_y);
        self.z.copy_from_slice(&self.old_z);
    }

    pub fn zero_forces(&mut self) {
        self.fx.fill(0.0);
        self.fy.fill(0.0);
        self.fz.fill(0.0);
    }

    /// Stashes the current forces in the velocity-independent channel.
    pub fn save_velocity_independent_forces(&mut self) {
        self.f_two_x.copy_from_slice(&self.fx);
        self.f_two_y.copy_from_slice(&self.fy);
        self.f_two_z.copy_from_slice(&self.fz);
    }

    /// Overwrites the forces with the stashed velocity-independent ones.
    pub fn restore_velocity_independent_forces(&mut self) {
        self.fx.copy_from_slice(&self.f_two_x);
        self.fy.copy_from_slice(&self.f_two_y);
        self.fz.copy_from_slice(&self.f_two_z);
    }

    pub fn zero_velocities(&mut self) {
        self.vx.fill(0.0);
        self.vy.fill(0.0);
        self.vz.fill(0.0);
    }
}
