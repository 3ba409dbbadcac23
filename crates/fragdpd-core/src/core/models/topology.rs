use super::bonds::BondChunks;
use super::constraints::ConstraintTable;
use super::particles::ParticleSet;
use super::types::{InteractionMatrix, ParticleTypeTable};
use crate::core::geometry::{BoxSize, PeriodicBoundaries};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum TopologyError {
    #[error(
        "Interaction matrix covers {matrix} particle types but the type table names {table}"
    )]
    TypeCountMismatch { matrix: usize, table: usize },
    #[error("Particle {particle} references unknown particle type {type_index}")]
    TypeIndexOutOfRange { particle: usize, type_index: usize },
    #[error("Bond references particle {particle}, but the set holds {count} particles")]
    BondOutOfRange { particle: usize, count: usize },
}

/// Everything about a system that does not change during a run: the box,
/// its boundary conditions, the type and interaction tables, the bond
/// table, and the constraint table.
#[derive(Debug, Clone)]
pub struct Topology {
    pub box_size: BoxSize,
    pub periodic: PeriodicBoundaries,
    pub types: ParticleTypeTable,
    pub interactions: InteractionMatrix,
    pub bonds: BondChunks,
    pub constraints: ConstraintTable,
}

impl Topology {
    /// Checks the cross-references between this topology and a particle
    /// set. Run once before a simulation; the hot loops index without
    /// bounds concern afterwards.
    pub fn validate_against(&self, set: &ParticleSet) -> Result<(), TopologyError> {
        if self.interactions.n_types() != self.types.len() {
            return Err(TopologyError::TypeCountMismatch {
                matrix: self.interactions.n_types(),
                table: self.types.len(),
            });
        }
        for (particle, &type_index) in set.type_index.iter().enumerate() {
            if type_index >= self.types.len() {
                return Err(TopologyError::TypeIndexOutOfRange {
                    particle,
                    type_index,
                });
            }
        }
        for bond in self.bonds.bonds() {
            for particle in [bond.a, bond.b] {
                if particle >= set.len() {
                    return Err(TopologyError::BondOutOfRange {
                        particle,
                        count: set.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
