use crate::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum BondError {
    #[error("Bond {index} connects particle {particle} to itself")]
    SelfBond { index: usize, particle: usize },
    #[error("Bond {index} references particle {particle}, but only {count} particles exist")]
    ParticleOutOfRange {
        index: usize,
        particle: usize,
        count: usize,
    },
}

/// When a harmonic bond exerts force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondBehavior {
    /// Force at any deviation from the rest length.
    Always,
    /// Force only when the bond is longer than its rest length.
    StretchedOnly,
    /// Force only when the bond is shorter than its rest length.
    CompressedOnly,
}

/// A harmonic bond between two particle indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicBond {
    pub a: usize,
    pub b: usize,
    pub length: Real,
    pub force_constant: Real,
    pub behavior: BondBehavior,
}

/// Bond list partitioned into chunks in which no particle index appears
/// twice.
///
/// This is the bond analogue of the cell-pair safe chunks: one worker per
/// bond inside a chunk touches two force slots no other worker of that chunk
/// touches, so the whole chunk accumulates without locks.
#[derive(Debug, Clone)]
pub struct BondChunks {
    bonds: Vec<HarmonicBond>,
    chunks: Vec<Vec<usize>>,
}

impl BondChunks {
    pub fn build(bonds: Vec<HarmonicBond>, particle_count: usize) -> Result<Self, BondError> {
        for (index, bond) in bonds.iter().enumerate() {
            if bond.a == bond.b {
                return Err(BondError::SelfBond {
                    index,
                    particle: bond.a,
                });
            }
            for particle in [bond.a, bond.b] {
                if particle >= particle_count {
                    return Err(BondError::ParticleOutOfRange {
                        index,
                        particle,
                        count: particle_count,
                    });
                }
            }
        }

        // Greedy placement: each bond lands in the first chunk where neither
        // endpoint is already used.
        let mut chunks: Vec<Vec<usize>> = Vec::new();
        let mut used: Vec<Vec<bool>> = Vec::new();
        for (index, bond) in bonds.iter().enumerate() {
            let slot = (0..chunks.len())
                .find(|&c| !used[c][bond.a] && !used[c][bond.b])
                .unwrap_or_else(|| {
                    chunks.push(Vec::new());
                    used.push(vec![false; particle_count]);
                    chunks.len() - 1
                });
            chunks[slot].push(index);
            used[slot][bond.a] = true;
            used[slot][bond.b] = true;
        }

        Ok(Self { bonds, chunks })
    }

    #[inline]
    pub fn bonds(&self) -> &[HarmonicBond] {
        &self.bonds
    }

    #[inline]
    pub fn chunks(&self) -> &[Vec<usize>] {
        &self.chunks
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }
}
