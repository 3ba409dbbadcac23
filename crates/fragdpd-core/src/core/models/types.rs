use crate::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum TypeTableError {
    #[error("Interaction matrix has {got} rows, expected {expected}")]
    WrongRowCount { expected: usize, got: usize },
    #[error("Interaction matrix row {row} has {got} entries, expected {expected}")]
    WrongRowLength {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("Interaction matrix is not symmetric at ({i}, {j}): {a_ij} vs {a_ji}")]
    Asymmetric {
        i: usize,
        j: usize,
        a_ij: Real,
        a_ji: Real,
    },
    #[error("No particle types defined")]
    NoTypes,
}

/// Names of the particle types of a simulation, indexed by type index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleTypeTable {
    names: Vec<String>,
}

impl ParticleTypeTable {
    pub fn new(names: Vec<String>) -> Result<Self, TypeTableError> {
        if names.is_empty() {
            return Err(TypeTableError::NoTypes);
        }
        Ok(Self { names })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn name(&self, type_index: usize) -> &str {
        &self.names[type_index]
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Symmetric matrix of conservative DPD coefficients a(ij), one entry per
/// ordered particle-type pair, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    n_types: usize,
    coefficients: Vec<Real>,
}

impl InteractionMatrix {
    pub fn new(rows: Vec<Vec<Real>>) -> Result<Self, TypeTableError> {
        let n_types = rows.len();
        if n_types == 0 {
            return Err(TypeTableError::NoTypes);
        }
        for (row, entries) in rows.iter().enumerate() {
            if entries.len() != n_types {
                return Err(TypeTableError::WrongRowLength {
                    row,
                    expected: n_types,
                    got: entries.len(),
                });
            }
        }
        for i in 0..n_types {
            for j in (i + 1)..n_types {
                if rows[i][j] != rows[j][i] {
                    return Err(TypeTableError::Asymmetric {
                        i,
                        j,
                        a_ij: rows[i][j],
                        a_ji: rows[j][i],
                    });
                }
            }
        }
        Ok(Self {
            n_types,
            coefficients: rows.into_iter().flatten().collect(),
        })
    }

    /// Uniform a(ij) = a for every type pair.
    pub fn uniform(n_types: usize, a: Real) -> Result<Self, TypeTableError> {
        Self::new(vec![vec![a; n_types]; n_types])
    }

    #[inline]
    pub fn n_types(&self) -> usize {
        self.n_types
    }

    #[inline]
    pub fn a(&self, type_i: usize, type_j: usize) -> Real {
        self.coefficients[type_i * self.n_types + type_j]
    }
}
