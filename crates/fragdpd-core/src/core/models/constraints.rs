use crate::Real;
use serde::{Deserialize, Serialize};

/// Per-axis boolean selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    pub const NONE: Self = Self {
        x: false,
        y: false,
        z: false,
    };

    #[inline]
    pub fn axis(&self, axis: usize) -> bool {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }
}

/// Axis-aligned sub-region whose walls reflect the particles of a molecule
/// type: a crossing position is mirrored back and the velocity component is
/// reversed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectingRegion {
    pub min: [Real; 3],
    pub max: [Real; 3],
}

/// Constraints attached to one molecule type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculeConstraints {
    /// Axes on which the type's particles never move: forces and velocity
    /// components on these axes are zeroed every step.
    pub frozen: AxisMask,
    /// Imposed velocity, overriding the integrated one each step.
    pub fixed_velocity: Option<[Real; 3]>,
    /// Region the type's particles bounce off.
    pub reflection: Option<ReflectingRegion>,
    /// Constant external acceleration on the type.
    pub acceleration: [Real; 3],
}

impl MoleculeConstraints {
    pub const UNCONSTRAINED: Self = Self {
        frozen: AxisMask::NONE,
        fixed_velocity: None,
        reflection: None,
        acceleration: [0.0; 3],
    };

    pub fn is_trivial(&self) -> bool {
        *self == Self::UNCONSTRAINED
    }
}

/// Constraint table of a topology: one entry per molecule type plus the
/// global gravitational acceleration.
///
/// Molecule types beyond the table length are unconstrained, so a topology
/// without constraints can carry an empty table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintTable {
    per_type: Vec<MoleculeConstraints>,
    pub gravity: [Real; 3],
}

impl ConstraintTable {
    pub fn new(per_type: Vec<MoleculeConstraints>, gravity: [Real; 3]) -> Self {
        Self { per_type, gravity }
    }

    pub fn unconstrained() -> Self {
        Self::default()
    }

    #[inline]
    pub fn of_type(&self, molecule_type: usize) -> &MoleculeConstraints {
        self.per_type
            .get(molecule_type)
            .unwrap_or(&MoleculeConstraints::UNCONSTRAINED)
    }

    /// True when applying the table would change nothing.
    pub fn is_trivial(&self) -> bool {
        self.gravity == [0.0; 3] && self.per_type.iter().all(MoleculeConstraints::is_trivial)
    }
}
