use crate::Real;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum GeometryError {
    #[error("Box length along axis {axis} must be positive, got {length}")]
    NonPositiveLength { axis: usize, length: Real },
}

/// Rectangular simulation box extents.
///
/// Half-lengths are precomputed because the minimum-image convention compares
/// displacements against them on every pair evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSize {
    lengths: [Real; 3],
    half_lengths: [Real; 3],
}

impl BoxSize {
    pub fn new(x: Real, y: Real, z: Real) -> Result<Self, GeometryError> {
        let lengths = [x, y, z];
        for (axis, &length) in lengths.iter().enumerate() {
            if !(length > 0.0) {
                return Err(GeometryError::NonPositiveLength { axis, length });
            }
        }
        Ok(Self {
            lengths,
            half_lengths: [x / 2.0, y / 2.0, z / 2.0],
        })
    }

    pub fn cubic(edge: Real) -> Result<Self, GeometryError> {
        Self::new(edge, edge, edge)
    }

    #[inline]
    pub fn lengths(&self) -> [Real; 3] {
        self.lengths
    }

    #[inline]
    pub fn length(&self, axis: usize) -> Real {
        self.lengths[axis]
    }

    #[inline]
    pub fn half_length(&self, axis: usize) -> Real {
        self.half_lengths[axis]
    }

    #[inline]
    pub fn volume(&self) -> Real {
        self.lengths[0] * self.lengths[1] * self.lengths[2]
    }
}

/// Per-axis periodicity flags. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicBoundaries {
    flags: [bool; 3],
}

impl PeriodicBoundaries {
    pub fn new(x: bool, y: bool, z: bool) -> Self {
        Self { flags: [x, y, z] }
    }

    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    pub fn none() -> Self {
        Self::new(false, false, false)
    }

    #[inline]
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.flags[axis]
    }
}

/// Minimum-image correction of a single displacement component.
#[inline]
pub fn minimum_image_component(mut delta: Real, length: Real, half_length: Real) -> Real {
    if delta > half_length {
        delta -= length;
    } else if delta < -half_length {
        delta += length;
    }
    delta
}

/// Minimum-image displacement from particle j to particle i.
#[inline]
pub fn minimum_image(
    mut delta: [Real; 3],
    box_size: &BoxSize,
    periodic: &PeriodicBoundaries,
) -> [Real; 3] {
    for axis in 0..3 {
        if periodic.is_periodic(axis) {
            delta[axis] = minimum_image_component(
                delta[axis],
                box_size.length(axis),
                box_size.half_length(axis),
            );
        }
    }
    delta
}

/// Wraps a coordinate into `[0, length)` on a periodic axis.
///
/// A single addition or subtraction suffices: the integrators never move a
/// particle by more than one box length per step.
#[inline]
pub fn wrap_component(mut coord: Real, length: Real) -> Real {
    if coord >= length {
        coord -= length;
    } else if coord < 0.0 {
        coord += length;
    }
    coord
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: Real = 1e-12;

    fn approx_equal(a: Real, b: Real) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn box_size_precomputes_half_lengths_and_volume() {
        let box_size = BoxSize::new(10.0, 20.0, 5.0).unwrap();
        assert!(approx_equal(box_size.half_length(0), 5.0));
        assert!(approx_equal(box_size.half_length(1), 10.0));
        assert!(approx_equal(box_size.half_length(2), 2.5));
        assert!(approx_equal(box_size.volume(), 1000.0));
    }

    #[test]
    fn box_size_with_non_positive_length_is_rejected() {
        assert!(matches!(
            BoxSize::new(10.0, 0.0, 5.0),
            Err(GeometryError::NonPositiveLength { axis: 1, .. })
        ));
        assert!(BoxSize::new(10.0, 10.0, -1.0).is_err());
    }

    #[test]
    fn minimum_image_picks_wrapped_displacement_across_boundary() {
        // Two particles at x = 0.1 and x = L - 0.1 are 0.2 apart through the
        // boundary, not L - 0.2 through the interior.
        let box_size = BoxSize::cubic(10.0).unwrap();
        let periodic = PeriodicBoundaries::all();
        let delta = minimum_image([0.1 - 9.9, 0.0, 0.0], &box_size, &periodic);
        assert!(approx_equal(delta[0], 0.2));
    }

    #[test]
    fn minimum_image_leaves_non_periodic_axes_untouched() {
        let box_size = BoxSize::cubic(10.0).unwrap();
        let periodic = PeriodicBoundaries::new(false, true, true);
        let delta = minimum_image([9.0, 9.0, 0.5], &box_size, &periodic);
        assert!(approx_equal(delta[0], 9.0));
        assert!(approx_equal(delta[1], -1.0));
        assert!(approx_equal(delta[2], 0.5));
    }

    #[test]
    fn wrap_component_maps_into_primary_interval() {
        assert!(approx_equal(wrap_component(10.3, 10.0), 0.3));
        assert!(approx_equal(wrap_component(-0.4, 10.0), 9.6));
        assert!(approx_equal(wrap_component(4.2, 10.0), 4.2));
        assert!(approx_equal(wrap_component(10.0, 10.0), 0.0));
    }
}
