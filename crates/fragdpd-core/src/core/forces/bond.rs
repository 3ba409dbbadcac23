use crate::Real;
use crate::core::models::bonds::BondBehavior;

#[inline]
fn is_active(deviation: Real, behavior: BondBehavior) -> bool {
    match behavior {
        BondBehavior::Always => true,
        BondBehavior::StretchedOnly => deviation > 0.0,
        BondBehavior::CompressedOnly => deviation < 0.0,
    }
}

/// Harmonic bond force magnitude -k·(r - r_0) along r̂, gated by behavior.
///
/// Positive values push the bonded particles apart.
#[inline]
pub fn bond_force(force_constant: Real, dist: Real, length: Real, behavior: BondBehavior) -> Real {
    let deviation = dist - length;
    if is_active(deviation, behavior) {
        -force_constant * deviation
    } else {
        0.0
    }
}

/// Harmonic bond potential ½·k·(r - r_0)², gated by behavior.
#[inline]
pub fn bond_potential(
    force_constant: Real,
    dist: Real,
    length: Real,
    behavior: BondBehavior,
) -> Real {
    let deviation = dist - length;
    if is_active(deviation, behavior) {
        0.5 * force_constant * deviation * deviation
    } else {
        0.0
    }
}
