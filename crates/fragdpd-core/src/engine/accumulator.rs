use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free floating-point sum accumulator.
///
/// Values are accumulated in `f64` (also in the single-precision build)
/// through a compare-exchange loop on the bit pattern. `add` may be called
/// concurrently from any worker; `sum` is meaningful only after all workers
/// of the accumulation pass have joined, which is guaranteed by the
/// chunk-boundary join of the pair driver.
///
/// Summation order is scheduling-dependent, so totals are deterministic in
/// value only up to floating-point associativity. This is the documented
/// non-determinism boundary of the engine; forces never flow through adders.
#[derive(Debug, Default)]
pub struct AtomicAdder {
    bits: AtomicU64,
}

impl AtomicAdder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&self, value: f64) {
        // Relaxed suffices: the pool join publishes the final value.
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + value).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn reset(&self) {
        self.bits.store(0u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// The scalar accumulators of one evaluation pass: potential energy, the
/// pressure-tensor diagonal, and one integrator-specific extra slot.
#[derive(Debug, Default)]
pub struct AdderGroup {
    pub potential: AtomicAdder,
    pub pressure_x: AtomicAdder,
    pub pressure_y: AtomicAdder,
    pub pressure_z: AtomicAdder,
    pub extra: AtomicAdder,
}

impl AdderGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must run before each accumulation pass.
    pub fn reset(&self) {
        self.potential.reset();
        self.pressure_x.reset();
        self.pressure_y.reset();
        self.pressure_z.reset();
        self.extra.reset();
    }

    #[inline]
    pub fn add_virial(&self, x: f64, y: f64, z: f64) {
        self.pressure_x.add(x);
        self.pressure_y.add(y);
        self.pressure_z.add(z);
    }

    pub fn virial(&self) -> [f64; 3] {
        [
            self.pressure_x.sum(),
            self.pressure_y.sum(),
            self.pressure_z.sum(),
        ]
    }
}
