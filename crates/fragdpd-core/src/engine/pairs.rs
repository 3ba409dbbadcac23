use super::accumulator::AdderGroup;
use super::cells::{CellAssignment, CellGrid, CellPair, NO_PARTICLE};
use super::error::EngineError;
use super::random::{NoiseStream, RandomSource};
use crate::Real;
use crate::core::geometry::minimum_image;
use std::marker::PhantomData;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Worker pool handle used by the chunk dispatch. `None` processes pairs on
/// the calling thread.
#[cfg(feature = "parallel")]
pub type WorkerPool = rayon::ThreadPool;
#[cfg(not(feature = "parallel"))]
pub type WorkerPool = ();

/// Shared mutable view of the force arrays.
///
/// Workers of one chunk write through raw pointers without synchronization.
/// This is sound only because of the safe-chunk invariant: concurrent
/// workers own disjoint cell sets, hence disjoint particle indices, hence
/// disjoint force-array slots, and chunks are separated by a join.
pub struct SharedForces<'a> {
    fx: *mut Real,
    fy: *mut Real,
    fz: *mut Real,
    len: usize,
    _marker: PhantomData<&'a mut [Real]>,
}

unsafe impl Send for SharedForces<'_> {}
unsafe impl Sync for SharedForces<'_> {}

impl<'a> SharedForces<'a> {
    pub fn new(fx: &'a mut [Real], fy: &'a mut [Real], fz: &'a mut [Real]) -> Self {
        let len = fx.len();
        debug_assert!(fy.len() == len && fz.len() == len);
        Self {
            fx: fx.as_mut_ptr(),
            fy: fy.as_mut_ptr(),
            fz: fz.as_mut_ptr(),
            len,
            _marker: PhantomData,
        }
    }

    /// Adds into the force slot of particle `i`.
    ///
    /// # Safety
    ///
    /// No concurrent call may target the same particle index. The pair
    /// driver guarantees this through the safe-chunk partition.
    #[inline]
    pub unsafe fn add(&self, i: usize, fx: Real, fy: Real, fz: Real) {
        debug_assert!(i < self.len);
        unsafe {
            *self.fx.add(i) += fx;
            *self.fy.add(i) += fy;
            *self.fz.add(i) += fz;
        }
    }
}

/// Worker-owned scratch handed to every kernel invocation: the pair's noise
/// stream, the shared adder group, and the force view.
pub struct PairScratch<'a> {
    pub rng: NoiseStream,
    pub adders: &'a AdderGroup,
    pub forces: &'a SharedForces<'a>,
}

/// A per-physical-kind pair interaction.
///
/// One neighbor-iteration driver serves every interaction kind; kernels
/// implement only the per-pair contribution. `delta` is the minimum-image
/// displacement from j to i and `dist` its length, already below the
/// kernel's cutoff.
pub trait PairKernel: Sync {
    fn cutoff(&self) -> Real;

    fn interact(
        &self,
        scratch: &mut PairScratch<'_>,
        i: usize,
        j: usize,
        delta: [Real; 3],
        dist: Real,
    ) -> Result<(), EngineError>;
}

/// One recorded in-cutoff particle pair.
#[derive(Debug, Clone, Copy)]
pub struct CachedPair {
    pub i: u32,
    pub j: u32,
    pub delta: [Real; 3],
    pub dist: Real,
}

/// Pair geometry recorded during a cell-based pass, one bucket per cell-pair
/// serial.
///
/// Slot-indexed storage keeps the replay deterministic: each worker fills
/// and later replays exactly the buckets of its own cell pairs, so neither
/// recording nor replay order depends on scheduling.
#[derive(Debug, Default)]
pub struct PairCache {
    slots: Vec<Vec<CachedPair>>,
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, slot_count: usize) {
        self.slots.resize_with(slot_count, Vec::new);
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    pub fn pair_count(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }
}

/// Raw-pointer view of the cache buckets for concurrent filling.
struct SlotWriter {
    slots: *mut Vec<CachedPair>,
    len: usize,
}

unsafe impl Send for SlotWriter {}
unsafe impl Sync for SlotWriter {}

impl SlotWriter {
    /// # Safety
    ///
    /// No concurrent call may target the same serial; the driver hands each
    /// cell-pair serial to exactly one worker per chunk.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slot(&self, serial: usize) -> &mut Vec<CachedPair> {
        debug_assert!(serial < self.len);
        unsafe { &mut *self.slots.add(serial) }
    }
}

/// How a calculation pass traverses pairs.
pub enum CalculationMode<'a> {
    /// Walk the cell grid chunk by chunk, cell pairs within a chunk in
    /// parallel, optionally recording pair geometry.
    CellBasedParallel { fill_cache: Option<&'a mut PairCache> },
    /// Replay a previously recorded cache without rediscovering geometry.
    CachedPairs { cache: &'a PairCache },
}

/// Borrowed inputs of one evaluation pass.
pub struct PairPass<'a> {
    pub grid: &'a CellGrid,
    pub assignment: &'a CellAssignment,
    pub x: &'a [Real],
    pub y: &'a [Real],
    pub z: &'a [Real],
    pub adders: &'a AdderGroup,
    pub random: &'a RandomSource,
    pub pass_index: u64,
}

#[cfg(feature = "parallel")]
fn run_chunk<F>(pool: Option<&WorkerPool>, serials: &[usize], task: F) -> Result<(), EngineError>
where
    F: Fn(usize) -> Result<(), EngineError> + Sync,
{
    match pool {
        Some(pool) => pool.install(|| serials.par_iter().copied().try_for_each(&task)),
        None => serials.iter().copied().try_for_each(task),
    }
}

#[cfg(not(feature = "parallel"))]
fn run_chunk<F>(_pool: Option<&WorkerPool>, serials: &[usize], task: F) -> Result<(), EngineError>
where
    F: Fn(usize) -> Result<(), EngineError> + Sync,
{
    serials.iter().copied().try_for_each(task)
}

/// Runs one full accumulation pass of `kernel` over all particle pairs.
///
/// Chunks are processed strictly in order with a join in between; the next
/// chunk may touch cells whose particles the current chunk modified.
pub fn calculate<K: PairKernel>(
    pass: &PairPass<'_>,
    kernel: &K,
    forces: &SharedForces<'_>,
    pool: Option<&WorkerPool>,
    mode: CalculationMode<'_>,
) -> Result<(), EngineError> {
    match mode {
        CalculationMode::CellBasedParallel { fill_cache } => {
            let writer = fill_cache.map(|cache| {
                cache.prepare(pass.grid.pairs().len());
                SlotWriter {
                    slots: cache.slots.as_mut_ptr(),
                    len: cache.slots.len(),
                }
            });
            let cutoff_sq = kernel.cutoff() * kernel.cutoff();

            for chunk in pass.grid.chunks() {
                run_chunk(pool, chunk, |serial| {
                    let pair = pass.grid.pairs()[serial];
                    let mut scratch = PairScratch {
                        rng: pass.random.pair_stream(pass.pass_index, serial as u64),
                        adders: pass.adders,
                        forces,
                    };
                    // One worker owns this serial for the whole chunk.
                    let bucket = writer.as_ref().map(|w| unsafe { w.slot(serial) });
                    process_cell_pair(pass, kernel, &mut scratch, bucket, pair, cutoff_sq)
                })?;
            }
            Ok(())
        }
        CalculationMode::CachedPairs { cache } => {
            for chunk in pass.grid.chunks() {
                run_chunk(pool, chunk, |serial| {
                    let mut scratch = PairScratch {
                        rng: pass.random.pair_stream(pass.pass_index, serial as u64),
                        adders: pass.adders,
                        forces,
                    };
                    for entry in &cache.slots[serial] {
                        kernel.interact(
                            &mut scratch,
                            entry.i as usize,
                            entry.j as usize,
                            entry.delta,
                            entry.dist,
                        )?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        }
    }
}

fn process_cell_pair<K: PairKernel>(
    pass: &PairPass<'_>,
    kernel: &K,
    scratch: &mut PairScratch<'_>,
    mut bucket: Option<&mut Vec<CachedPair>>,
    pair: CellPair,
    cutoff_sq: Real,
) -> Result<(), EngineError> {
    let assignment = pass.assignment;
    let box_size = pass.grid.box_size();
    let periodic = pass.grid.periodic();

    let mut slot_a = assignment.head(pair.a);
    while slot_a != NO_PARTICLE {
        let i = assignment.particle(slot_a);
        // Within one cell, j > i in list order avoids double counting.
        let mut slot_b = if pair.a == pair.b {
            assignment.next(slot_a)
        } else {
            assignment.head(pair.b)
        };
        while slot_b != NO_PARTICLE {
            let j = assignment.particle(slot_b);
            let delta = minimum_image(
                [
                    pass.x[i] - pass.x[j],
                    pass.y[i] - pass.y[j],
                    pass.z[i] - pass.z[j],
                ],
                box_size,
                periodic,
            );
            let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
            if dist_sq < cutoff_sq {
                let dist = dist_sq.sqrt();
                kernel.interact(scratch, i, j, delta, dist)?;
                if let Some(bucket) = bucket.as_deref_mut() {
                    bucket.push(CachedPair {
                        i: i as u32,
                        j: j as u32,
                        delta,
                        dist,
                    });
                }
            }
            slot_b = assignment.next(slot_b);
        }
        slot_a = assignment.next(slot_a);
    }
    Ok(())
}
