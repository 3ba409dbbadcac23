use super::error::EngineError;
use crate::Real;
use crate::core::geometry::{BoxSize, PeriodicBoundaries};
use itertools::iproduct;
use std::collections::BTreeSet;
use tracing::debug;

/// List-terminator sentinel of the head/next linked lists.
pub const NO_PARTICLE: u32 = u32::MAX;

/// The 13 forward neighbor offsets: together with the identity offset they
/// cover every unordered cell pair exactly once (an offset is "forward" when
/// its first non-zero component, scanned z, y, x, is positive).
const FORWARD_OFFSETS: [[isize; 3]; 13] = [
    [1, 0, 0],
    [-1, 1, 0],
    [0, 1, 0],
    [1, 1, 0],
    [-1, -1, 1],
    [0, -1, 1],
    [1, -1, 1],
    [-1, 0, 1],
    [0, 0, 1],
    [1, 0, 1],
    [-1, 1, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// One unordered pair of neighboring cells. `a == b` for the self pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPair {
    pub a: usize,
    pub b: usize,
}

/// Static spatial partition of the box: cell counts, the deduplicated
/// neighbor cell-pair list, and its partition into race-free safe chunks.
///
/// Built once per run; the box and the cutoff never change mid-simulation.
#[derive(Debug, Clone)]
pub struct CellGrid {
    box_size: BoxSize,
    periodic: PeriodicBoundaries,
    counts: [usize; 3],
    inv_cell_lengths: [Real; 3],
    pairs: Vec<CellPair>,
    chunks: Vec<Vec<usize>>,
}

impl CellGrid {
    /// Builds the grid for the given cutoff. Cell edges are at least the
    /// cutoff long. Fails if the cutoff exceeds half the box length on a
    /// periodic axis, where the minimum image would be ambiguous.
    pub fn new(
        box_size: BoxSize,
        periodic: PeriodicBoundaries,
        cutoff: Real,
    ) -> Result<Self, EngineError> {
        for axis in 0..3 {
            if periodic.is_periodic(axis) && cutoff > box_size.half_length(axis) {
                return Err(EngineError::CutoffExceedsHalfBox {
                    axis,
                    cutoff,
                    half_length: box_size.half_length(axis),
                });
            }
        }

        let mut counts = [0usize; 3];
        let mut inv_cell_lengths = [0.0; 3];
        for axis in 0..3 {
            counts[axis] = ((box_size.length(axis) / cutoff).floor() as usize).max(1);
            inv_cell_lengths[axis] = counts[axis] as Real / box_size.length(axis);
        }

        let pairs = build_pairs(counts, periodic);
        let chunks = build_chunks(&pairs, counts[0] * counts[1] * counts[2]);
        debug!(
            cells = counts[0] * counts[1] * counts[2],
            pairs = pairs.len(),
            chunks = chunks.len(),
            "Built cell grid"
        );

        Ok(Self {
            box_size,
            periodic,
            counts,
            inv_cell_lengths,
            pairs,
            chunks,
        })
    }

    #[inline]
    pub fn box_size(&self) -> &BoxSize {
        &self.box_size
    }

    #[inline]
    pub fn periodic(&self) -> &PeriodicBoundaries {
        &self.periodic
    }

    #[inline]
    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    /// All unordered neighbor cell pairs, including each cell's self pair.
    /// A pair's index in this slice is its serial, used to derive its
    /// random-number stream.
    #[inline]
    pub fn pairs(&self) -> &[CellPair] {
        &self.pairs
    }

    /// The safe-chunk partition: each inner vector holds indices into
    /// [`Self::pairs`], and within one chunk no cell index appears twice.
    #[inline]
    pub fn chunks(&self) -> &[Vec<usize>] {
        &self.chunks
    }

    /// Cell containing the given (in-box) position.
    #[inline]
    pub fn cell_of_position(&self, x: Real, y: Real, z: Real) -> usize {
        let index = |coord: Real, axis: usize| -> usize {
            // Clamp against the upper edge: a coordinate exactly at the box
            // length would otherwise map one cell past the end.
            ((coord * self.inv_cell_lengths[axis]) as usize).min(self.counts[axis] - 1)
        };
        index(x, 0) + self.counts[0] * (index(y, 1) + self.counts[1] * index(z, 2))
    }
}

fn build_pairs(counts: [usize; 3], periodic: PeriodicBoundaries) -> Vec<CellPair> {
    let cell_index =
        |ix: usize, iy: usize, iz: usize| ix + counts[0] * (iy + counts[1] * iz);

    // A BTreeSet both deduplicates pairs that coincide after periodic wrap
    // (possible when an axis has fewer than three cells) and fixes a
    // deterministic serial order.
    let mut set: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (iz, iy, ix) in iproduct!(0..counts[2], 0..counts[1], 0..counts[0]) {
        let cell = cell_index(ix, iy, iz);
        set.insert((cell, cell));

        'offsets: for offset in FORWARD_OFFSETS {
            let raw = [ix as isize + offset[0], iy as isize + offset[1], iz as isize + offset[2]];
            let mut wrapped = [0usize; 3];
            for axis in 0..3 {
                let extent = counts[axis] as isize;
                wrapped[axis] = if raw[axis] < 0 || raw[axis] >= extent {
                    if !periodic.is_periodic(axis) {
                        continue 'offsets;
                    }
                    raw[axis].rem_euclid(extent) as usize
                } else {
                    raw[axis] as usize
                };
            }
            let neighbor = cell_index(wrapped[0], wrapped[1], wrapped[2]);
            if neighbor != cell {
                set.insert((cell.min(neighbor), cell.max(neighbor)));
            }
        }
    }

    set.into_iter().map(|(a, b)| CellPair { a, b }).collect()
}

fn build_chunks(pairs: &[CellPair], cell_count: usize) -> Vec<Vec<usize>> {
    // Greedy independent-set coloring: each pair lands in the first chunk
    // where neither of its cells is used yet.
    let mut chunks: Vec<Vec<usize>> = Vec::new();
    let mut used: Vec<Vec<bool>> = Vec::new();
    for (serial, pair) in pairs.iter().enumerate() {
        let slot = (0..chunks.len())
            .find(|&c| !used[c][pair.a] && !used[c][pair.b])
            .unwrap_or_else(|| {
                chunks.push(Vec::new());
                used.push(vec![false; cell_count]);
                chunks.len() - 1
            });
        chunks[slot].push(serial);
        used[slot][pair.a] = true;
        used[slot][pair.b] = true;
    }
    chunks
}

/// Head/next singly linked lists assigning particles to cells.
///
/// Rebuilt in O(N) before every force-evaluation pass, since positions move
/// every step. In subset mode only the given particle indices (the charged
/// compaction) are threaded into the lists.
#[derive(Debug, Clone)]
pub struct CellAssignment {
    head: Vec<u32>,
    next: Vec<u32>,
    particles: Vec<u32>,
}

impl CellAssignment {
    pub fn new(grid: &CellGrid) -> Self {
        Self {
            head: vec![NO_PARTICLE; grid.cell_count()],
            next: Vec::new(),
            particles: Vec::new(),
        }
    }

    /// Recomputes the lists from current positions, which must already be
    /// wrapped into the box on periodic axes. Out-of-box positions on
    /// non-periodic axes are a boundary-enforcement bug elsewhere and are
    /// not checked here.
    pub fn rebuild(
        &mut self,
        grid: &CellGrid,
        x: &[Real],
        y: &[Real],
        z: &[Real],
        subset: Option<&[usize]>,
    ) {
        self.head.fill(NO_PARTICLE);
        let slot_count = subset.map_or(x.len(), <[usize]>::len);
        self.next.clear();
        self.next.resize(slot_count, NO_PARTICLE);
        self.particles.clear();

        for slot in 0..slot_count {
            let particle = subset.map_or(slot, |indices| indices[slot]);
            self.particles.push(particle as u32);
            let cell = grid.cell_of_position(x[particle], y[particle], z[particle]);
            self.next[slot] = self.head[cell];
            self.head[cell] = slot as u32;
        }
    }

    #[inline]
    pub fn head(&self, cell: usize) -> u32 {
        self.head[cell]
    }

    #[inline]
    pub fn next(&self, slot: u32) -> u32 {
        self.next[slot as usize]
    }

    /// Global particle index stored in the given list slot.
    #[inline]
    pub fn particle(&self, slot: u32) -> usize {
        self.particles[slot as usize] as usize
    }
}
