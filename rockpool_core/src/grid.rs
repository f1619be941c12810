//! The toroidal world grid
//!
//! A fixed row-major array of cells (`idx = y * width + x`) with wraparound
//! neighbor access on both axes. Alongside the slots the grid tracks the live
//! set and the execution leases as dense bitsets, allocates cell ids, and
//! holds the hot-swappable config and RNG policy snapshots.
//!
//! Concurrency model: many readers, one writer. Workers take snapshot clones
//! under the read lock; `reserve_random` and `apply_delta` take the write
//! lock. An index stays leased in the exec set from reservation until the
//! delta that resolves it is applied; leases are the only write-collision
//! guard the simulation needs.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::bitset::BitSet;
use crate::cell::{Cell, CellIds};
use crate::config::Config;
use crate::delta::Delta;
use crate::rng::{DefaultRng, RngPolicy};
use crate::stats;

/// Cardinal neighbor directions, ordinal-encoded for `TURN`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Left = 0,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Decode an ordinal modulo 4.
    #[inline]
    pub fn from_ordinal(v: u8) -> Direction {
        match v % 4 {
            0 => Direction::Left,
            1 => Direction::Right,
            2 => Direction::Up,
            _ => Direction::Down,
        }
    }
}

/// Cell-state filter for random reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellPredicate {
    Dead,
    Live,
    Any,
}

struct GridState {
    cells: Vec<Cell>,
    live: BitSet,
    exec: BitSet,
}

/// The world: slots, indices, id allocation and swappable policies.
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub genome_size: usize,
    pub seed: i64,

    init_pop: usize,

    config: RwLock<Config>,
    rng: RwLock<Arc<dyn RngPolicy>>,

    state: RwLock<GridState>,
    ids: CellIds,
}

impl Grid {
    /// Allocate a `width x height` world of dead cells. A seed below 1 is
    /// replaced with a time-derived one. Genome sizes below 2 are clamped:
    /// execution wraps inside `1..genome_size`, which needs at least one
    /// executable slot.
    pub fn new(
        width: usize,
        height: usize,
        genome_size: usize,
        initial_population: usize,
        seed: i64,
    ) -> Grid {
        let genome_size = genome_size.max(2);
        let seed = if seed < 1 { time_seed() } else { seed };

        let cells = (0..width * height)
            .map(|idx| Cell::new(idx, idx % width, idx / width, genome_size))
            .collect();

        Grid {
            width,
            height,
            genome_size,
            seed,
            init_pop: initial_population,
            config: RwLock::new(Config::default()),
            rng: RwLock::new(Arc::new(DefaultRng::default())),
            state: RwLock::new(GridState {
                cells,
                live: BitSet::new(width * height),
                exec: BitSet::new(width * height),
            }),
            ids: CellIds::new(),
        }
    }

    /// Seedings owed to the world before periodic inflow takes over.
    pub fn initial_population(&self) -> usize {
        self.init_pop
    }

    /// The current config snapshot.
    pub fn config(&self) -> Config {
        *read_lock(&self.config)
    }

    /// Swap the config. Readers pick the new value up on their next decision.
    pub fn set_config(&self, config: Config) {
        *write_lock(&self.config) = config;
    }

    /// The current RNG policy snapshot.
    pub fn rng(&self) -> Arc<dyn RngPolicy> {
        read_lock(&self.rng).clone()
    }

    /// Swap the RNG policy.
    pub fn set_rng(&self, rng: Arc<dyn RngPolicy>) {
        *write_lock(&self.rng) = rng;
    }

    /// The cell-id allocator.
    pub fn ids(&self) -> &CellIds {
        &self.ids
    }

    /// Draw the next cell id.
    pub fn next_cell_id(&self) -> i64 {
        self.ids.next()
    }

    /// Snapshot clone of the cell at `(x, y)`.
    pub fn get_cell(&self, x: usize, y: usize) -> Cell {
        self.get_cell_by_idx(y * self.width + x)
    }

    /// Snapshot clone of the cell at a linear index.
    pub fn get_cell_by_idx(&self, idx: usize) -> Cell {
        read_lock(&self.state).cells[idx].clone()
    }

    /// Run `f` against the full slot array under the read lock. No delta can
    /// be applied while `f` runs, so consumers get a consistent snapshot as
    /// long as all their work happens inside the closure.
    pub fn with_cells<T>(&self, f: impl FnOnce(&[Cell]) -> T) -> T {
        f(&read_lock(&self.state).cells)
    }

    /// Number of live cells right now.
    pub fn live_cell_count(&self) -> usize {
        read_lock(&self.state).live.len()
    }

    /// Atomically pick a uniform-random unleased cell matching `predicate`,
    /// lease it, and return a snapshot clone. `scratch` is caller-owned
    /// candidate storage, reused across calls.
    pub fn reserve_random<R: Rng + ?Sized>(
        &self,
        predicate: CellPredicate,
        rng: &mut R,
        scratch: &mut Vec<usize>,
    ) -> Option<Cell> {
        let mut state = write_lock(&self.state);

        scratch.clear();
        match predicate {
            CellPredicate::Live => {
                for idx in state.live.iter() {
                    if !state.exec.contains(idx) {
                        scratch.push(idx);
                    }
                }
            }
            CellPredicate::Dead => {
                for c in &state.cells {
                    if !c.live() && !state.exec.contains(c.idx) {
                        scratch.push(c.idx);
                    }
                }
            }
            CellPredicate::Any => {
                for c in &state.cells {
                    if !state.exec.contains(c.idx) {
                        scratch.push(c.idx);
                    }
                }
            }
        }

        if scratch.is_empty() {
            return None;
        }

        let idx = scratch[rng.gen_range(0..scratch.len())];
        state.exec.insert(idx);
        Some(state.cells[idx].clone())
    }

    /// Drop a lease without applying a delta. Only needed on abnormal paths
    /// where a reserved cell's delta can no longer reach the applier.
    pub fn release(&self, idx: usize) {
        write_lock(&self.state).exec.remove(idx);
    }

    /// Merge a delta: overwrite each modified slot in place, maintain the
    /// live set, release the leases, then stamp the delta with the
    /// `LiveCells` and `ViableLiveCells` gauges.
    pub fn apply_delta(&self, dt: &mut Delta) {
        let config = self.config();
        let mut state = write_lock(&self.state);

        for c in &dt.cells {
            if c.live() {
                state.live.insert(c.idx);
            } else {
                state.live.remove(c.idx);
            }
            c.overwrite(&mut state.cells[c.idx]);
            state.exec.remove(c.idx);
        }

        let mut viable = 0;
        for idx in state.live.iter() {
            if state.cells[idx].viable(&config) {
                viable += 1;
            }
        }
        dt.stats.set(stats::VIABLE_LIVE_CELLS, viable);
        dt.stats.set(stats::LIVE_CELLS, state.live.len() as i64);
    }

    /// Linear index of a cell's cardinal neighbor, wrapping toroidally.
    pub fn neighbor_idx(&self, c: &Cell, dir: Direction) -> usize {
        let (mut x, mut y) = (c.x, c.y);
        match dir {
            Direction::Left => x = if x == 0 { self.width - 1 } else { x - 1 },
            Direction::Right => x = if x == self.width - 1 { 0 } else { x + 1 },
            Direction::Up => y = if y == 0 { self.height - 1 } else { y - 1 },
            Direction::Down => y = if y == self.height - 1 { 0 } else { y + 1 },
        }
        y * self.width + x
    }
}

fn time_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(1, |d| d.as_nanos() as i64)
        .max(1)
}

// Lock poisoning cannot leave the grid in a torn state: every writer either
// finishes its loop or the process is already unwinding. Recover the guard.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
