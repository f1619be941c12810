//! The genome virtual machine
//!
//! One VM per worker, reused across executions. A run drives a single cell:
//! every loop iteration fetches the next gene (possibly mutated for this
//! fetch only), burns one energy, and dispatches. `Kill` and `Share` touch
//! the neighbor the VM is facing; when the run terminates with a non-`Stop`
//! gene at buffer index 0, the buffer is birthed into the facing neighbor.
//!
//! All cells touched during a run live in a small local cache so repeated
//! access to the same slot observes earlier mutations. The modified entries
//! of that cache are the run's delta.

use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::cell::Cell;
use crate::delta::Delta;
use crate::gene::{Gene, Genome};
use crate::grid::{Direction, Grid};
use crate::rng::RngPolicy;
use crate::stats::{
    Stats, CELLS_KILLED, CELLS_SHARED, LIVE_CELLS_KILLED, LIVE_CELLS_SHARED, MAX_GENERATION,
    MUTATIONS, NATURAL_DEATHS, REPRODUCTIONS, REPRODUCTION_ATTEMPTS, VIABLE_CELLS_KILLED,
    VIABLE_CELLS_SHARED, VIABLE_CELL_NATURAL_DEATHS,
};

/// Execution starts here and wraps back here, never revisiting the logo.
const GENOME_START_IDX: usize = 1;

/// The driving cell is always the first cache entry.
const DRIVER: usize = 0;

enum Signal {
    Noop,
    Break,
    Continue,
}

/// Reusable per-worker execution state.
pub struct Vm {
    genome_size: usize,

    genome_idx: usize,
    pointer: usize,
    register: Gene,
    direction: Direction,
    buffer: Genome,

    loop_stack: Vec<usize>,
    loop_depth: usize,

    cache: CellCache,
}

impl Vm {
    pub fn new(genome_size: usize) -> Vm {
        let genome_size = genome_size.max(2);
        let mut vm = Vm {
            genome_size,
            genome_idx: GENOME_START_IDX,
            pointer: 0,
            register: Gene::Zero,
            direction: Direction::Left,
            buffer: Genome::new(genome_size),
            loop_stack: Vec::with_capacity(genome_size),
            loop_depth: 0,
            cache: CellCache::new(),
        };
        vm.reset();
        vm
    }

    fn reset(&mut self) {
        self.genome_idx = GENOME_START_IDX;
        self.pointer = 0;
        self.register = Gene::Zero;
        self.direction = Direction::Left;
        self.buffer.reset();
        self.loop_stack.clear();
        self.loop_depth = 0;
    }

    #[inline]
    fn advance(&mut self) {
        self.genome_idx = if self.genome_idx == self.genome_size - 1 {
            GENOME_START_IDX
        } else {
            self.genome_idx + 1
        };
    }

    /// Execute one cell to termination and return the resulting delta. The
    /// driver is an owned snapshot; the grid is only read for neighbor
    /// snapshots and policy state.
    pub fn exec(&mut self, driver: Cell, grid: &Grid, rng: &mut dyn RngCore) -> Delta {
        self.reset();
        self.cache.begin(driver);
        let mut stats = Stats::new();

        while self.cache.cells[DRIVER].energy > 0 {
            let mut g = self.cache.cells[DRIVER].genome[self.genome_idx];

            let policy: Arc<dyn RngPolicy> = grid.rng();
            if policy.mutate(rng) {
                let mutation = Gene::random(rng);
                if rng.gen::<bool>() {
                    g = mutation;
                } else {
                    self.register = mutation;
                }
                stats.inc(MUTATIONS, 1);
            }

            self.cache.cells[DRIVER].energy -= 1;

            if self.loop_depth > 0 {
                match g {
                    Gene::Loop => self.loop_depth += 1,
                    Gene::Rep => {
                        self.loop_depth -= 1;
                        continue;
                    }
                    _ => {}
                }
            } else {
                match self.exec_gene(g, grid, rng, &mut stats) {
                    Signal::Break => break,
                    Signal::Continue => continue,
                    Signal::Noop => {}
                }
            }

            self.advance();
        }

        self.finish_reproduction(grid, rng, &mut stats);

        if self.cache.cells[DRIVER].energy == 0 {
            let config = grid.config();
            let driver = &mut self.cache.cells[DRIVER];
            stats.inc(NATURAL_DEATHS, 1);
            if driver.generation >= config.viable_cell_generation {
                stats.inc(VIABLE_CELL_NATURAL_DEATHS, 1);
            }
            // A dead cell has no identity.
            driver.reset_metadata(grid.ids());
        }

        self.cache.take(stats)
    }

    fn exec_gene(
        &mut self,
        g: Gene,
        grid: &Grid,
        rng: &mut dyn RngCore,
        stats: &mut Stats,
    ) -> Signal {
        match g {
            Gene::Zero => {
                self.pointer = 0;
                self.register = Gene::Zero;
                self.direction = Direction::Left;
            }
            Gene::Fwd => {
                self.pointer = if self.pointer == self.genome_size - 1 {
                    0
                } else {
                    self.pointer + 1
                };
            }
            Gene::Back => {
                self.pointer = if self.pointer == 0 {
                    self.genome_size - 1
                } else {
                    self.pointer - 1
                };
            }
            Gene::Inc => self.register = self.register.succ(),
            Gene::Dec => self.register = self.register.pred(),
            Gene::ReadG => self.register = self.cache.cells[DRIVER].genome[self.pointer],
            Gene::WriteG => {
                let reg = self.register;
                self.cache.cells[DRIVER].genome[self.pointer] = reg;
            }
            Gene::ReadB => self.register = self.buffer[self.pointer],
            Gene::WriteB => self.buffer[self.pointer] = self.register,
            Gene::Loop => {
                if self.register == Gene::Zero {
                    self.loop_depth = 1;
                } else if self.loop_stack.len() > self.genome_size - 1 {
                    return Signal::Break;
                } else {
                    self.loop_stack.push(self.genome_idx);
                }
            }
            Gene::Rep => {
                if let Some(top) = self.loop_stack.pop() {
                    if self.register != Gene::Zero {
                        self.genome_idx = top;
                        return Signal::Continue;
                    }
                }
            }
            Gene::Turn => self.direction = Direction::from_ordinal(self.register.ordinal()),
            Gene::Xchg => {
                self.advance();
                let reg = self.register;
                let driver = &mut self.cache.cells[DRIVER];
                self.register = driver.genome[self.genome_idx];
                driver.genome[self.genome_idx] = reg;
            }
            Gene::Kill => self.exec_kill(grid, rng, stats),
            Gene::Share => self.exec_share(grid, rng, stats),
            Gene::Stop => return Signal::Break,
        }

        Signal::Noop
    }

    fn exec_kill(&mut self, grid: &Grid, rng: &mut dyn RngCore, stats: &mut Stats) {
        let config = grid.config();
        let idx = grid.neighbor_idx(&self.cache.cells[DRIVER], self.direction);
        let pos = self.cache.fetch(grid, idx);

        let policy: Arc<dyn RngPolicy> = grid.rng();
        let accessible =
            policy.cell_accessible(rng, &self.cache.cells[pos], self.register, Gene::Kill);

        if accessible {
            let target = &mut self.cache.cells[pos];
            let was_viable = target.generation >= config.viable_cell_generation;
            let was_live = target.live();

            target.reset_metadata(grid.ids());
            target.reset_genome();
            self.cache.mark(pos);

            stats.inc(CELLS_KILLED, 1);
            if was_viable {
                stats.inc(VIABLE_CELLS_KILLED, 1);
            }
            if was_live {
                stats.inc(LIVE_CELLS_KILLED, 1);
            }
        } else if self.cache.cells[pos].generation >= config.viable_cell_generation {
            // Failing to harm an established cell costs the aggressor.
            let driver = &mut self.cache.cells[DRIVER];
            driver.energy -= driver.energy / config.failed_kill_penalty;
        }
    }

    fn exec_share(&mut self, grid: &Grid, rng: &mut dyn RngCore, stats: &mut Stats) {
        let config = grid.config();
        let idx = grid.neighbor_idx(&self.cache.cells[DRIVER], self.direction);
        let pos = self.cache.fetch(grid, idx);

        let policy: Arc<dyn RngPolicy> = grid.rng();
        if !policy.cell_accessible(rng, &self.cache.cells[pos], self.register, Gene::Share) {
            return;
        }

        let was_viable = self.cache.cells[pos].generation >= config.viable_cell_generation;
        let was_live = self.cache.cells[pos].live();

        // The target gets the floor half; the driver keeps the remainder.
        let total = self.cache.cells[DRIVER].energy + self.cache.cells[pos].energy;
        self.cache.cells[pos].energy = total / 2;
        let given = self.cache.cells[pos].energy;
        self.cache.cells[DRIVER].energy = total - given;

        if self.cache.cells[pos].id == 0 {
            // A dead cell just came alive; it needs an identity.
            self.cache.cells[pos].reset_id(grid.ids());
        }
        self.cache.mark(pos);

        stats.inc(CELLS_SHARED, 1);
        if was_viable {
            stats.inc(VIABLE_CELLS_SHARED, 1);
        }
        if was_live {
            stats.inc(LIVE_CELLS_SHARED, 1);
        }
    }

    fn finish_reproduction(&mut self, grid: &Grid, rng: &mut dyn RngCore, stats: &mut Stats) {
        if self.buffer[0] == Gene::Stop {
            return;
        }
        stats.inc(REPRODUCTION_ATTEMPTS, 1);

        let idx = grid.neighbor_idx(&self.cache.cells[DRIVER], self.direction);
        let pos = self.cache.fetch(grid, idx);

        // Offspring only ever replace live cells.
        let policy: Arc<dyn RngPolicy> = grid.rng();
        let target = &self.cache.cells[pos];
        if target.energy == 0 || !policy.cell_accessible(rng, target, self.register, Gene::Stop) {
            return;
        }

        let id = grid.next_cell_id();
        let (parent, origin, generation) = {
            let d = &self.cache.cells[DRIVER];
            (d.id, d.origin, d.generation)
        };

        let child = &mut self.cache.cells[pos];
        child.id = id;
        child.parent = parent;
        child.origin = origin;
        child.generation = generation + 1;
        child.genome.copy_from(&self.buffer);
        self.cache.mark(pos);

        stats.inc(REPRODUCTIONS, 1);
        stats.update(MAX_GENERATION, generation + 1);
    }
}

/// Cells touched during one run: the driver plus at most its four neighbors.
/// Keyed by grid index so repeated access observes earlier mutations.
struct CellCache {
    cells: Vec<Cell>,
    modified: Vec<bool>,
}

impl CellCache {
    fn new() -> CellCache {
        CellCache {
            cells: Vec::with_capacity(5),
            modified: Vec::with_capacity(5),
        }
    }

    fn begin(&mut self, driver: Cell) {
        self.cells.clear();
        self.modified.clear();
        self.cells.push(driver);
        self.modified.push(true);
    }

    /// Position of the cell at `idx`, snapshotting it from the grid on first
    /// touch.
    fn fetch(&mut self, grid: &Grid, idx: usize) -> usize {
        if let Some(pos) = self.cells.iter().position(|c| c.idx == idx) {
            return pos;
        }
        self.cells.push(grid.get_cell_by_idx(idx));
        self.modified.push(false);
        self.cells.len() - 1
    }

    fn mark(&mut self, pos: usize) {
        self.modified[pos] = true;
    }

    /// Drain the modified entries into a delta.
    fn take(&mut self, stats: Stats) -> Delta {
        let mut dt = Delta::new();
        dt.stats = stats;
        for (cell, modified) in self.cells.drain(..).zip(self.modified.drain(..)) {
            if modified {
                dt.cells.push(cell);
            }
        }
        dt
    }
}
