//! Per-worker execution context
//!
//! Bundles the state one worker reuses across events: its RNG stream, its VM
//! and the candidate buffer for random reservation. Every worker derives its
//! stream from the world seed.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::delta::Delta;
use crate::grid::{CellPredicate, Grid};
use crate::vm::Vm;

pub struct Context {
    pub rng: StdRng,
    vm: Vm,
    scratch: Vec<usize>,
}

impl Context {
    pub fn new(grid: &Grid) -> Context {
        Context {
            rng: StdRng::seed_from_u64(grid.seed as u64),
            vm: Vm::new(grid.genome_size),
            scratch: Vec::with_capacity(grid.width * grid.height),
        }
    }

    /// Handle one inflow event: reserve a slot under the configured seeding
    /// predicate and pour energy and a fresh random genome into it. Returns
    /// `None` when every matching slot is leased.
    pub fn seed(&mut self, grid: &Grid) -> Option<Delta> {
        let predicate = if grid.config().seed_live_cells {
            CellPredicate::Any
        } else {
            CellPredicate::Dead
        };

        let mut cell = grid.reserve_random(predicate, &mut self.rng, &mut self.scratch)?;
        cell.seed(&*grid.rng(), grid.ids(), &mut self.rng);
        Some(Delta::for_cell(cell))
    }

    /// Handle one exec event: reserve a random live cell and run its genome.
    /// Returns `None` when no unleased live cell exists.
    pub fn exec(&mut self, grid: &Grid) -> Option<Delta> {
        let cell = grid.reserve_random(CellPredicate::Live, &mut self.rng, &mut self.scratch)?;
        Some(self.vm.exec(cell, grid, &mut self.rng))
    }
}
