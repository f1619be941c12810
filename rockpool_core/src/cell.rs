//! Per-slot cell state
//!
//! Every grid slot holds exactly one `Cell` for the life of the simulation;
//! the logical lifecycle (dead, alive, dead again) is expressed through
//! `energy`, `id` and `generation`. A dead cell has no identity: energy 0,
//! id 0, generation 0.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::{Rng, RngCore};

use crate::config::Config;
use crate::gene::{Gene, Genome};
use crate::rng::RngPolicy;

/// Monotonic cell-id allocator. Ids start at 1 and strictly increase; 0 marks
/// a dead cell.
#[derive(Debug)]
pub struct CellIds(AtomicI64);

impl CellIds {
    pub fn new() -> CellIds {
        CellIds(AtomicI64::new(1))
    }

    /// Draw the next id.
    #[inline]
    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for CellIds {
    fn default() -> CellIds {
        CellIds::new()
    }
}

/// One grid slot: identity, lineage, energy, position and genome.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub idx: usize,
    pub id: i64,
    pub origin: i64,
    pub parent: i64,
    pub generation: i64,
    pub energy: i64,
    pub x: usize,
    pub y: usize,
    pub genome: Genome,
}

impl Cell {
    /// A dead cell at a fixed position with an all-`Stop` genome.
    pub fn new(idx: usize, x: usize, y: usize, genome_size: usize) -> Cell {
        Cell {
            idx,
            id: 0,
            origin: 0,
            parent: 0,
            generation: 0,
            energy: 0,
            x,
            y,
            genome: Genome::new(genome_size),
        }
    }

    #[inline]
    pub fn live(&self) -> bool {
        self.energy > 0
    }

    #[inline]
    pub fn viable(&self, config: &Config) -> bool {
        self.generation >= config.viable_cell_generation
    }

    /// The identity gene consulted by the accessibility check.
    #[inline]
    pub fn logo(&self) -> Gene {
        self.genome[0]
    }

    pub fn reset_genome(&mut self) {
        self.genome.reset();
    }

    pub fn randomize_genome<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.genome.randomize(rng);
    }

    /// Assign a fresh id when live, 0 when dead. `origin` follows the id.
    pub fn reset_id(&mut self, ids: &CellIds) {
        self.id = if self.live() { ids.next() } else { 0 };
        self.origin = self.id;
    }

    /// Clear lineage and re-key identity.
    pub fn reset_metadata(&mut self, ids: &CellIds) {
        self.reset_id(ids);
        self.parent = 0;
        self.generation = 0;
    }

    /// The inflow seeding routine: add energy, re-key identity, randomize the
    /// genome. Energy is added first so a previously dead slot comes alive
    /// and draws a real id.
    pub fn seed(&mut self, policy: &dyn RngPolicy, ids: &CellIds, rng: &mut dyn RngCore) {
        self.energy += policy.energy(rng);
        self.reset_metadata(ids);
        self.randomize_genome(rng);
    }

    /// Overwrite another slot's state in place, reusing its genome storage.
    /// Position fields are not touched.
    pub fn overwrite(&self, target: &mut Cell) {
        target.id = self.id;
        target.origin = self.origin;
        target.parent = self.parent;
        target.generation = self.generation;
        target.energy = self.energy;
        target.genome.copy_from(&self.genome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DefaultRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_new_cell_is_dead() {
        let c = Cell::new(5, 1, 1, 8);
        assert!(!c.live());
        assert_eq!(c.id, 0);
        assert_eq!(c.generation, 0);
        assert_eq!(c.genome.len(), 8);
        assert_eq!(c.logo(), Gene::Stop);
    }

    #[test]
    fn test_cell_ids_strictly_increase() {
        let ids = CellIds::new();
        let drawn: Vec<i64> = (0..100).map(|_| ids.next()).collect();
        assert_eq!(drawn[0], 1);
        assert!(drawn.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_reset_id_dead_cell_loses_identity() {
        let ids = CellIds::new();
        let mut c = Cell::new(0, 0, 0, 8);
        c.energy = 10;
        c.reset_metadata(&ids);
        assert_eq!(c.id, 1);
        assert_eq!(c.origin, 1);

        c.energy = 0;
        c.reset_metadata(&ids);
        assert_eq!(c.id, 0);
        assert_eq!(c.origin, 0);
        assert_eq!(c.generation, 0);
    }

    #[test]
    fn test_seed_brings_cell_alive() {
        let ids = CellIds::new();
        let policy = DefaultRng::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut c = Cell::new(0, 0, 0, 16);

        c.seed(&policy, &ids, &mut rng);

        assert!(c.energy >= 600 && c.energy < 1600);
        assert_eq!(c.id, 1);
        assert_eq!(c.origin, 1);
        assert_eq!(c.parent, 0);
        assert_eq!(c.generation, 0);
        assert_eq!(c.genome.len(), 16);
    }

    #[test]
    fn test_overwrite_then_clone_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut a = Cell::new(3, 3, 0, 8);
        a.energy = 42;
        a.id = 7;
        a.origin = 7;
        a.generation = 2;
        a.randomize_genome(&mut rng);

        let mut slot = Cell::new(3, 3, 0, 8);
        a.overwrite(&mut slot);
        assert_eq!(a, slot);

        let copy = slot.clone();
        copy.overwrite(&mut slot);
        assert_eq!(copy, slot);
    }

    #[test]
    fn test_viable_tracks_config_threshold() {
        let config = Config::default();
        let mut c = Cell::new(0, 0, 0, 4);
        assert!(!c.viable(&config));
        c.generation = config.viable_cell_generation;
        assert!(c.viable(&config));
    }
}
