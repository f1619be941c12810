//! Replaceable randomness policy
//!
//! Three decisions are delegated to a swappable policy: whether a fetched
//! gene mutates, how much energy an inflow carries, and whether a neighbor is
//! accessible to a KILL, SHARE or reproduction. Accessibility scales with the
//! genetic distance between the target's logo gene and the acting cell's
//! register: distance helps destructive and reproductive access, and hurts
//! cooperative sharing.

use rand::{Rng, RngCore};

use crate::cell::Cell;
use crate::gene::{Gene, GENE_COUNT};

/// Popcount of `a ^ b` for each opcode-XOR-opcode value.
pub const BITS_PER_GENE: [i64; GENE_COUNT] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

/// The pluggable randomness policy. Implementations must be pure functions of
/// the supplied RNG stream so identical draws give identical outcomes.
pub trait RngPolicy: Send + Sync {
    /// Does this gene fetch mutate?
    fn mutate(&self, rng: &mut dyn RngCore) -> bool;

    /// Energy carried by one inflow.
    fn energy(&self, rng: &mut dyn RngCore) -> i64;

    /// May a cell holding `logo` in its register act on `target`?
    /// `mode` is `Kill`, `Share` or `Stop` (reproduction).
    fn cell_accessible(
        &self,
        rng: &mut dyn RngCore,
        target: &Cell,
        logo: Gene,
        mode: Gene,
    ) -> bool;
}

/// Default policy with the stock mutation rate and inflow energy range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefaultRng {
    pub mutation_rate: f64,
    pub inflow_rate_base: i64,
    pub inflow_rate_modifier: i64,
}

impl Default for DefaultRng {
    fn default() -> DefaultRng {
        DefaultRng {
            mutation_rate: 0.000_001_15,
            inflow_rate_base: 600,
            inflow_rate_modifier: 1000,
        }
    }
}

impl RngPolicy for DefaultRng {
    fn mutate(&self, rng: &mut dyn RngCore) -> bool {
        rng.gen::<f64>() < self.mutation_rate
    }

    fn energy(&self, rng: &mut dyn RngCore) -> i64 {
        self.inflow_rate_base + rng.gen_range(0..self.inflow_rate_modifier)
    }

    fn cell_accessible(
        &self,
        rng: &mut dyn RngCore,
        target: &Cell,
        logo: Gene,
        mode: Gene,
    ) -> bool {
        // Unclaimed territory is open to everyone.
        if target.energy == 0 || target.generation == 0 {
            return true;
        }

        let i = rng.gen_range(0..GENE_COUNT as i64);
        let b = BITS_PER_GENE[(target.logo().ordinal() ^ logo.ordinal()) as usize];

        match mode {
            Gene::Kill | Gene::Stop => i <= b,
            Gene::Share => i >= b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn target(energy: i64, generation: i64, logo: Gene) -> Cell {
        let mut c = Cell::new(0, 0, 0, 4);
        c.energy = energy;
        c.generation = generation;
        c.genome[0] = logo;
        c
    }

    #[test]
    fn test_bits_per_gene_is_popcount() {
        for (v, &bits) in BITS_PER_GENE.iter().enumerate() {
            assert_eq!(bits, (v as u32).count_ones() as i64);
        }
    }

    #[test]
    fn test_dead_or_unestablished_targets_always_accessible() {
        let policy = DefaultRng::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let dead = target(0, 5, Gene::Zero);
        let unestablished = target(100, 0, Gene::Zero);
        for _ in 0..32 {
            assert!(policy.cell_accessible(&mut rng, &dead, Gene::Stop, Gene::Kill));
            assert!(policy.cell_accessible(&mut rng, &unestablished, Gene::Stop, Gene::Share));
        }
    }

    #[test]
    fn test_share_with_identical_logo_always_accessible() {
        // XOR distance 0 means the draw can never undercut it.
        let policy = DefaultRng::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t = target(100, 3, Gene::Share);
        for _ in 0..64 {
            assert!(policy.cell_accessible(&mut rng, &t, Gene::Share, Gene::Share));
        }
    }

    #[test]
    fn test_unknown_mode_never_accessible() {
        let policy = DefaultRng::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let t = target(100, 3, Gene::Zero);
        for _ in 0..16 {
            assert!(!policy.cell_accessible(&mut rng, &t, Gene::Stop, Gene::Inc));
        }
    }

    #[test]
    fn test_accessible_deterministic_for_equal_rng_state() {
        let policy = DefaultRng::default();
        let t = target(100, 3, Gene::Zero);

        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..128 {
            assert_eq!(
                policy.cell_accessible(&mut a, &t, Gene::Stop, Gene::Kill),
                policy.cell_accessible(&mut b, &t, Gene::Stop, Gene::Kill),
            );
        }
    }

    #[test]
    fn test_mutation_rate_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let never = DefaultRng { mutation_rate: 0.0, ..DefaultRng::default() };
        let always = DefaultRng { mutation_rate: 1.0, ..DefaultRng::default() };
        for _ in 0..32 {
            assert!(!never.mutate(&mut rng));
            assert!(always.mutate(&mut rng));
        }
    }

    #[test]
    fn test_energy_in_configured_range() {
        let policy = DefaultRng::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..256 {
            let e = policy.energy(&mut rng);
            assert!((600..1600).contains(&e));
        }
    }
}
