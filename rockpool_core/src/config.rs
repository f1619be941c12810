//! Runtime simulation knobs
//!
//! A plain value type held by the grid behind an atomically swappable
//! snapshot. Readers take one copy per decision and never read twice
//! expecting coherence.

/// Hot-swappable simulation configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Ticks between periodic energy inflows.
    pub inflow_frequency: i64,
    /// Generation at which a lineage counts as established.
    pub viable_cell_generation: i64,
    /// Divisor for the energy penalty on a failed kill of a viable cell.
    pub failed_kill_penalty: i64,
    /// When true, inflow may land on any slot; otherwise only dead slots.
    pub seed_live_cells: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            inflow_frequency: 10,
            viable_cell_generation: 2,
            failed_kill_penalty: 3,
            seed_live_cells: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.inflow_frequency, 10);
        assert_eq!(c.viable_cell_generation, 2);
        assert_eq!(c.failed_kill_penalty, 3);
        assert!(c.seed_live_cells);
    }
}
