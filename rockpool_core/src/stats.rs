//! Delta statistics with per-key merge semantics
//!
//! Counters sum when merged; `Ticks` and `MaxGeneration` are monotone maxima;
//! `LiveCells` and `ViableLiveCells` are gauges that replace.

use std::collections::HashMap;

pub const TICKS: &str = "Ticks";
pub const MAX_GENERATION: &str = "MaxGeneration";
pub const LIVE_CELLS: &str = "LiveCells";
pub const VIABLE_LIVE_CELLS: &str = "ViableLiveCells";
pub const MUTATIONS: &str = "Mutations";
pub const CELLS_KILLED: &str = "CellsKilled";
pub const VIABLE_CELLS_KILLED: &str = "ViableCellsKilled";
pub const LIVE_CELLS_KILLED: &str = "LiveCellsKilled";
pub const CELLS_SHARED: &str = "CellsShared";
pub const VIABLE_CELLS_SHARED: &str = "ViableCellsShared";
pub const LIVE_CELLS_SHARED: &str = "LiveCellsShared";
pub const REPRODUCTION_ATTEMPTS: &str = "ReproductionAttempts";
pub const REPRODUCTIONS: &str = "Reproductions";
pub const NATURAL_DEATHS: &str = "NaturalDeaths";
pub const VIABLE_CELL_NATURAL_DEATHS: &str = "ViableCellNaturalDeaths";

/// Named 64-bit counters attached to a delta.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Stats(HashMap<&'static str, i64>);

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    /// Current value, 0 when the key was never touched.
    pub fn get(&self, name: &str) -> i64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Add to a counter.
    pub fn inc(&mut self, name: &'static str, v: i64) {
        *self.0.entry(name).or_insert(0) += v;
    }

    /// Raise a monotone maximum.
    pub fn update(&mut self, name: &'static str, v: i64) {
        let e = self.0.entry(name).or_insert(v);
        if v > *e {
            *e = v;
        }
    }

    /// Overwrite a gauge.
    pub fn set(&mut self, name: &'static str, v: i64) {
        self.0.insert(name, v);
    }

    /// Merge another stats set into this one under the per-key policy.
    pub fn merge(&mut self, other: &Stats) {
        for (&name, &v) in &other.0 {
            match name {
                TICKS | MAX_GENERATION => self.update(name, v),
                LIVE_CELLS | VIABLE_LIVE_CELLS => self.set(name, v),
                _ => self.inc(name, v),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
