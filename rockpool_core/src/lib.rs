//! Rockpool Core - Digital-Life Simulation Library
//!
//! A toroidal grid of cells, each carrying a small genome executed by a
//! specialized virtual machine. Cells burn energy as they run, kill and feed
//! their neighbors, reproduce with inheritance and mutation, and die when
//! their energy is exhausted. Every VM run or seeding produces a [`Delta`],
//! an atomic change set suitable for streaming to consumers.
//!
//! This crate is runtime-agnostic: the scheduler that drives workers lives in
//! `rockpool_simulation`. Everything here is safe to call from any thread.
//!
//! # Features
//!
//! - `serde` - Enable serde serialization of cells, deltas and stats
//!   (genomes serialize as their printable-symbol string)
//!
//! # Example
//!
//! ```rust
//! use rockpool_core::{Context, Grid};
//!
//! // A 16x16 world with 32-gene genomes and a fixed seed.
//! let grid = Grid::new(16, 16, 32, 0, 42);
//! let mut ctx = Context::new(&grid);
//!
//! // Seed a random cell with energy and a random genome, then apply.
//! let mut dt = ctx.seed(&grid).expect("an unreserved slot exists");
//! grid.apply_delta(&mut dt);
//!
//! // Execute one live cell.
//! let mut dt = ctx.exec(&grid).expect("a live cell exists");
//! grid.apply_delta(&mut dt);
//! ```

mod bitset;
pub mod cell;
pub mod config;
pub mod context;
pub mod delta;
pub mod gene;
pub mod grid;
pub mod rng;
pub mod stats;
pub mod vm;

pub use cell::{Cell, CellIds};
pub use config::Config;
pub use context::Context;
pub use delta::Delta;
pub use gene::{Gene, Genome, GENE_COUNT};
pub use grid::{CellPredicate, Direction, Grid};
pub use rng::{DefaultRng, RngPolicy};
pub use stats::Stats;
pub use vm::Vm;
