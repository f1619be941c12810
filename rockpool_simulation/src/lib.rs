//! Rockpool Simulation - Scheduler and Delta Stream
//!
//! Drives the `rockpool_core` world with a pool of tokio workers. A timer
//! task emits seeding and execution events; any free worker picks one up,
//! reserves a cell, runs the seeding routine or the VM, and hands the
//! resulting delta to a single applier task that merges it into the grid and
//! forwards it to the caller's channel. Closing that channel marks the end
//! of the stream.

pub mod scheduler;

pub use scheduler::Simulation;
