//! Scheduler module - tick loop, worker pool and applier

mod runner;
mod worker;

pub use runner::Simulation;
