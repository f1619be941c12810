//! End-to-end scheduler tests
//!
//! Runs the full worker pool against a small world and checks the universal
//! invariants on every streamed delta and on the final grid.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use rockpool_core::{stats, Grid, Stats};
use rockpool_simulation::Simulation;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_workers_preserve_world_invariants() {
    let grid = Arc::new(Grid::new(16, 16, 32, 8, 7));
    let sim = Arc::new(Simulation::new(grid.clone()));
    let (deltas_tx, mut deltas_rx) = mpsc::channel(4);

    let runner = {
        let sim = sim.clone();
        tokio::spawn(async move {
            sim.run(2, Duration::from_micros(200), deltas_tx).await;
        })
    };

    let mut merged = Stats::new();
    let mut max_generation = 0;
    let mut seen = 0;

    while let Some(dt) = deltas_rx.recv().await {
        seen += 1;
        assert!(!dt.cells.is_empty());
        assert!(dt.stats.get(stats::TICKS) >= 1);

        // No duplicate index within one delta.
        let mut idxs: Vec<usize> = dt.cells.iter().map(|c| c.idx).collect();
        idxs.sort_unstable();
        idxs.dedup();
        assert_eq!(idxs.len(), dt.cells.len());

        for c in &dt.cells {
            assert_eq!(c.genome.len(), 32);
            assert!(c.energy >= 0);
            assert_eq!(c.energy > 0, c.id > 0, "vitality and identity agree");
            assert_eq!(c.idx, c.y * 16 + c.x);
        }

        // MaxGeneration is monotone under merge.
        merged.merge(&dt.stats);
        assert!(merged.get(stats::MAX_GENERATION) >= max_generation);
        max_generation = merged.get(stats::MAX_GENERATION);

        if seen >= 300 {
            sim.stop();
            break;
        }
    }

    // Drain to end-of-stream, then the runner joins.
    while deltas_rx.recv().await.is_some() {}
    runner.await.expect("runner task completes");

    // The live set matches a recount of the final grid.
    let live = grid.live_cell_count();
    grid.with_cells(|cells| {
        let recount = cells.iter().filter(|c| c.energy > 0).count();
        assert_eq!(live, recount);
        for c in cells {
            assert_eq!(c.energy > 0, c.id > 0);
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_closes_the_delta_stream() {
    let grid = Arc::new(Grid::new(8, 8, 16, 4, 3));
    let sim = Arc::new(Simulation::new(grid));
    let (deltas_tx, mut deltas_rx) = mpsc::channel(2);

    let runner = {
        let sim = sim.clone();
        tokio::spawn(async move {
            sim.run(2, Duration::from_micros(200), deltas_tx).await;
        })
    };

    assert!(deltas_rx.recv().await.is_some(), "the world produces deltas");
    sim.stop();

    while deltas_rx.recv().await.is_some() {}
    runner.await.expect("runner exits after stop");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_before_run_exits_immediately() {
    let grid = Arc::new(Grid::new(8, 8, 16, 0, 3));
    let sim = Simulation::new(grid);
    let (deltas_tx, mut deltas_rx) = mpsc::channel(2);

    sim.stop();
    sim.run(2, Duration::from_micros(200), deltas_tx).await;
    assert!(deltas_rx.recv().await.is_none());
}
