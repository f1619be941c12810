//! The simulation driver
//!
//! One timer task owns the tick protocol: drain the initial population one
//! seeding per tick, fire the periodic inflow, then dispatch one execution.
//! Workers race for the events; a single applier task owns delta application
//! order and forwards every applied delta 1:1 to the caller's channel.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::interval;

use rockpool_core::{Context, Delta, Grid};

use super::worker::{self, Worker};

/// Handle on a running (or runnable) simulation. `run` drives the world
/// until `stop` is called; dropping the outbound receiver does not stop the
/// simulation, it only stops the forwarding.
pub struct Simulation {
    grid: Arc<Grid>,
    shutdown: watch::Sender<bool>,
}

impl Simulation {
    pub fn new(grid: Arc<Grid>) -> Simulation {
        let (shutdown, _) = watch::channel(false);
        Simulation { grid, shutdown }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// Request a cooperative shutdown. Every blocking point in the tick
    /// loop, the workers and the applier observes it; the outbound channel
    /// closes once the applier has drained.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Drive the world with `workers` parallel workers at one event batch
    /// per `tick`, streaming applied deltas into `deltas`. Returns after
    /// `stop`, once the workers have drained and the stream is closed.
    pub async fn run(&self, workers: usize, tick: Duration, deltas: mpsc::Sender<Delta>) {
        let workers = workers.max(1);

        let (exec_tx, exec_rx) = mpsc::channel::<i64>(1);
        let (inflow_tx, inflow_rx) = mpsc::channel::<i64>(1);
        let (applier_tx, applier_rx) = mpsc::channel::<Delta>(workers);

        let exec_rx = Arc::new(Mutex::new(exec_rx));
        let inflow_rx = Arc::new(Mutex::new(inflow_rx));
        let retry_pending = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let w = Worker {
                grid: self.grid.clone(),
                exec: exec_rx.clone(),
                inflow: inflow_rx.clone(),
                inflow_tx: inflow_tx.clone(),
                deltas: applier_tx.clone(),
                shutdown: self.shutdown.subscribe(),
                retry_pending: retry_pending.clone(),
            };
            let ctx = Context::new(&self.grid);
            handles.push(tokio::spawn(worker::run(w, ctx)));
        }

        let applier = tokio::spawn(apply_loop(self.grid.clone(), applier_rx, deltas));
        drop(applier_tx);

        tracing::info!("Simulation started ({} workers, tick {:?})", workers, tick);

        self.tick_loop(tick, &exec_tx, &inflow_tx).await;

        // Closing the dispatch channels sends every worker home; the applier
        // drains behind them and closes the outbound stream.
        drop(exec_tx);
        drop(inflow_tx);
        for handle in handles {
            let _ = handle.await;
        }
        let _ = applier.await;

        tracing::info!("Simulation stopped");
    }

    async fn tick_loop(
        &self,
        tick: Duration,
        exec: &mpsc::Sender<i64>,
        inflow: &mpsc::Sender<i64>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = interval(tick);
        let mut ticks: i64 = 0;
        let mut init_pop = self.grid.initial_population() as i64;
        let mut inflow_countdown = self.grid.config().inflow_frequency;

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = ticker.tick() => {}
            }
            ticks += 1;

            if init_pop > 0 {
                if !dispatch(inflow, ticks, &mut shutdown).await {
                    return;
                }
                init_pop -= 1;
            }

            inflow_countdown -= 1;
            if inflow_countdown == 0 {
                if !dispatch(inflow, ticks, &mut shutdown).await {
                    return;
                }
                inflow_countdown = self.grid.config().inflow_frequency;
            }

            if !dispatch(exec, ticks, &mut shutdown).await {
                return;
            }
        }
    }
}

async fn dispatch(
    tx: &mpsc::Sender<i64>,
    ticks: i64,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = shutdown.changed() => false,
        res = tx.send(ticks) => res.is_ok(),
    }
}

/// Sole owner of delta application order. Merges each delta into the grid
/// under the write lock, then forwards it. When the consumer goes away the
/// loop keeps applying so execution leases keep draining.
async fn apply_loop(
    grid: Arc<Grid>,
    mut deltas_in: mpsc::Receiver<Delta>,
    deltas_out: mpsc::Sender<Delta>,
) {
    let mut forward = true;
    while let Some(mut dt) = deltas_in.recv().await {
        grid.apply_delta(&mut dt);
        if forward {
            forward = deltas_out.send(dt).await.is_ok();
        }
    }
}
