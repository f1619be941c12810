//! Worker loop - one task per worker, any worker takes any event
//!
//! Workers select over shutdown, inflow and exec. Tokio has no MPMC channel,
//! so the two dispatch receivers are shared behind async mutexes; whichever
//! worker holds a lock when a tick lands takes the event, and the lock is
//! released before the event is processed, so VM runs overlap freely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use rockpool_core::{stats, Context, Delta, Grid};

pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<i64>>>;

pub(crate) struct Worker {
    pub grid: Arc<Grid>,
    pub exec: SharedReceiver,
    pub inflow: SharedReceiver,
    pub inflow_tx: mpsc::Sender<i64>,
    pub deltas: mpsc::Sender<Delta>,
    pub shutdown: watch::Receiver<bool>,
    /// Guard keeping at most one detached inflow retry in flight.
    pub retry_pending: Arc<AtomicBool>,
}

enum Event {
    Inflow(i64),
    Exec(i64),
}

pub(crate) async fn run(mut w: Worker, mut ctx: Context) {
    loop {
        if *w.shutdown.borrow() {
            return;
        }

        let event = tokio::select! {
            _ = w.shutdown.changed() => return,
            ev = recv(&w.inflow) => match ev {
                Some(ticks) => Event::Inflow(ticks),
                None => return,
            },
            ev = recv(&w.exec) => match ev {
                Some(ticks) => Event::Exec(ticks),
                None => return,
            },
        };

        match event {
            Event::Inflow(ticks) => {
                // No reservable slot means the event is dropped.
                if let Some(mut dt) = ctx.seed(&w.grid) {
                    dt.stats.set(stats::TICKS, ticks);
                    if !send_delta(&w, dt).await {
                        return;
                    }
                }
            }
            Event::Exec(ticks) => {
                if let Some(mut dt) = ctx.exec(&w.grid) {
                    dt.stats.set(stats::TICKS, ticks);
                    if !send_delta(&w, dt).await {
                        return;
                    }
                } else {
                    // Nothing alive to run: turn the tick into an inflow so
                    // it still does useful work. Detached, or a worker could
                    // deadlock against its own unbuffered dispatch.
                    forward_to_inflow(&w, ticks);
                }
            }
        }
    }
}

async fn recv(rx: &SharedReceiver) -> Option<i64> {
    rx.lock().await.recv().await
}

/// Push a finished delta to the applier. On failure the applier is gone and
/// the run is over; the leases held by this delta are dropped so the grid
/// stays reservable.
async fn send_delta(w: &Worker, dt: Delta) -> bool {
    if let Err(send) = w.deltas.send(dt).await {
        for c in &send.0.cells {
            w.grid.release(c.idx);
        }
        return false;
    }
    true
}

fn forward_to_inflow(w: &Worker, ticks: i64) {
    if w
        .retry_pending
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return;
    }

    let tx = w.inflow_tx.clone();
    let pending = w.retry_pending.clone();
    tokio::spawn(async move {
        let _ = tx.send(ticks).await;
        pending.store(false, Ordering::Release);
    });
}
