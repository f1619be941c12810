//! Rockpool Simulation Runner
//!
//! Builds a world from environment variables, drives it with a worker pool,
//! and streams every applied delta as one JSON object per line on stdout.
//! Logs go to stderr so the delta stream stays machine-readable. Ctrl-C
//! stops the scheduler cooperatively and the stream ends cleanly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use rockpool_core::{stats, Grid};
use rockpool_simulation::Simulation;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing on stderr; stdout carries the delta stream
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rockpool_simulation=info".parse()?),
        )
        .init();

    let width: usize = env_or("ROCKPOOL_WIDTH", 256);
    let height: usize = env_or("ROCKPOOL_HEIGHT", 256);
    let genome_size: usize = env_or("ROCKPOOL_GENOME_SIZE", 1024);
    let population: f64 = env_or("ROCKPOOL_POPULATION", 0.01);
    let seed: i64 = env_or("ROCKPOOL_SEED", -1);
    let tick_us: u64 = env_or("ROCKPOOL_TICK_US", 1000);
    let workers: usize = env_or(
        "ROCKPOOL_WORKERS",
        std::thread::available_parallelism().map_or(1, |n| n.get()),
    );

    let initial_population = (population * (width * height) as f64) as usize;
    let grid = Arc::new(Grid::new(width, height, genome_size, initial_population, seed));

    tracing::info!(
        "World created: {}x{}, genome={}, initial_population={}, seed={}",
        width,
        height,
        genome_size,
        initial_population,
        grid.seed
    );

    let sim = Arc::new(Simulation::new(grid));
    let (deltas_tx, mut deltas_rx) = mpsc::channel(workers.max(1));

    let runner = {
        let sim = sim.clone();
        tokio::spawn(async move {
            sim.run(workers, Duration::from_micros(tick_us), deltas_tx).await;
        })
    };

    {
        let sim = sim.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping");
                sim.stop();
            }
        });
    }

    let mut emitted: u64 = 0;
    while let Some(dt) = deltas_rx.recv().await {
        println!("{}", serde_json::to_string(&dt)?);

        emitted += 1;
        if emitted % 1000 == 0 {
            tracing::debug!(
                "Deltas: {}, live cells: {}, ticks: {}",
                emitted,
                dt.stats.get(stats::LIVE_CELLS),
                dt.stats.get(stats::TICKS)
            );
        }
    }

    runner.await?;
    tracing::info!("Delta stream closed after {} deltas", emitted);

    Ok(())
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
