//! Gather Daemon - Main Entry Point
//! Hosts the periodic job runner on top of the SQLite store

mod app;
mod dispatch;
mod jobs;
mod logging;
mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use gather_core::application::shutdown_channel;
use gather_core::port::time_provider::SystemTimeProvider;
use gather_core::port::TimeProvider;
use gather_infra_sqlite::{create_pool, run_migrations};

use app::Gather;
use dispatch::TracingDispatch;
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (defaults, file, environment)
    let settings = Settings::load().context("Failed to load configuration")?;

    // 2. Initialize logging; the guard flushes file output on exit
    let _log_guard = logging::init(&settings.log)?;

    info!("Gather daemon v{} starting...", VERSION);

    // 3. Initialize database
    info!(database_url = %settings.database.url, "Initializing database...");
    let pool = create_pool(&settings.database.url, settings.database.max_connections)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let app = Gather::wire(
        &settings,
        pool.clone(),
        time_provider,
        Arc::new(TracingDispatch::new()),
    )
    .context("Wiring failed")?;

    // 5. Sweep holds that expired while the daemon was down
    match app.holds.sweep_expired().await {
        Ok(removed) => info!(removed, "Startup hold sweep completed"),
        Err(e) => warn!(error = %e, "Startup hold sweep failed"),
    }

    // 6. Start the job runner
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let runner = app.runner.clone();
    let runner_handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    info!(
        venues = settings.venues.len(),
        jobs = app.runner.job_names().len(),
        "System ready"
    );
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: stop dispatching, let running jobs finish, then abort
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, runner_handle).await.is_err() {
        warn!("Job runner did not stop within the grace period");
    }
    if !app.runner.wait_idle(SHUTDOWN_GRACE).await {
        app.runner.abort_in_flight();
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
