use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use invite_tracker_engine::config;
use invite_tracker_engine::gateway::RestMembershipGateway;
use invite_tracker_engine::jobs::{InviteSyncJob, JobScheduler, PoolMetricsJob};
use invite_tracker_engine::logging;
use invite_tracker_engine::services::{InviteTracker, TrackingPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    logging::init_logging(&config.logging);

    info!("Starting Invite Tracker v{}", env!("CARGO_PKG_VERSION"));

    // Expose Prometheus metrics if enabled
    if config.metrics.enabled {
        let addr = config.metrics.socket_addr()?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Metrics exporter listening on {}", addr);
    }

    // Create database pool
    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Build the gateway client and the tracker service
    let gateway = Arc::new(RestMembershipGateway::new(&config.gateway)?);
    let tracker = Arc::new(InviteTracker::new(
        pool.clone(),
        gateway,
        TrackingPolicy {
            min_account_age_hours: config.tracking.min_account_age_hours,
            demotion_enabled: config.tracking.demotion_enabled,
        },
    ));

    // Start background jobs
    let mut scheduler = JobScheduler::new();
    scheduler.register(InviteSyncJob::new(
        Arc::clone(&tracker),
        config.tracking.group_ids.clone(),
        config.tracking.invite_sync_minutes,
    ));
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    info!(
        groups = config.tracking.group_ids.len(),
        "Invite tracker running, press Ctrl+C to stop"
    );
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    pool.close().await;

    Ok(())
}
