use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sakina_support::server::{
    config::{app_with_store, SupportSettings},
    services::{pg_store::PgStore, store::SupportStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = SupportSettings::from_env()?;
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!().run(&pool).await?;

    let store: Arc<dyn SupportStore> = Arc::new(PgStore::new(pool));
    spawn_retention_sweep(store.clone(), settings.guest_retention_days);

    let app = app_with_store(store, settings.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Hourly retention sweep: unmerged guest identities idle beyond the
/// configured window are purged along with their messages.
fn spawn_retention_sweep(store: Arc<dyn SupportStore>, retention_days: i64) {
    let retention = chrono::Duration::days(retention_days);
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(60 * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match store.purge_stale_guests(Utc::now() - retention).await {
                Ok(0) => {}
                Ok(n) => info!("purged {} stale guest identities", n),
                Err(e) => warn!("guest retention sweep failed: {}", e),
            }
        }
    });
}
