use std::sync::Arc;
use std::time::Duration;

use goal_tracker::clock::SystemClock;
use goal_tracker::db::clean_expired_sessions;
use goal_tracker::env::{AppConfig, load_environment};
use goal_tracker::telemetry::init_tracing;
use goal_tracker::{Error, init_rocket};
use rocket::tokio;
use sqlx::SqlitePool;
use tracing::{error, info};

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_loaded = load_environment();
    let _otel_guard = init_tracing();
    env_loaded?;

    let config = AppConfig::from_env()?;

    let pool = SqlitePool::connect(&config.database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    let pool_clone = pool.clone();
    let cleanup_every = Duration::from_secs(config.session_cleanup_secs);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(cleanup_every).await;
        }
    });

    let _rocket = init_rocket(pool, Arc::new(SystemClock), config)
        .launch()
        .await?;

    Ok(())
}
