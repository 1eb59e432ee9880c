use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::AppConfig;

pub mod memory;
pub mod queries;
pub mod store;

pub use memory::MemoryStore;
pub use queries::PgStore;
pub use store::{InstanceFilter, JobStore};

/// Connect to the shared job database. Acquire waits are capped at 5 seconds.
pub async fn init_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let max = config.database_max_connections.max(1);
    let pool = PgPoolOptions::new()
        .max_connections(max)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .connect(&config.database_url)
        .await?;
    tracing::info!(max_connections = max, "Database pool ready");
    Ok(pool)
}

/// Apply the job schema in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}
