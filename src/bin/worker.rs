use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use valet_dispatch::{
    app_state::build_job_service,
    config::AppConfig,
    db,
    error::JobResult,
    services::{sweep_lock::SweepLock, JobService},
};

const ESCALATION_SWEEP: &str = "escalation";
const MAINTENANCE_SWEEP: &str = "maintenance";

/// Daily maintenance runs at this UTC time.
fn maintenance_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN)
}

/// Next maintenance instant strictly after `now`.
fn next_maintenance_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive().and_time(maintenance_time()).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Run `sweep` under the named lease when a lock is configured.
async fn run_locked<F, Fut, T>(lock: Option<&SweepLock>, name: &str, ttl: Duration, sweep: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = JobResult<T>>,
    T: std::fmt::Debug,
{
    let guard = match lock {
        Some(lock) => match lock.try_acquire(name, ttl).await {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => {
                tracing::debug!(sweep = name, "Lease held by another replica, skipping");
                return;
            }
            Err(e) => {
                tracing::warn!(sweep = name, error = %e, "Sweep lock unavailable, skipping");
                return;
            }
        },
        None => None,
    };

    match sweep().await {
        Ok(report) => tracing::debug!(sweep = name, ?report, "Sweep complete"),
        Err(e) => tracing::error!(sweep = name, error = %e, "Sweep failed"),
    }

    if let (Some(lock), Some(guard)) = (lock, guard) {
        if let Err(e) = lock.release(guard).await {
            tracing::warn!(sweep = name, error = %e, "Failed to release sweep lease");
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting valet-dispatch sweep worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let jobs: JobService = build_job_service(&config, db_pool).expect("Failed to build job service");
    let lock = match config.redis_url.as_deref() {
        Some(url) if !url.is_empty() => {
            Some(SweepLock::new(url).expect("Failed to initialize sweep lock"))
        }
        _ => {
            tracing::warn!("No REDIS_URL, sweeps run without a lease");
            None
        }
    };
    let ttl = Duration::from_secs(config.sweep_lock_ttl_secs);

    run_locked(lock.as_ref(), MAINTENANCE_SWEEP, ttl, || jobs.run_daily_maintenance()).await;
    let mut next_maintenance = next_maintenance_after(Utc::now());

    let mut ticker = tokio::time::interval(Duration::from_secs(config.escalation_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = config.escalation_interval_secs,
        next_maintenance = %next_maintenance,
        "Worker ready, starting sweep loop"
    );

    loop {
        ticker.tick().await;
        run_locked(lock.as_ref(), ESCALATION_SWEEP, ttl, || jobs.run_escalation_sweep()).await;

        let now = Utc::now();
        if now >= next_maintenance {
            run_locked(lock.as_ref(), MAINTENANCE_SWEEP, ttl, || jobs.run_daily_maintenance())
                .await;
            next_maintenance = next_maintenance_after(now);
        }
    }
}
