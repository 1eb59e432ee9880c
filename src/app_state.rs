use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::services::{
    engine::{Collaborators, JobService, SystemClock},
    holidays::UsFederalHolidays,
    notify::{LogNotifier, NotificationDispatcher, NotifyError, SmsEmailNotifier},
    routing::{CrowFliesRouting, RoutesApiClient, RoutingProvider},
    sweep_lock::{LockError, SweepLock},
    vision::{DisabledVision, VisionError, VisionVerifier, WorkersAiVision},
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jobs: Arc<JobService>,
    pub sweep_lock: Option<Arc<SweepLock>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("vision client: {0}")]
    Vision(#[from] VisionError),

    #[error("notification client: {0}")]
    Notify(#[from] NotifyError),

    #[error("routing client: {0}")]
    Routing(#[from] reqwest::Error),

    #[error("sweep lock: {0}")]
    Lock(#[from] LockError),
}

impl AppState {
    pub fn new(db: PgPool, jobs: JobService, sweep_lock: Option<SweepLock>) -> Self {
        Self {
            db,
            jobs: Arc::new(jobs),
            sweep_lock: sweep_lock.map(Arc::new),
        }
    }

    /// Wire the job service against Postgres, choosing each collaborator from config.
    pub fn from_config(config: &AppConfig, db: PgPool) -> Result<Self, StartupError> {
        let jobs = build_job_service(config, db.clone())?;
        let sweep_lock = match config.redis_url.as_deref() {
            Some(url) if !url.is_empty() => Some(SweepLock::new(url)?),
            _ => None,
        };
        Ok(Self::new(db, jobs, sweep_lock))
    }
}

pub fn build_job_service(config: &AppConfig, db: PgPool) -> Result<JobService, StartupError> {
    let store = Arc::new(PgStore::new(db));

    let vision: Arc<dyn VisionVerifier> = match config.vision_credentials() {
        Some((account, token)) => {
            tracing::info!("Photo verification enabled (Workers AI)");
            Arc::new(WorkersAiVision::new(account, token)?)
        }
        None => {
            tracing::info!("Photo verification disabled, photos auto-pass");
            Arc::new(DisabledVision)
        }
    };

    let routing: Arc<dyn RoutingProvider> = match config.routes_api_key.as_deref() {
        Some(key) if !key.is_empty() => Arc::new(RoutesApiClient::new(key)?),
        _ => {
            tracing::info!("No routing API key, using crow-flies estimates");
            Arc::new(CrowFliesRouting)
        }
    };

    let notifier: Arc<dyn NotificationDispatcher> = match SmsEmailNotifier::from_config(config)? {
        Some(notifier) => Arc::new(notifier),
        None => {
            tracing::info!("No SMS or email credentials, notices are logged only");
            Arc::new(LogNotifier)
        }
    };

    let deps = Collaborators::with_directory(
        store.clone(),
        vision,
        routing,
        notifier,
        Arc::new(UsFederalHolidays),
        Arc::new(SystemClock),
    );
    Ok(JobService::new(store, deps))
}
