//! The job service and the plumbing its operations share.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::db::store::JobStore;
use crate::error::{JobError, JobResult, LatestRow};
use crate::models::definition::JobDefinition;
use crate::models::instance::JobInstance;
use crate::models::property::Property;
use crate::models::verification::UnitVerification;
use crate::services::holidays::HolidayCalendar;
use crate::services::notify::{Notice, NotificationDispatcher};
use crate::services::penalty::PenaltyTier;
use crate::services::providers::{
    BuildingProvider, DumpsterProvider, PropertyProvider, UnitProvider, WorkerProvider,
};
use crate::services::routing::RoutingProvider;
use crate::services::time_window::JobWindow;
use crate::services::vision::VisionVerifier;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything the engine talks to besides its own tables.
#[derive(Clone)]
pub struct Collaborators {
    pub properties: Arc<dyn PropertyProvider>,
    pub buildings: Arc<dyn BuildingProvider>,
    pub units: Arc<dyn UnitProvider>,
    pub dumpsters: Arc<dyn DumpsterProvider>,
    pub workers: Arc<dyn WorkerProvider>,
    pub vision: Arc<dyn VisionVerifier>,
    pub routing: Arc<dyn RoutingProvider>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub holidays: Arc<dyn HolidayCalendar>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Use one backend for every directory lookup.
    pub fn with_directory<D>(
        directory: Arc<D>,
        vision: Arc<dyn VisionVerifier>,
        routing: Arc<dyn RoutingProvider>,
        notifier: Arc<dyn NotificationDispatcher>,
        holidays: Arc<dyn HolidayCalendar>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        D: PropertyProvider
            + BuildingProvider
            + UnitProvider
            + DumpsterProvider
            + WorkerProvider
            + 'static,
    {
        Self {
            properties: directory.clone(),
            buildings: directory.clone(),
            units: directory.clone(),
            dumpsters: directory.clone(),
            workers: directory,
            vision,
            routing,
            notifier,
            holidays,
            clock,
        }
    }
}

/// An instance with the definition, property, and time anchors it is judged by.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub instance: JobInstance,
    pub definition: JobDefinition,
    pub property: Property,
    pub tz: Tz,
    pub window: JobWindow,
}

impl InstanceContext {
    pub fn notice(&self, subject: &str, body: String) -> Notice {
        Notice {
            property_id: self.property.id,
            property_name: self.property.name.clone(),
            definition_id: self.definition.id,
            instance_id: self.instance.id,
            service_date: self.instance.service_date,
            subject: subject.to_string(),
            body,
        }
    }
}

/// Job lifecycle and scheduling engine.
pub struct JobService {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) deps: Collaborators,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, deps: Collaborators) -> Self {
        Self { store, deps }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.deps.clock.now()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub(crate) async fn load_instance(&self, instance_id: Uuid) -> JobResult<JobInstance> {
        self.store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| JobError::not_found("job instance", instance_id))
    }

    pub(crate) async fn load_definition(&self, definition_id: Uuid) -> JobResult<JobDefinition> {
        self.store
            .get_definition(definition_id)
            .await?
            .ok_or_else(|| JobError::not_found("job definition", definition_id))
    }

    pub(crate) async fn load_property(&self, property_id: Uuid) -> JobResult<Property> {
        self.deps
            .properties
            .get_property(property_id)
            .await?
            .ok_or_else(|| JobError::not_found("property", property_id))
    }

    pub(crate) async fn load_context(&self, instance: JobInstance) -> JobResult<InstanceContext> {
        let definition = self.load_definition(instance.definition_id).await?;
        let property = self.load_property(definition.property_id).await?;
        Ok(Self::context_from(instance, definition, property))
    }

    pub(crate) fn context_from(
        instance: JobInstance,
        definition: JobDefinition,
        property: Property,
    ) -> InstanceContext {
        let tz = property.zone();
        let window = JobWindow::for_date(&definition, instance.service_date, tz);
        InstanceContext {
            instance,
            definition,
            property,
            tz,
            window,
        }
    }

    /// Write `next` over the row at `expected_version`.
    ///
    /// Zero rows matched becomes not-found or a conflict carrying the current row.
    pub(crate) async fn commit_instance(
        &self,
        next: &JobInstance,
        expected_version: i64,
        transition: &'static str,
    ) -> JobResult<JobInstance> {
        if let Some(written) = self
            .store
            .update_instance_if_version(next, expected_version)
            .await?
        {
            metrics::counter!("job_transitions_total", "transition" => transition).increment(1);
            tracing::info!(
                instance_id = %written.id,
                status = %written.status,
                row_version = written.row_version,
                transition,
                "Job instance updated"
            );
            return Ok(written);
        }

        metrics::counter!("job_conflicts_total", "transition" => transition).increment(1);
        match self.store.get_instance(next.id).await? {
            Some(latest) => {
                tracing::info!(
                    instance_id = %next.id,
                    expected_version,
                    current_version = latest.row_version,
                    transition,
                    "Job instance version conflict"
                );
                Err(JobError::instance_conflict(latest))
            }
            None => Err(JobError::not_found("job instance", next.id)),
        }
    }

    pub(crate) async fn commit_verification(
        &self,
        next: &UnitVerification,
        expected_version: i64,
    ) -> JobResult<UnitVerification> {
        if let Some(written) = self
            .store
            .update_verification_if_version(next, expected_version)
            .await?
        {
            return Ok(written);
        }
        match self
            .store
            .get_verification(next.job_instance_id, next.unit_id)
            .await?
        {
            Some(latest) => Err(JobError::RowVersionConflict {
                latest: LatestRow::Verification(Box::new(latest)),
            }),
            None => Err(JobError::not_found("unit verification", next.id)),
        }
    }

    /// Apply a penalty tier. Failures are logged; the transition already stands.
    pub(crate) async fn penalize(&self, worker_id: Uuid, tier: PenaltyTier, reason: &str) {
        let delta = tier.delta();
        if delta == 0 {
            return;
        }
        match self
            .deps
            .workers
            .adjust_reliability_score(worker_id, delta, reason)
            .await
        {
            Ok(()) => tracing::info!(worker_id = %worker_id, delta, reason, "Reliability score adjusted"),
            Err(e) => tracing::error!(
                worker_id = %worker_id,
                delta,
                reason,
                error = %e,
                "Failed to adjust reliability score"
            ),
        }
    }

    pub(crate) async fn alert_on_call(&self, notice: Notice) {
        if let Err(e) = self.deps.notifier.notify_on_call(&notice).await {
            tracing::warn!(instance_id = %notice.instance_id, error = %e, "On-call notification failed");
        }
    }

    pub(crate) async fn alert_team(&self, notice: Notice) {
        if let Err(e) = self.deps.notifier.notify_team(&notice).await {
            tracing::warn!(instance_id = %notice.instance_id, error = %e, "Team notification failed");
        }
    }
}
