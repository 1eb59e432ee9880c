//! Persistence seam for definitions, instances, and unit verifications.
//!
//! Every `*_if_version` write is a single compare-and-swap on `row_version`.
//! `Ok(None)` means no row matched; callers re-read to tell a missing row from
//! a concurrent write.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::definition::{DefinitionStatus, JobDefinition};
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::verification::UnitVerification;

/// Selects instances for sweeps and listings. Empty vectors match everything.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub statuses: Vec<InstanceStatus>,
    pub assigned_worker_id: Option<Uuid>,
    pub definition_ids: Vec<Uuid>,
}

impl InstanceFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from_date: Some(from),
            to_date: Some(to),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[InstanceStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn assigned_to(mut self, worker_id: Uuid) -> Self {
        self.assigned_worker_id = Some(worker_id);
        self
    }

    pub fn for_definitions(mut self, ids: Vec<Uuid>) -> Self {
        self.definition_ids = ids;
        self
    }

    pub fn matches(&self, inst: &JobInstance) -> bool {
        self.from_date.map_or(true, |from| from <= inst.service_date)
            && self.to_date.map_or(true, |to| inst.service_date <= to)
            && (self.statuses.is_empty() || self.statuses.contains(&inst.status))
            && self
                .assigned_worker_id
                .map_or(true, |w| inst.assigned_worker_id == Some(w))
            && (self.definition_ids.is_empty() || self.definition_ids.contains(&inst.definition_id))
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    // ── Definitions ─────────────────────────────────────────────────

    async fn get_definition(&self, id: Uuid) -> Result<Option<JobDefinition>, StoreError>;

    async fn insert_definition(&self, def: &JobDefinition) -> Result<(), StoreError>;

    /// Write every mutable field of `def` if the stored version is `expected_version`.
    async fn update_definition_if_version(
        &self,
        def: &JobDefinition,
        expected_version: i64,
    ) -> Result<Option<JobDefinition>, StoreError>;

    async fn list_definitions(
        &self,
        status: DefinitionStatus,
        property_id: Option<Uuid>,
    ) -> Result<Vec<JobDefinition>, StoreError>;

    // ── Instances ───────────────────────────────────────────────────

    async fn get_instance(&self, id: Uuid) -> Result<Option<JobInstance>, StoreError>;

    /// Insert unless an instance already exists for the same definition and date.
    /// Returns whether a row was created.
    async fn insert_instance_if_absent(&self, inst: &JobInstance) -> Result<bool, StoreError>;

    async fn update_instance_if_version(
        &self,
        next: &JobInstance,
        expected_version: i64,
    ) -> Result<Option<JobInstance>, StoreError>;

    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<JobInstance>, StoreError>;

    /// Mark instances of `date` in one of `statuses` as RETIRED.
    async fn retire_instances(
        &self,
        definition_ids: &[Uuid],
        date: NaiveDate,
        statuses: &[InstanceStatus],
    ) -> Result<u64, StoreError>;

    /// Drop OPEN instances on or after `from_date`.
    async fn delete_future_open_instances(
        &self,
        definition_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<u64, StoreError>;

    // ── Unit verifications ──────────────────────────────────────────

    async fn get_verification(
        &self,
        instance_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<UnitVerification>, StoreError>;

    async fn list_verifications(
        &self,
        instance_ids: &[Uuid],
    ) -> Result<Vec<UnitVerification>, StoreError>;

    /// Insert unless a record exists for the same instance and unit.
    async fn insert_verification(&self, v: &UnitVerification) -> Result<bool, StoreError>;

    async fn update_verification_if_version(
        &self,
        v: &UnitVerification,
        expected_version: i64,
    ) -> Result<Option<UnitVerification>, StoreError>;
}
