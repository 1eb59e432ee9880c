//! In-process store with the same compare-and-swap semantics as Postgres.
//!
//! Backs the scenario tests and local runs without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::db::store::{InstanceFilter, JobStore};
use crate::error::StoreError;
use crate::models::definition::{DefinitionStatus, JobDefinition};
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::property::{Building, Dumpster, Property, Unit};
use crate::models::verification::UnitVerification;
use crate::models::worker::{Worker, MAX_RELIABILITY_SCORE, MIN_RELIABILITY_SCORE};
use crate::services::providers::{
    BuildingProvider, DumpsterProvider, PropertyProvider, UnitProvider, WorkerProvider,
};

/// A recorded reliability score adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEvent {
    pub worker_id: Uuid,
    pub delta: i32,
    pub reason: String,
}

#[derive(Default)]
struct Tables {
    definitions: HashMap<Uuid, JobDefinition>,
    instances: HashMap<Uuid, JobInstance>,
    verifications: HashMap<Uuid, UnitVerification>,
    properties: HashMap<Uuid, Property>,
    buildings: Vec<Building>,
    units: HashMap<Uuid, Unit>,
    dumpsters: Vec<Dumpster>,
    workers: HashMap<Uuid, Worker>,
    score_events: Vec<ScoreEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock leaves rows intact
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Seeding ─────────────────────────────────────────────────────

    pub fn put_property(&self, property: Property) {
        self.lock().properties.insert(property.id, property);
    }

    pub fn put_building(&self, building: Building) {
        self.lock().buildings.push(building);
    }

    pub fn put_unit(&self, unit: Unit) {
        self.lock().units.insert(unit.id, unit);
    }

    pub fn put_dumpster(&self, dumpster: Dumpster) {
        self.lock().dumpsters.push(dumpster);
    }

    pub fn put_worker(&self, worker: Worker) {
        self.lock().workers.insert(worker.id, worker);
    }

    /// Overwrite an instance row as-is, bypassing version checks.
    pub fn put_instance(&self, inst: JobInstance) {
        self.lock().instances.insert(inst.id, inst);
    }

    pub fn score_events(&self) -> Vec<ScoreEvent> {
        self.lock().score_events.clone()
    }

    pub fn all_instances(&self) -> Vec<JobInstance> {
        let mut rows: Vec<JobInstance> = self.lock().instances.values().cloned().collect();
        rows.sort_by_key(|i| (i.service_date, i.id));
        rows
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn get_definition(&self, id: Uuid) -> Result<Option<JobDefinition>, StoreError> {
        Ok(self.lock().definitions.get(&id).cloned())
    }

    async fn insert_definition(&self, def: &JobDefinition) -> Result<(), StoreError> {
        self.lock().definitions.insert(def.id, def.clone());
        Ok(())
    }

    async fn update_definition_if_version(
        &self,
        def: &JobDefinition,
        expected_version: i64,
    ) -> Result<Option<JobDefinition>, StoreError> {
        let mut tables = self.lock();
        let Some(stored) = tables.definitions.get_mut(&def.id) else {
            return Ok(None);
        };
        if stored.row_version != expected_version {
            return Ok(None);
        }
        let mut next = def.clone();
        next.row_version = expected_version + 1;
        next.created_at = stored.created_at;
        next.updated_at = Utc::now();
        *stored = next.clone();
        Ok(Some(next))
    }

    async fn list_definitions(
        &self,
        status: DefinitionStatus,
        property_id: Option<Uuid>,
    ) -> Result<Vec<JobDefinition>, StoreError> {
        let mut rows: Vec<JobDefinition> = self
            .lock()
            .definitions
            .values()
            .filter(|d| d.status == status)
            .filter(|d| property_id.map_or(true, |p| d.property_id == p))
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.created_at);
        Ok(rows)
    }

    async fn get_instance(&self, id: Uuid) -> Result<Option<JobInstance>, StoreError> {
        Ok(self.lock().instances.get(&id).cloned())
    }

    async fn insert_instance_if_absent(&self, inst: &JobInstance) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let exists = tables.instances.values().any(|existing| {
            existing.definition_id == inst.definition_id
                && existing.service_date == inst.service_date
        });
        if exists {
            return Ok(false);
        }
        tables.instances.insert(inst.id, inst.clone());
        Ok(true)
    }

    async fn update_instance_if_version(
        &self,
        next: &JobInstance,
        expected_version: i64,
    ) -> Result<Option<JobInstance>, StoreError> {
        let mut tables = self.lock();
        let Some(stored) = tables.instances.get_mut(&next.id) else {
            return Ok(None);
        };
        if stored.row_version != expected_version {
            return Ok(None);
        }
        let mut row = next.clone();
        row.definition_id = stored.definition_id;
        row.service_date = stored.service_date;
        row.created_at = stored.created_at;
        row.row_version = expected_version + 1;
        row.updated_at = Utc::now();
        *stored = row.clone();
        Ok(Some(row))
    }

    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<JobInstance>, StoreError> {
        let mut rows: Vec<JobInstance> = self
            .lock()
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by_key(|i| (i.service_date, i.id));
        Ok(rows)
    }

    async fn retire_instances(
        &self,
        definition_ids: &[Uuid],
        date: NaiveDate,
        statuses: &[InstanceStatus],
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let mut retired = 0;
        for inst in tables.instances.values_mut() {
            if definition_ids.contains(&inst.definition_id)
                && inst.service_date == date
                && statuses.contains(&inst.status)
            {
                inst.status = InstanceStatus::Retired;
                inst.row_version += 1;
                inst.updated_at = Utc::now();
                retired += 1;
            }
        }
        Ok(retired)
    }

    async fn delete_future_open_instances(
        &self,
        definition_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let before = tables.instances.len();
        tables.instances.retain(|_, inst| {
            !(inst.definition_id == definition_id
                && inst.service_date >= from_date
                && inst.status == InstanceStatus::Open)
        });
        Ok((before - tables.instances.len()) as u64)
    }

    async fn get_verification(
        &self,
        instance_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<UnitVerification>, StoreError> {
        Ok(self
            .lock()
            .verifications
            .values()
            .find(|v| v.job_instance_id == instance_id && v.unit_id == unit_id)
            .cloned())
    }

    async fn list_verifications(
        &self,
        instance_ids: &[Uuid],
    ) -> Result<Vec<UnitVerification>, StoreError> {
        let mut rows: Vec<UnitVerification> = self
            .lock()
            .verifications
            .values()
            .filter(|v| instance_ids.contains(&v.job_instance_id))
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.created_at);
        Ok(rows)
    }

    async fn insert_verification(&self, v: &UnitVerification) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let exists = tables
            .verifications
            .values()
            .any(|existing| existing.job_instance_id == v.job_instance_id && existing.unit_id == v.unit_id);
        if exists {
            return Ok(false);
        }
        tables.verifications.insert(v.id, v.clone());
        Ok(true)
    }

    async fn update_verification_if_version(
        &self,
        v: &UnitVerification,
        expected_version: i64,
    ) -> Result<Option<UnitVerification>, StoreError> {
        let mut tables = self.lock();
        let Some(stored) = tables.verifications.get_mut(&v.id) else {
            return Ok(None);
        };
        if stored.row_version != expected_version {
            return Ok(None);
        }
        let mut row = v.clone();
        row.job_instance_id = stored.job_instance_id;
        row.unit_id = stored.unit_id;
        row.created_at = stored.created_at;
        row.row_version = expected_version + 1;
        row.updated_at = Utc::now();
        *stored = row.clone();
        Ok(Some(row))
    }
}

#[async_trait]
impl PropertyProvider for MemoryStore {
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        Ok(self.lock().properties.get(&id).cloned())
    }

    async fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
        let mut rows: Vec<Property> = self.lock().properties.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl BuildingProvider for MemoryStore {
    async fn list_buildings(&self, property_id: Uuid) -> Result<Vec<Building>, StoreError> {
        Ok(self
            .lock()
            .buildings
            .iter()
            .filter(|b| b.property_id == property_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitProvider for MemoryStore {
    async fn get_unit(&self, id: Uuid) -> Result<Option<Unit>, StoreError> {
        Ok(self.lock().units.get(&id).cloned())
    }

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, StoreError> {
        let mut rows: Vec<Unit> = self
            .lock()
            .units
            .values()
            .filter(|u| u.property_id == property_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
        Ok(rows)
    }

    async fn find_unit_by_tenant_token(&self, token: &str) -> Result<Option<Unit>, StoreError> {
        Ok(self
            .lock()
            .units
            .values()
            .find(|u| u.tenant_token.as_deref() == Some(token))
            .cloned())
    }
}

#[async_trait]
impl DumpsterProvider for MemoryStore {
    async fn list_dumpsters(&self, property_id: Uuid) -> Result<Vec<Dumpster>, StoreError> {
        Ok(self
            .lock()
            .dumpsters
            .iter()
            .filter(|d| d.property_id == property_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkerProvider for MemoryStore {
    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>, StoreError> {
        Ok(self.lock().workers.get(&id).cloned())
    }

    async fn adjust_reliability_score(
        &self,
        worker_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if let Some(worker) = tables.workers.get_mut(&worker_id) {
            worker.reliability_score = (worker.reliability_score + delta)
                .clamp(MIN_RELIABILITY_SCORE, MAX_RELIABILITY_SCORE);
        }
        tables.score_events.push(ScoreEvent {
            worker_id,
            delta,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> JobInstance {
        JobInstance::open(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            30.0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryStore::new();
        let inst = instance();
        assert!(store.insert_instance_if_absent(&inst).await.unwrap());

        let mut first = inst.clone();
        first.effective_pay = 33.0;
        let written = store
            .update_instance_if_version(&first, inst.row_version)
            .await
            .unwrap()
            .expect("first write applies");
        assert_eq!(written.row_version, inst.row_version + 1);

        let mut stale = inst.clone();
        stale.effective_pay = 99.0;
        let result = store
            .update_instance_if_version(&stale, inst.row_version)
            .await
            .unwrap();
        assert!(result.is_none());

        let current = store.get_instance(inst.id).await.unwrap().unwrap();
        assert_eq!(current.effective_pay, 33.0);
    }

    #[tokio::test]
    async fn test_insert_is_keyed_by_definition_and_date() {
        let store = MemoryStore::new();
        let inst = instance();
        let mut twin = instance();
        twin.definition_id = inst.definition_id;
        assert!(store.insert_instance_if_absent(&inst).await.unwrap());
        assert!(!store.insert_instance_if_absent(&twin).await.unwrap());
        assert_eq!(store.all_instances().len(), 1);
    }
}
