//! Shared fixtures for the scenario tests: an in-memory world with a
//! manual clock and recording collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use valet_dispatch::db::{InstanceFilter, JobStore, MemoryStore};
use valet_dispatch::error::StoreError;
use valet_dispatch::models::definition::{
    BuildingAssignment, DailyPayEstimate, DefinitionStatus, Frequency, JobDefinition,
    ALL_WEEKDAYS,
};
use valet_dispatch::models::instance::{InstanceStatus, JobInstance};
use valet_dispatch::models::location::LocationReport;
use valet_dispatch::models::property::{Building, Dumpster, Property, Unit};
use valet_dispatch::models::verification::UnitVerification;
use valet_dispatch::models::worker::{AccountStatus, Worker};
use valet_dispatch::services::holidays::UsFederalHolidays;
use valet_dispatch::services::notify::{Notice, NotificationDispatcher, NotifyError};
use valet_dispatch::services::routing::CrowFliesRouting;
use valet_dispatch::services::time_window::localize;
use valet_dispatch::services::vision::{PhotoAssessment, VisionError, VisionVerifier};
use valet_dispatch::services::{Clock, Collaborators, JobService};

pub const PROPERTY_LAT: f64 = 41.8781;
pub const PROPERTY_LNG: f64 = -87.6298;
/// Roughly 55m north of the property centroid.
pub const DUMPSTER_LAT: f64 = 41.8786;
pub const DUMPSTER_LNG: f64 = -87.6298;

/// A Wednesday, after the March DST switch (Chicago is UTC-5).
pub fn service_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Returns queued assessments in order, then passes everything.
#[derive(Default)]
pub struct ScriptedVision {
    queue: Mutex<VecDeque<PhotoAssessment>>,
}

impl ScriptedVision {
    pub fn push(&self, assessment: PhotoAssessment) {
        self.queue.lock().unwrap().push_back(assessment);
    }
}

#[async_trait]
impl VisionVerifier for ScriptedVision {
    async fn assess_photo(
        &self,
        _image_bytes: &[u8],
        _expected_unit: &str,
    ) -> Result<PhotoAssessment, VisionError> {
        Ok(self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(PhotoAssessment::auto_pass))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    OnCall,
    Team,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Audience, Notice)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Audience, Notice)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, n)| n.subject).collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn notify_on_call(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((Audience::OnCall, notice.clone()));
        Ok(())
    }

    async fn notify_team(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((Audience::Team, notice.clone()));
        Ok(())
    }
}

/// Fails every check the vision model makes.
pub fn failing_assessment() -> PhotoAssessment {
    PhotoAssessment {
        trash_can_present: false,
        no_trash_bag_visible: false,
        door_number_matches: false,
        door_number_detected: true,
    }
}

/// Instance writes yield to the scheduler before their CAS, so joined
/// futures both read before either writes. `interfere_next_write` slips in
/// a competing write ahead of the next instance update.
pub struct ContendedStore {
    inner: Arc<MemoryStore>,
    interfere: AtomicBool,
}

impl ContendedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            interfere: AtomicBool::new(false),
        }
    }

    pub fn interfere_next_write(&self) {
        self.interfere.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for ContendedStore {
    async fn get_definition(&self, id: Uuid) -> Result<Option<JobDefinition>, StoreError> {
        self.inner.get_definition(id).await
    }

    async fn insert_definition(&self, def: &JobDefinition) -> Result<(), StoreError> {
        self.inner.insert_definition(def).await
    }

    async fn update_definition_if_version(
        &self,
        def: &JobDefinition,
        expected_version: i64,
    ) -> Result<Option<JobDefinition>, StoreError> {
        self.inner.update_definition_if_version(def, expected_version).await
    }

    async fn list_definitions(
        &self,
        status: DefinitionStatus,
        property_id: Option<Uuid>,
    ) -> Result<Vec<JobDefinition>, StoreError> {
        self.inner.list_definitions(status, property_id).await
    }

    async fn get_instance(&self, id: Uuid) -> Result<Option<JobInstance>, StoreError> {
        self.inner.get_instance(id).await
    }

    async fn insert_instance_if_absent(&self, inst: &JobInstance) -> Result<bool, StoreError> {
        self.inner.insert_instance_if_absent(inst).await
    }

    async fn update_instance_if_version(
        &self,
        next: &JobInstance,
        expected_version: i64,
    ) -> Result<Option<JobInstance>, StoreError> {
        tokio::task::yield_now().await;
        if self.interfere.swap(false, Ordering::SeqCst) {
            if let Some(current) = self.inner.get_instance(next.id).await? {
                self.inner
                    .update_instance_if_version(&current, current.row_version)
                    .await?;
            }
        }
        self.inner.update_instance_if_version(next, expected_version).await
    }

    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<JobInstance>, StoreError> {
        self.inner.list_instances(filter).await
    }

    async fn retire_instances(
        &self,
        definition_ids: &[Uuid],
        date: NaiveDate,
        statuses: &[InstanceStatus],
    ) -> Result<u64, StoreError> {
        self.inner.retire_instances(definition_ids, date, statuses).await
    }

    async fn delete_future_open_instances(
        &self,
        definition_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<u64, StoreError> {
        self.inner.delete_future_open_instances(definition_id, from_date).await
    }

    async fn get_verification(
        &self,
        instance_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<UnitVerification>, StoreError> {
        self.inner.get_verification(instance_id, unit_id).await
    }

    async fn list_verifications(
        &self,
        instance_ids: &[Uuid],
    ) -> Result<Vec<UnitVerification>, StoreError> {
        self.inner.list_verifications(instance_ids).await
    }

    async fn insert_verification(&self, v: &UnitVerification) -> Result<bool, StoreError> {
        self.inner.insert_verification(v).await
    }

    async fn update_verification_if_version(
        &self,
        v: &UnitVerification,
        expected_version: i64,
    ) -> Result<Option<UnitVerification>, StoreError> {
        self.inner.update_verification_if_version(v, expected_version).await
    }
}

/// One property with a building of two units, a dumpster, an active worker,
/// and a daily 18:00-21:00 definition.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub contention: Arc<ContendedStore>,
    pub clock: Arc<ManualClock>,
    pub vision: Arc<ScriptedVision>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: JobService,
    pub property: Property,
    pub building: Building,
    pub units: Vec<Unit>,
    pub dumpster: Dumpster,
    pub worker_id: Uuid,
    pub definition: JobDefinition,
}

impl World {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(local_at(service_date(), 12, 0)));
        let vision = Arc::new(ScriptedVision::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let property = Property {
            id: Uuid::new_v4(),
            name: "Lakeview Commons".to_string(),
            address: "233 S Wacker Dr, Chicago, IL".to_string(),
            latitude: PROPERTY_LAT,
            longitude: PROPERTY_LNG,
            timezone: "America/Chicago".to_string(),
        };
        let building = Building {
            id: Uuid::new_v4(),
            property_id: property.id,
            name: "North Tower".to_string(),
        };
        let units: Vec<Unit> = ["101", "102"]
            .iter()
            .map(|number| Unit {
                id: Uuid::new_v4(),
                property_id: property.id,
                building_id: building.id,
                unit_number: number.to_string(),
                floor: Some(1),
                tenant_token: None,
            })
            .collect();
        let dumpster = Dumpster {
            id: Uuid::new_v4(),
            property_id: property.id,
            dumpster_number: "D1".to_string(),
            latitude: DUMPSTER_LAT,
            longitude: DUMPSTER_LNG,
        };

        store.put_property(property.clone());
        store.put_building(building.clone());
        for unit in &units {
            store.put_unit(unit.clone());
        }
        store.put_dumpster(dumpster.clone());

        let worker_id = add_worker(&store, 100);

        let now = clock.now();
        let mut definition = JobDefinition {
            id: Uuid::new_v4(),
            manager_id: Uuid::new_v4(),
            property_id: property.id,
            title: "Evening valet".to_string(),
            description: None,
            assigned_units_by_building: vec![BuildingAssignment {
                building_id: building.id,
                unit_ids: units.iter().map(|u| u.id).collect(),
                floors: vec![1],
            }],
            dumpster_ids: vec![dumpster.id],
            floors: Vec::new(),
            total_units: 0,
            frequency: Frequency::Daily,
            weekdays: Vec::new(),
            interval_weeks: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            skip_holidays: false,
            holiday_exceptions: Vec::new(),
            earliest_start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            latest_start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            start_time_hint: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            daily_pay_estimates: ALL_WEEKDAYS
                .iter()
                .map(|day| DailyPayEstimate::new(*day, 40.0, 60))
                .collect(),
            status: DefinitionStatus::Active,
            row_version: 1,
            created_at: now,
            updated_at: now,
        };
        definition.derive_assignment_fields();
        store.insert_definition(&definition).await.unwrap();

        let deps = Collaborators::with_directory(
            store.clone(),
            vision.clone(),
            Arc::new(CrowFliesRouting),
            notifier.clone(),
            Arc::new(UsFederalHolidays),
            clock.clone(),
        );
        let contention = Arc::new(ContendedStore::new(store.clone()));
        let service = JobService::new(contention.clone(), deps);

        Self {
            store,
            contention,
            clock,
            vision,
            notifier,
            service,
            property,
            building,
            units,
            dumpster,
            worker_id,
            definition,
        }
    }

    pub fn tz(&self) -> Tz {
        self.property.zone()
    }

    /// Set the clock to a property-local wall time on the service date.
    pub fn set_local(&self, hour: u32, minute: u32) {
        self.clock.set(local_at(service_date(), hour, minute));
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn add_worker(&self, score: i32) -> Uuid {
        add_worker(&self.store, score)
    }

    /// An OPEN instance of the world's definition on `date`.
    pub fn open_instance_on(&self, date: NaiveDate) -> JobInstance {
        let inst = JobInstance::open(self.definition.id, date, 40.0, self.now());
        self.store.put_instance(inst.clone());
        inst
    }

    pub fn open_instance(&self) -> JobInstance {
        self.open_instance_on(service_date())
    }

    pub async fn instance(&self, id: Uuid) -> JobInstance {
        self.store.get_instance(id).await.unwrap().unwrap()
    }

    pub async fn definition(&self) -> JobDefinition {
        self.store
            .get_definition(self.definition.id)
            .await
            .unwrap()
            .unwrap()
    }

    pub fn location(&self, latitude: f64, longitude: f64) -> LocationReport {
        LocationReport {
            latitude,
            longitude,
            accuracy_meters: 8.0,
            timestamp_ms: self.now().timestamp_millis(),
            is_mock: false,
        }
    }

    pub fn on_site(&self) -> LocationReport {
        self.location(PROPERTY_LAT, PROPERTY_LNG)
    }

    pub fn at_dumpster(&self) -> LocationReport {
        self.location(DUMPSTER_LAT, DUMPSTER_LNG)
    }

    /// Accept at the current clock and start at 18:30 local.
    pub async fn in_progress_instance(&self) -> JobInstance {
        let inst = self.open_instance();
        self.service
            .accept_job(self.worker_id, inst.id, &self.on_site())
            .await
            .unwrap();
        self.set_local(18, 30);
        self.service
            .start_job(self.worker_id, inst.id, &self.on_site())
            .await
            .unwrap()
    }

    pub fn score_deltas(&self, worker_id: Uuid) -> Vec<(i32, String)> {
        self.store
            .score_events()
            .into_iter()
            .filter(|e| e.worker_id == worker_id)
            .map(|e| (e.delta, e.reason))
            .collect()
    }
}

pub fn local_at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let tz: Tz = "America/Chicago".parse().unwrap();
    localize(tz, date, NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
}

fn add_worker(store: &MemoryStore, score: i32) -> Uuid {
    let worker = Worker {
        id: Uuid::new_v4(),
        account_status: AccountStatus::Active,
        reliability_score: score,
        tenant_token: None,
    };
    let id = worker.id;
    store.put_worker(worker);
    id
}
