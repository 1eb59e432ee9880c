//! Read-only job listings for workers.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Datelike, Duration};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::db::store::InstanceFilter;
use crate::error::{JobError, JobResult};
use crate::models::definition::{DefinitionStatus, JobDefinition};
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::property::{Building, Dumpster, Property, Unit};
use crate::models::verification::{UnitVerification, UnitVerificationStatus};
use crate::models::view::{
    BuildingView, DumpsterView, JobInstanceView, JobPage, ListJobsQuery, PropertySummary, UnitView,
};
use crate::services::engine::JobService;
use crate::services::geo::{Coordinates, ACCEPT_RADIUS_MILES};
use crate::services::release::{is_released, LISTING_WINDOW_DAYS};
use crate::services::routing::RouteEstimate;
use crate::services::time_window::{format_local_hhmm, local_today, JobWindow};

pub const MAX_PAGE_SIZE: usize = 100;

/// Everything about one property a view needs, fetched once per call.
struct PropertyBundle {
    property: Property,
    tz: Tz,
    buildings: Vec<Building>,
    units: HashMap<Uuid, Unit>,
    dumpsters: Vec<Dumpster>,
    route: Option<RouteEstimate>,
}

impl PropertyBundle {
    fn summary(&self) -> PropertySummary {
        PropertySummary {
            id: self.property.id,
            name: self.property.name.clone(),
            address: self.property.address.clone(),
            latitude: self.property.latitude,
            longitude: self.property.longitude,
        }
    }

    fn view(
        &self,
        instance: &JobInstance,
        def: &JobDefinition,
        verifications: &[UnitVerification],
    ) -> JobInstanceView {
        let window = JobWindow::for_date(def, instance.service_date, self.tz);

        let buildings = def
            .assigned_units_by_building
            .iter()
            .map(|group| BuildingView {
                building_id: group.building_id,
                name: self
                    .buildings
                    .iter()
                    .find(|b| b.id == group.building_id)
                    .map(|b| b.name.clone())
                    .unwrap_or_default(),
                units: group
                    .unit_ids
                    .iter()
                    .filter_map(|id| self.units.get(id))
                    .map(|unit| unit_view(unit, instance.id, verifications))
                    .collect(),
            })
            .collect();

        let dumpsters = self
            .dumpsters
            .iter()
            .filter(|d| def.dumpster_ids.contains(&d.id))
            .map(|d| DumpsterView {
                dumpster_id: d.id,
                dumpster_number: d.dumpster_number.clone(),
                latitude: d.latitude,
                longitude: d.longitude,
            })
            .collect();

        JobInstanceView {
            instance_id: instance.id,
            definition_id: def.id,
            property: self.summary(),
            service_date: instance.service_date,
            status: instance.status,
            pay: instance.effective_pay,
            estimated_time_minutes: def
                .estimate_for(instance.service_date.weekday())
                .map(|e| e.estimated_time_minutes),
            window_start: format_local_hhmm(window.earliest_start, self.tz),
            window_end: format_local_hhmm(window.no_show, self.tz),
            start_hint: format_local_hhmm(window.start_hint, self.tz),
            buildings,
            dumpsters,
            distance_miles: self.route.map(|r| r.distance_miles),
            travel_minutes: self.route.map(|r| r.travel_minutes),
            assigned_worker_id: instance.assigned_worker_id,
            check_in_at: instance.check_in_at,
            flagged_for_review: instance.flagged_for_review,
            row_version: instance.row_version,
        }
    }
}

fn unit_view(unit: &Unit, instance_id: Uuid, verifications: &[UnitVerification]) -> UnitView {
    let record = verifications
        .iter()
        .find(|v| v.job_instance_id == instance_id && v.unit_id == unit.id);
    UnitView {
        unit_id: unit.id,
        unit_number: unit.unit_number.clone(),
        floor: unit.floor,
        status: record.map_or(UnitVerificationStatus::Pending, |v| v.status),
        attempt_count: record.map_or(0, |v| v.attempt_count),
        failure_reasons: record.map(|v| v.failure_reasons.clone()).unwrap_or_default(),
        permanent_failure: record.is_some_and(|v| v.permanent_failure),
        missing_trash_can: record.is_some_and(|v| v.missing_trash_can),
    }
}

/// Nearest first, unknown distances last, then earliest date.
fn by_distance_then_date(a: &JobInstanceView, b: &JobInstanceView) -> Ordering {
    let distance = match (a.distance_miles, b.distance_miles) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    distance.then_with(|| a.service_date.cmp(&b.service_date))
}

/// Slice one 1-based page out of sorted results.
pub fn paginate<T>(items: Vec<T>, page: usize, size: usize) -> (Vec<T>, usize, usize) {
    let page = page.max(1);
    let size = size.clamp(1, MAX_PAGE_SIZE);
    let skip = (page - 1).saturating_mul(size);
    (items.into_iter().skip(skip).take(size).collect(), page, size)
}

impl JobService {
    async fn property_bundle(
        &self,
        property: Property,
        origin: Option<Coordinates>,
    ) -> JobResult<PropertyBundle> {
        let buildings = self.deps.buildings.list_buildings(property.id).await?;
        let units = self
            .deps
            .units
            .list_units(property.id)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let dumpsters = self.deps.dumpsters.list_dumpsters(property.id).await?;
        let route = match origin {
            Some(origin) => Some(self.deps.routing.route(origin, property.coordinates()).await),
            None => None,
        };
        Ok(PropertyBundle {
            tz: property.zone(),
            property,
            buildings,
            units,
            dumpsters,
            route,
        })
    }

    /// OPEN jobs this worker may accept right now, nearest first.
    pub async fn list_open_jobs(&self, worker_id: Uuid, query: &ListJobsQuery) -> JobResult<JobPage> {
        let now = self.now();
        let worker = self.load_worker(worker_id).await?;
        let viewer = self.release_viewer(&worker).await?;
        let origin = query.origin();

        let mut views = Vec::new();
        for property in self.deps.properties.list_properties().await? {
            if let Some(origin) = origin {
                if origin.distance_miles(&property.coordinates()) > ACCEPT_RADIUS_MILES {
                    continue;
                }
            }
            let definitions: HashMap<Uuid, JobDefinition> = self
                .store
                .list_definitions(DefinitionStatus::Active, Some(property.id))
                .await?
                .into_iter()
                .map(|d| (d.id, d))
                .collect();
            if definitions.is_empty() {
                continue;
            }

            let tz = property.zone();
            let today = local_today(tz, now);
            let filter = InstanceFilter::between(
                today - Duration::days(1),
                today + Duration::days(LISTING_WINDOW_DAYS - 1),
            )
            .with_statuses(&[InstanceStatus::Open])
            .for_definitions(definitions.keys().copied().collect());

            let visible: Vec<JobInstance> = self
                .store
                .list_instances(&filter)
                .await?
                .into_iter()
                .filter(|inst| !inst.is_excluded(worker_id))
                .filter(|inst| is_released(inst.service_date, property.id, tz, now, &viewer))
                .filter(|inst| {
                    definitions.get(&inst.definition_id).is_some_and(|def| {
                        now <= JobWindow::for_date(def, inst.service_date, tz).acceptance_cutoff
                    })
                })
                .collect();
            if visible.is_empty() {
                continue;
            }

            let ids: Vec<Uuid> = visible.iter().map(|i| i.id).collect();
            let verifications = self.store.list_verifications(&ids).await?;
            let bundle = self.property_bundle(property, origin).await?;
            for inst in &visible {
                if let Some(def) = definitions.get(&inst.definition_id) {
                    views.push(bundle.view(inst, def, &verifications));
                }
            }
        }

        views.sort_by(by_distance_then_date);
        let total = views.len();
        let (items, page, size) = paginate(views, query.page, query.size);
        tracing::debug!(worker_id = %worker_id, total, page, "Open jobs listed");
        Ok(JobPage {
            items,
            page,
            size,
            total,
        })
    }

    /// Jobs this worker holds, ASSIGNED or IN_PROGRESS.
    pub async fn list_my_jobs(
        &self,
        worker_id: Uuid,
        origin: Option<Coordinates>,
    ) -> JobResult<Vec<JobInstanceView>> {
        let filter = InstanceFilter::default()
            .with_statuses(&[InstanceStatus::Assigned, InstanceStatus::InProgress])
            .assigned_to(worker_id);
        let instances = self.store.list_instances(&filter).await?;
        self.build_views(&instances, origin).await
    }

    /// A single instance rendered the same way the listings render it.
    pub async fn instance_view(
        &self,
        instance: &JobInstance,
        origin: Option<Coordinates>,
    ) -> JobResult<JobInstanceView> {
        let mut views = self.build_views(std::slice::from_ref(instance), origin).await?;
        views
            .pop()
            .ok_or_else(|| JobError::not_found("job definition", instance.definition_id))
    }

    async fn build_views(
        &self,
        instances: &[JobInstance],
        origin: Option<Coordinates>,
    ) -> JobResult<Vec<JobInstanceView>> {
        let mut definitions: HashMap<Uuid, JobDefinition> = HashMap::new();
        let mut bundles: HashMap<Uuid, PropertyBundle> = HashMap::new();
        let ids: Vec<Uuid> = instances.iter().map(|i| i.id).collect();
        let verifications = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.list_verifications(&ids).await?
        };

        let mut views = Vec::with_capacity(instances.len());
        for inst in instances {
            if !definitions.contains_key(&inst.definition_id) {
                match self.store.get_definition(inst.definition_id).await? {
                    Some(def) => {
                        definitions.insert(def.id, def);
                    }
                    None => {
                        tracing::warn!(instance_id = %inst.id, "Instance has no definition, skipping");
                        continue;
                    }
                }
            }
            let Some(def) = definitions.get(&inst.definition_id) else {
                continue;
            };
            if !bundles.contains_key(&def.property_id) {
                let property = self.load_property(def.property_id).await?;
                let bundle = self.property_bundle(property, origin).await?;
                bundles.insert(def.property_id, bundle);
            }
            if let Some(bundle) = bundles.get(&def.property_id) {
                views.push(bundle.view(inst, def, &verifications));
            }
        }
        views.sort_by(by_distance_then_date);
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_is_one_based() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(items.clone(), 1, 3).0, vec![1, 2, 3]);
        assert_eq!(paginate(items.clone(), 3, 3).0, vec![7]);
        assert!(paginate(items.clone(), 4, 3).0.is_empty());
        assert_eq!(paginate(items, 0, 0), (vec![1], 1, 1));
    }
}
