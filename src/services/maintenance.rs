//! Daily per-property upkeep of the instance table.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::JobResult;
use crate::models::definition::DefinitionStatus;
use crate::models::instance::InstanceStatus;
use crate::models::property::Property;
use crate::services::engine::JobService;
use crate::services::recurrence::{occurs_on, SEED_HORIZON_DAYS};
use crate::services::time_window::{local_today, JobWindow};

const ALL_DEFINITION_STATUSES: [DefinitionStatus; 4] = [
    DefinitionStatus::Active,
    DefinitionStatus::Paused,
    DefinitionStatus::Archived,
    DefinitionStatus::Deleted,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub properties: usize,
    pub retired: u64,
    pub created: usize,
    pub failed_properties: usize,
}

impl JobService {
    /// Retire yesterday, then fill today through today+7 for every property.
    pub async fn run_daily_maintenance(&self) -> JobResult<MaintenanceReport> {
        let started = Instant::now();
        let now = self.now();
        let properties = self.deps.properties.list_properties().await?;
        let mut report = MaintenanceReport {
            properties: properties.len(),
            ..MaintenanceReport::default()
        };

        for property in &properties {
            match self.maintain_property(property, now).await {
                Ok((retired, created)) => {
                    report.retired += retired;
                    report.created += created;
                }
                Err(e) => {
                    report.failed_properties += 1;
                    tracing::error!(property_id = %property.id, error = %e, "Maintenance failed for property");
                }
            }
        }

        metrics::histogram!("maintenance_run_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            properties = report.properties,
            retired = report.retired,
            created = report.created,
            failed_properties = report.failed_properties,
            "Daily maintenance finished"
        );
        Ok(report)
    }

    async fn maintain_property(
        &self,
        property: &Property,
        now: DateTime<Utc>,
    ) -> JobResult<(u64, usize)> {
        let tz = property.zone();
        let today = local_today(tz, now);

        let mut all_ids = Vec::new();
        let mut active = Vec::new();
        for status in ALL_DEFINITION_STATUSES {
            let defs = self.store.list_definitions(status, Some(property.id)).await?;
            all_ids.extend(defs.iter().map(|d| d.id));
            if status == DefinitionStatus::Active {
                active = defs;
            }
        }
        if all_ids.is_empty() {
            return Ok((0, 0));
        }

        let retired = self
            .store
            .retire_instances(
                &all_ids,
                today - Duration::days(1),
                &[InstanceStatus::Open, InstanceStatus::Assigned],
            )
            .await?;

        let mut created = 0;
        for def in &active {
            for offset in 0..=SEED_HORIZON_DAYS {
                let date = today + Duration::days(offset);
                if !occurs_on(def, date, self.deps.holidays.as_ref()) {
                    continue;
                }
                if offset == 0 && now > JobWindow::for_date(def, date, tz).no_show {
                    continue;
                }
                if self.ensure_instance(def, date, now).await? {
                    created += 1;
                }
            }
        }

        tracing::info!(property_id = %property.id, %today, retired, created, "Property maintained");
        Ok((retired, created))
    }
}
