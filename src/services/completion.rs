//! Unit photo verification, dump trips, and job completion.

use chrono::{Datelike, Weekday};
use uuid::Uuid;

use crate::error::{JobError, JobResult, LatestRow};
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::location::LocationReport;
use crate::models::verification::{UnitVerification, UnitVerificationStatus};
use crate::services::engine::JobService;
use crate::services::estimate::apply_completion_sample;
use crate::services::geo::{check_location_report, require_on_site, ON_SITE_RADIUS_METERS};

/// CAS attempts for the post-completion estimate update.
const ESTIMATE_UPDATE_ATTEMPTS: usize = 3;

/// A photo for one unit of an in-progress job.
#[derive(Debug, Clone)]
pub struct UnitPhoto<'a> {
    pub unit_id: Uuid,
    pub image: &'a [u8],
    /// The resident has no can out; only the door number is judged.
    pub missing_trash_can: bool,
}

impl JobService {
    async fn load_in_progress(
        &self,
        worker_id: Uuid,
        instance_id: Uuid,
        action: &'static str,
    ) -> JobResult<JobInstance> {
        let instance = self.load_instance(instance_id).await?;
        if instance.status != InstanceStatus::InProgress {
            return Err(JobError::WrongState {
                action,
                actual: instance.status,
            });
        }
        if !instance.is_assigned_to(worker_id) {
            return Err(JobError::NotAssignedWorker);
        }
        Ok(instance)
    }

    /// Judge a unit photo and record the result.
    ///
    /// A settled unit (dumped, or failed permanently) is returned unchanged.
    pub async fn verify_unit_photo(
        &self,
        worker_id: Uuid,
        instance_id: Uuid,
        location: &LocationReport,
        photo: UnitPhoto<'_>,
    ) -> JobResult<UnitVerification> {
        let now = self.now();
        let instance = self.load_in_progress(worker_id, instance_id, "verify unit").await?;
        let ctx = self.load_context(instance).await?;

        if !ctx.definition.includes_unit(photo.unit_id) {
            return Err(JobError::InvalidPayload(format!(
                "unit {} is not part of this job",
                photo.unit_id
            )));
        }
        require_on_site(location, &ctx.property.coordinates(), ON_SITE_RADIUS_METERS, now)?;

        let unit = self
            .deps
            .units
            .get_unit(photo.unit_id)
            .await?
            .ok_or_else(|| JobError::not_found("unit", photo.unit_id))?;

        let existing = self.store.get_verification(instance_id, unit.id).await?;
        if let Some(record) = existing.as_ref().filter(|r| r.is_terminal()) {
            metrics::counter!("unit_verifications_total", "outcome" => "ignored").increment(1);
            tracing::debug!(
                instance_id = %instance_id,
                unit_id = %unit.id,
                status = %record.status,
                "Unit already settled, photo ignored"
            );
            return Ok(record.clone());
        }

        let assessment = self
            .deps
            .vision
            .assess_photo(photo.image, &unit.unit_number)
            .await
            .map_err(|e| JobError::Internal(format!("photo verification failed: {e}")))?;
        let reasons = assessment.failure_reasons(photo.missing_trash_can);
        tracing::debug!(
            instance_id = %instance_id,
            unit_id = %unit.id,
            trash_can_present = assessment.trash_can_present,
            no_trash_bag_visible = assessment.no_trash_bag_visible,
            door_number_matches = assessment.door_number_matches,
            door_number_detected = assessment.door_number_detected,
            "Photo assessed"
        );

        let mut next = existing
            .clone()
            .unwrap_or_else(|| UnitVerification::pending(instance_id, unit.id, now));
        next.missing_trash_can = photo.missing_trash_can;
        let outcome = if reasons.is_empty() {
            next.record_pass();
            "pass"
        } else {
            next.record_failure(reasons);
            if next.permanent_failure {
                "permanent_failure"
            } else {
                "fail"
            }
        };
        metrics::counter!("unit_verifications_total", "outcome" => outcome).increment(1);

        let saved = match existing {
            Some(current) => self.commit_verification(&next, current.row_version).await?,
            None => {
                if !self.store.insert_verification(&next).await? {
                    let latest = self
                        .store
                        .get_verification(instance_id, unit.id)
                        .await?
                        .ok_or_else(|| JobError::not_found("unit verification", next.id))?;
                    return Err(JobError::RowVersionConflict {
                        latest: LatestRow::Verification(Box::new(latest)),
                    });
                }
                next
            }
        };

        tracing::info!(
            instance_id = %instance_id,
            unit_id = %saved.unit_id,
            status = %saved.status,
            attempt_count = saved.attempt_count,
            permanent_failure = saved.permanent_failure,
            "Unit verification recorded"
        );
        Ok(saved)
    }

    /// Drop verified bags at a dumpster and complete the job once every unit is settled.
    ///
    /// With nothing verified the trip is only accepted when every unit has
    /// permanently failed, and then no dumpster check applies.
    pub async fn process_dump_trip(
        &self,
        worker_id: Uuid,
        instance_id: Uuid,
        location: &LocationReport,
    ) -> JobResult<JobInstance> {
        let now = self.now();
        let instance = self.load_in_progress(worker_id, instance_id, "dump").await?;
        let ctx = self.load_context(instance).await?;

        let verifications: Vec<UnitVerification> = self
            .store
            .list_verifications(&[instance_id])
            .await?
            .into_iter()
            .filter(|v| ctx.definition.includes_unit(v.unit_id))
            .collect();
        let total_units = ctx.definition.total_units.max(0) as usize;
        let verified = verifications
            .iter()
            .filter(|v| v.status == UnitVerificationStatus::Verified)
            .count();
        let permanently_failed = verifications
            .iter()
            .filter(|v| v.status == UnitVerificationStatus::Failed && v.permanent_failure)
            .count();

        if verified > 0 {
            check_location_report(location, now)?;
            let here = location.coordinates();
            let at_dumpster = self
                .deps
                .dumpsters
                .list_dumpsters(ctx.property.id)
                .await?
                .iter()
                .filter(|d| ctx.definition.dumpster_ids.contains(&d.id))
                .any(|d| here.within_meters(&d.coordinates(), ON_SITE_RADIUS_METERS));
            if !at_dumpster {
                return Err(JobError::DumpLocationOutOfBounds);
            }
        } else if !(permanently_failed > 0 && permanently_failed >= total_units) {
            return Err(JobError::DumpLocationOutOfBounds);
        }

        let mut settled = 0usize;
        for record in verifications {
            if record.status == UnitVerificationStatus::Verified {
                let expected = record.row_version;
                let mut dumped = record;
                dumped.status = UnitVerificationStatus::Dumped;
                self.commit_verification(&dumped, expected).await?;
                settled += 1;
            } else if record.is_terminal() {
                settled += 1;
            }
        }
        tracing::info!(
            instance_id = %instance_id,
            dumped = verified,
            settled,
            total_units,
            "Dump trip processed"
        );

        if settled < total_units {
            return self.load_instance(instance_id).await;
        }

        let expected = ctx.instance.row_version;
        let mut next = ctx.instance;
        next.complete(now);
        let completed = self.commit_instance(&next, expected, "complete").await?;

        if let Some(minutes) = completed.worked_minutes() {
            let weekday = completed.service_date.weekday();
            if let Err(e) = self
                .record_completion_time(ctx.definition.id, weekday, minutes)
                .await
            {
                tracing::warn!(
                    definition_id = %ctx.definition.id,
                    error = %e,
                    "Failed to update time estimate"
                );
            }
        }
        Ok(completed)
    }

    /// Feed a completed job's duration into the weekday estimate.
    pub async fn record_completion_time(
        &self,
        definition_id: Uuid,
        weekday: Weekday,
        actual_minutes: i64,
    ) -> JobResult<()> {
        for _ in 0..ESTIMATE_UPDATE_ATTEMPTS {
            let mut definition = self.load_definition(definition_id).await?;
            let expected = definition.row_version;
            let Some(estimate) = definition.estimate_for_mut(weekday) else {
                return Ok(());
            };
            let before = estimate.estimated_time_minutes;
            apply_completion_sample(estimate, actual_minutes);
            let (after, base_pay) = (estimate.estimated_time_minutes, estimate.base_pay);

            if self
                .store
                .update_definition_if_version(&definition, expected)
                .await?
                .is_some()
            {
                tracing::info!(
                    definition_id = %definition_id,
                    weekday = %weekday,
                    actual_minutes,
                    before,
                    after,
                    base_pay,
                    "Time estimate updated"
                );
                return Ok(());
            }
        }

        let latest = self.load_definition(definition_id).await?;
        Err(JobError::RowVersionConflict {
            latest: LatestRow::Definition(Box::new(latest)),
        })
    }
}
